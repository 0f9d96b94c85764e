// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rendezvous handler interface and backend registry.
//!
//! The rendezvous backend itself (etcd or similar) is an external
//! collaborator; this module defines the interface the agent consumes and a
//! registry mapping backend names to handler factories. A built-in `local`
//! backend covers single-node runs and tests without any infrastructure.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::RendezvousError;
use crate::mem::MemStore;
use crate::store::Store;

/// Default rendezvous timeout in seconds.
pub const DEFAULT_RDZV_TIMEOUT: u64 = 900;

/// The outcome of one rendezvous round.
pub struct RendezvousInfo {
    pub store: Arc<dyn Store>,
    pub group_rank: u32,
    pub group_world_size: u32,
}

/// Peer-discovery interface consumed by the elastic agent.
pub trait RendezvousHandler: Send + Sync {
    /// Block until the next rendezvous round completes, yielding the shared
    /// store and this agent's dense rank assignment. May block up to the
    /// rendezvous timeout.
    fn next_rendezvous(&self) -> Result<RendezvousInfo, RendezvousError>;

    /// Number of nodes waiting to join the current round.
    fn num_nodes_waiting(&self) -> usize;

    /// Tear down rendezvous state for this run.
    fn shutdown(&self);

    /// User-defined run id shared by all agents of the job.
    fn run_id(&self) -> &str;
}

/// Parameters identifying a rendezvous round, assembled by the launcher.
#[derive(Debug, Clone)]
pub struct RendezvousParameters {
    pub backend: String,
    pub endpoint: String,
    pub port: String,
    pub run_id: String,
    pub min_nodes: u32,
    pub max_nodes: u32,
    pub config: HashMap<String, String>,
}

impl RendezvousParameters {
    /// Rendezvous timeout from the extra config, defaulting to 900 s.
    pub fn timeout(&self) -> Duration {
        let secs = self
            .config
            .get("timeout")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_RDZV_TIMEOUT);
        Duration::from_secs(secs)
    }
}

/// Factory producing a handler from launcher parameters.
pub type RdzvFactory =
    fn(&RendezvousParameters) -> Result<Arc<dyn RendezvousHandler>, RendezvousError>;

/// Registry of rendezvous backends by name.
pub struct RdzvRegistry {
    backends: HashMap<String, RdzvFactory>,
}

impl RdzvRegistry {
    pub fn new() -> Self {
        Self { backends: HashMap::new() }
    }

    /// Registry with the built-in `local` backend.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        // Fresh registry cannot already hold the name.
        let _ = registry.register("local", local_factory);
        registry
    }

    pub fn register(&mut self, backend: &str, factory: RdzvFactory) -> Result<(), RendezvousError> {
        if self.backends.contains_key(backend) {
            return Err(RendezvousError::AlreadyRegistered(backend.to_string()));
        }
        self.backends.insert(backend.to_string(), factory);
        Ok(())
    }

    pub fn get_handler(
        &self,
        params: &RendezvousParameters,
    ) -> Result<Arc<dyn RendezvousHandler>, RendezvousError> {
        let factory = self
            .backends
            .get(&params.backend)
            .ok_or_else(|| RendezvousError::UnknownBackend(params.backend.clone()))?;
        factory(params)
    }
}

impl Default for RdzvRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn local_factory(
    params: &RendezvousParameters,
) -> Result<Arc<dyn RendezvousHandler>, RendezvousError> {
    if params.min_nodes != 1 || params.max_nodes != 1 {
        return Err(RendezvousError::Backend(format!(
            "local rendezvous only supports a single node, got nnodes={}:{}",
            params.min_nodes, params.max_nodes
        )));
    }
    Ok(Arc::new(LocalRendezvous::new(&params.run_id)))
}

/// Single-node rendezvous over an in-process store.
///
/// Always assigns group rank 0 in a world of size 1; never reports waiting
/// nodes.
pub struct LocalRendezvous {
    run_id: String,
    store: Arc<MemStore>,
    closed: AtomicBool,
}

impl LocalRendezvous {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            store: Arc::new(MemStore::new()),
            closed: AtomicBool::new(false),
        }
    }
}

impl RendezvousHandler for LocalRendezvous {
    fn next_rendezvous(&self) -> Result<RendezvousInfo, RendezvousError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RendezvousError::Closed);
        }
        Ok(RendezvousInfo {
            store: Arc::clone(&self.store) as Arc<dyn Store>,
            group_rank: 0,
            group_world_size: 1,
        })
    }

    fn num_nodes_waiting(&self) -> usize {
        0
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn run_id(&self) -> &str {
        &self.run_id
    }
}

#[cfg(test)]
#[path = "rendezvous_tests.rs"]
mod tests;
