// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker spec, worker instances, and the mutable worker group.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;
use crate::rendezvous::RendezvousHandler;
use crate::std_stream::StdSpec;
use crate::store::Store;

/// Role assigned to workers when the user does not pick one.
pub const DEFAULT_ROLE: &str = "default";

/// State of a [`WorkerGroup`]. Workers in a group change state as a unit:
/// if a single worker fails the entire set is considered failed.
///
/// A group starts in `Init`, progresses to `Healthy`/`Unhealthy`, and ends
/// in a terminal `Succeeded` or `Failed` state. The agent parks a group in
/// `Stopped` while it is being restarted. `Unknown` means the agent lost
/// track of the group; it is not expected to recover from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Unknown,
    Init,
    Healthy,
    Unhealthy,
    Stopped,
    Succeeded,
    Failed,
}

crate::simple_display! {
    WorkerState {
        Unknown => "UNKNOWN",
        Init => "INIT",
        Healthy => "HEALTHY",
        Unhealthy => "UNHEALTHY",
        Stopped => "STOPPED",
        Succeeded => "SUCCEEDED",
        Failed => "FAILED",
    }
}

impl WorkerState {
    /// True while the worker processes exist (not necessarily healthy).
    pub fn is_running(self) -> bool {
        matches!(self, WorkerState::Healthy | WorkerState::Unhealthy)
    }
}

/// Blueprint for one type of worker.
///
/// A spec is expected to be homogeneous across all nodes: each node runs
/// `local_world_size` workers of this spec. Immutable after construction.
pub struct WorkerSpec {
    pub framework: String,
    pub role: String,
    pub local_world_size: u32,
    pub entrypoint: String,
    pub args: Vec<String>,
    pub rdzv_handler: Arc<dyn RendezvousHandler>,
    pub monitor_interval: Duration,
    pub master_addr: Option<String>,
    pub master_port: Option<u16>,
    pub redirects: StdSpec,
    pub tee: StdSpec,
}

impl WorkerSpec {
    /// Create a spec, validating `local_world_size > 0`,
    /// `monitor_interval > 0`, and a non-empty entrypoint.
    ///
    /// Optional fields default to: no fixed master addr/port, no redirects,
    /// tee stderr (so failure capture always has a stderr log).
    pub fn new(
        framework: impl Into<String>,
        role: impl Into<String>,
        local_world_size: u32,
        entrypoint: impl Into<String>,
        rdzv_handler: Arc<dyn RendezvousHandler>,
        monitor_interval: Duration,
    ) -> Result<Self, ConfigError> {
        if local_world_size == 0 {
            return Err(ConfigError::ZeroLocalWorldSize);
        }
        if monitor_interval.is_zero() {
            return Err(ConfigError::ZeroMonitorInterval);
        }
        let entrypoint = entrypoint.into();
        if entrypoint.is_empty() {
            return Err(ConfigError::EmptyEntrypoint);
        }
        Ok(Self {
            framework: framework.into(),
            role: role.into(),
            local_world_size,
            entrypoint,
            args: Vec::new(),
            rdzv_handler,
            monitor_interval,
            master_addr: None,
            master_port: None,
            redirects: StdSpec::default(),
            tee: StdSpec::Single(crate::Std::Err),
        })
    }

    crate::setters! {
        into args: Vec<String>;
        redirects: StdSpec;
        tee: StdSpec;
        option master_addr: String;
        option master_port: u16;
    }

    /// Binary name of the entrypoint, for log headers.
    pub fn entrypoint_name(&self) -> String {
        Path::new(&self.entrypoint)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.entrypoint.clone())
    }
}

/// A worker instance created from a [`WorkerSpec`].
///
/// `config` is the environment the framework protocol injects into the
/// worker process. `id` is the framework-dependent global identifier
/// (the global rank for PyTorch-style workers), unassigned until rank
/// assignment runs.
#[derive(Debug, Clone)]
pub struct Worker {
    pub role: String,
    pub config: HashMap<String, String>,
    pub local_id: usize,
    pub id: Option<u32>,
    required_vars: &'static [&'static str],
}

impl Worker {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            config: HashMap::new(),
            local_id: 0,
            id: None,
            required_vars: &[],
        }
    }

    /// A worker whose framework protocol requires the given config keys.
    pub fn with_required_vars(
        role: impl Into<String>,
        config: HashMap<String, String>,
        required_vars: &'static [&'static str],
    ) -> Self {
        Self { role: role.into(), config, local_id: 0, id: None, required_vars }
    }

    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    pub fn set_config_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.config.insert(key.into(), value.into());
    }

    /// Check that every required config key is present.
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        let missing: Vec<String> = self
            .required_vars
            .iter()
            .filter(|key| !self.config.contains_key(**key))
            .map(|key| key.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            tracing::error!(keys = ?missing, "worker config missing required env vars");
            Err(ConfigError::MissingRequiredVars { keys: missing })
        }
    }
}

/// The set of [`Worker`] instances managed by the agent for one spec.
///
/// Reset on every restart: workers are replaced and the state returns to
/// `Init` before the group is started again.
pub struct WorkerGroup {
    pub spec: WorkerSpec,
    pub workers: Vec<Worker>,
    pub store: Option<Arc<dyn Store>>,
    pub group_rank: Option<u32>,
    pub group_world_size: Option<u32>,
    pub state: WorkerState,
}

impl WorkerGroup {
    pub fn new(spec: WorkerSpec) -> Self {
        let workers = (0..spec.local_world_size)
            .map(|local_id| {
                let mut worker = Worker::new(&spec.role);
                worker.local_id = local_id as usize;
                worker
            })
            .collect();
        Self {
            spec,
            workers,
            store: None,
            group_rank: None,
            group_world_size: None,
            state: WorkerState::Init,
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
