// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framework worker registry.
//!
//! Maps a framework tag to a pair of functions: an info gatherer that runs
//! rank assignment against the rendezvous store, and a worker factory that
//! turns the gathered info into configured [`Worker`] instances. The agent
//! never inspects framework internals; new frameworks register their own
//! pair.

use std::collections::HashMap;

use crate::error::RegistryError;
use crate::rank::{determine_global_ranks, determine_role_ranks, RoleInstanceInfo};
use crate::store::{get_master_addr_port, Store};
use crate::worker::{Worker, WorkerSpec};

/// Framework tag for workers with no env-var protocol.
pub const GENERIC_FRAMEWORK: &str = "generic";

/// Framework tag for PyTorch-style workers.
pub const PYTORCH_FRAMEWORK: &str = "pytorch";

const PYTORCH_REQUIRED_VARS: &[&str] =
    &["LOCAL_RANK", "RANK", "WORLD_SIZE", "MASTER_ADDR", "MASTER_PORT"];

/// Rank-assignment output consumed by a worker factory.
#[derive(Debug, Clone)]
pub struct WorkerInfo {
    pub role: String,
    pub local_world_size: u32,
    pub world_size: u32,
    pub global_ranks: Vec<u32>,
    pub role_world_size: u32,
    pub role_ranks: Vec<u32>,
}

/// Runs rank assignment for a framework and returns the per-node info.
pub type InfoGatherer =
    fn(&dyn Store, u32, u32, &WorkerSpec) -> Result<WorkerInfo, RegistryError>;

/// Builds configured workers from gathered info.
pub type WorkerFactory = fn(&dyn Store, &WorkerInfo) -> Result<Vec<Worker>, RegistryError>;

/// Registry of framework-specific gatherers and factories.
pub struct WorkerRegistry {
    gatherers: HashMap<String, InfoGatherer>,
    factories: HashMap<String, WorkerFactory>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self { gatherers: HashMap::new(), factories: HashMap::new() }
    }

    /// Registry with the built-in `generic` and `pytorch` frameworks.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        // A fresh registry cannot already hold the built-in names.
        let _ = registry.register_info_gatherer(GENERIC_FRAMEWORK, generic_worker_info);
        let _ = registry.register_worker_factory(GENERIC_FRAMEWORK, create_generic_workers);
        let _ = registry.register_info_gatherer(PYTORCH_FRAMEWORK, pytorch_worker_info);
        let _ = registry.register_worker_factory(PYTORCH_FRAMEWORK, create_pytorch_workers);
        registry
    }

    pub fn register_info_gatherer(
        &mut self,
        framework: &str,
        gatherer: InfoGatherer,
    ) -> Result<(), RegistryError> {
        if self.gatherers.contains_key(framework) {
            return Err(RegistryError::AlreadyRegistered("info gatherer", framework.to_string()));
        }
        self.gatherers.insert(framework.to_string(), gatherer);
        Ok(())
    }

    pub fn register_worker_factory(
        &mut self,
        framework: &str,
        factory: WorkerFactory,
    ) -> Result<(), RegistryError> {
        if self.factories.contains_key(framework) {
            return Err(RegistryError::AlreadyRegistered("worker factory", framework.to_string()));
        }
        self.factories.insert(framework.to_string(), factory);
        Ok(())
    }

    pub fn get_worker_info(
        &self,
        framework: &str,
        store: &dyn Store,
        group_rank: u32,
        group_world_size: u32,
        spec: &WorkerSpec,
    ) -> Result<WorkerInfo, RegistryError> {
        let gatherer = self
            .gatherers
            .get(framework)
            .ok_or_else(|| RegistryError::UnknownFramework(framework.to_string()))?;
        gatherer(store, group_rank, group_world_size, spec)
    }

    pub fn create_workers(
        &self,
        framework: &str,
        store: &dyn Store,
        info: &WorkerInfo,
    ) -> Result<Vec<Worker>, RegistryError> {
        let factory = self
            .factories
            .get(framework)
            .ok_or_else(|| RegistryError::UnknownFramework(framework.to_string()))?;
        factory(store, info)
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn gather_info(
    store: &dyn Store,
    group_rank: u32,
    group_world_size: u32,
    spec: &WorkerSpec,
) -> Result<WorkerInfo, RegistryError> {
    let (infos, world_size, global_ranks) =
        determine_global_ranks(store, group_rank, group_world_size, spec)?;
    let own = RoleInstanceInfo::new(&spec.role, group_rank, spec.local_world_size);
    let (role_world_size, role_ranks) = determine_role_ranks(&infos, &own)?;
    Ok(WorkerInfo {
        role: spec.role.clone(),
        local_world_size: spec.local_world_size,
        world_size,
        global_ranks,
        role_world_size,
        role_ranks,
    })
}

fn generic_worker_info(
    store: &dyn Store,
    group_rank: u32,
    group_world_size: u32,
    spec: &WorkerSpec,
) -> Result<WorkerInfo, RegistryError> {
    gather_info(store, group_rank, group_world_size, spec)
}

fn pytorch_worker_info(
    store: &dyn Store,
    group_rank: u32,
    group_world_size: u32,
    spec: &WorkerSpec,
) -> Result<WorkerInfo, RegistryError> {
    gather_info(store, group_rank, group_world_size, spec)
}

/// Generic workers carry no config; they only get unique global ids.
fn create_generic_workers(
    _store: &dyn Store,
    info: &WorkerInfo,
) -> Result<Vec<Worker>, RegistryError> {
    let workers = info
        .global_ranks
        .iter()
        .enumerate()
        .map(|(local_id, &global_id)| {
            let mut worker = Worker::new(&info.role);
            worker.local_id = local_id;
            worker.id = Some(global_id);
            worker
        })
        .collect();
    Ok(workers)
}

/// PyTorch workers get the distributed-init env vars and validate them.
fn create_pytorch_workers(
    store: &dyn Store,
    info: &WorkerInfo,
) -> Result<Vec<Worker>, RegistryError> {
    let (master_addr, master_port) = get_master_addr_port(store)?;

    let mut workers = Vec::with_capacity(info.local_world_size as usize);
    for (local_id, &global_rank) in info.global_ranks.iter().enumerate() {
        let config: HashMap<String, String> = [
            ("LOCAL_RANK".to_string(), local_id.to_string()),
            ("RANK".to_string(), global_rank.to_string()),
            ("WORLD_SIZE".to_string(), info.world_size.to_string()),
            ("MASTER_ADDR".to_string(), master_addr.clone()),
            ("MASTER_PORT".to_string(), master_port.to_string()),
        ]
        .into_iter()
        .collect();

        let mut worker = Worker::with_required_vars(&info.role, config, PYTORCH_REQUIRED_VARS);
        worker.local_id = local_id;
        worker.id = Some(global_rank);
        worker.validate_config()?;
        workers.push(worker);
    }
    Ok(workers)
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
