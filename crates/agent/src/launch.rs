// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launch configuration and agent bootstrap.
//!
//! The launcher assembles a [`WorkerSpec`] from a [`LaunchConfig`],
//! resolves the rendezvous backend, builds the process launcher with the
//! run-identifying worker environment, and runs the agent to completion.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lattice_core::{
    RdzvRegistry, RendezvousError, RendezvousParameters, StdSpec, WorkerRegistry, WorkerSpec,
    DEFAULT_RDZV_TIMEOUT,
};

use crate::api::{AgentOutcome, ElasticAgent, RestartPolicy, DEFAULT_EXIT_BARRIER_TIMEOUT};
use crate::error::AgentError;
use crate::launcher::ProcLauncher;

/// Dependency-injected registries; one set per launcher process.
pub struct Registries {
    pub workers: Arc<WorkerRegistry>,
    pub rendezvous: Arc<RdzvRegistry>,
}

impl Default for Registries {
    fn default() -> Self {
        Self {
            workers: Arc::new(WorkerRegistry::with_defaults()),
            rendezvous: Arc::new(RdzvRegistry::with_defaults()),
        }
    }
}

/// Everything the launcher needs to run one agent.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub framework: String,
    pub min_nodes: u32,
    pub max_nodes: u32,
    pub nproc_per_node: u32,
    pub run_id: String,
    pub role: String,
    pub rdzv_endpoint: String,
    pub rdzv_port: String,
    pub rdzv_backend: String,
    pub rdzv_configs: HashMap<String, String>,
    pub rdzv_timeout: Option<u64>,
    pub monitor_interval: Duration,
    pub log_dir: Option<PathBuf>,
    pub redirects: StdSpec,
    pub tee: StdSpec,
    pub metric_pushgateway_endpoint: String,
    pub metric_pushgateway_backend: String,
    pub exit_barrier_timeout: Duration,
    pub restart_policy: RestartPolicy,
}

impl LaunchConfig {
    pub fn new(
        framework: impl Into<String>,
        min_nodes: u32,
        max_nodes: u32,
        nproc_per_node: u32,
    ) -> Self {
        Self {
            framework: framework.into(),
            min_nodes,
            max_nodes,
            nproc_per_node,
            run_id: String::new(),
            role: "default_role".to_string(),
            rdzv_endpoint: String::new(),
            rdzv_port: String::new(),
            rdzv_backend: "etcd".to_string(),
            rdzv_configs: HashMap::new(),
            rdzv_timeout: None,
            monitor_interval: Duration::from_secs(5),
            log_dir: None,
            redirects: StdSpec::default(),
            tee: StdSpec::default(),
            metric_pushgateway_endpoint: String::new(),
            metric_pushgateway_backend: String::new(),
            exit_barrier_timeout: DEFAULT_EXIT_BARRIER_TIMEOUT,
            restart_policy: RestartPolicy::default(),
        }
    }

    lattice_core::setters! {
        into run_id: String;
        into role: String;
        into rdzv_endpoint: String;
        into rdzv_port: String;
        into rdzv_backend: String;
        into metric_pushgateway_endpoint: String;
        into metric_pushgateway_backend: String;
        rdzv_configs: HashMap<String, String>;
        monitor_interval: Duration;
        redirects: StdSpec;
        tee: StdSpec;
        exit_barrier_timeout: Duration;
        restart_policy: RestartPolicy;
        option log_dir: PathBuf;
        option rdzv_timeout: u64;
    }

    /// Rendezvous config with the timeout key resolved: an explicit
    /// `rdzv_timeout` wins, then any `timeout` already present, then 900 s.
    fn effective_rdzv_configs(&self) -> HashMap<String, String> {
        let mut configs = self.rdzv_configs.clone();
        if let Some(timeout) = self.rdzv_timeout {
            configs.insert("timeout".to_string(), timeout.to_string());
        } else if !configs.contains_key("timeout") {
            configs.insert("timeout".to_string(), DEFAULT_RDZV_TIMEOUT.to_string());
        }
        configs
    }
}

/// Fixed master address/port, only meaningful for the static backend.
fn addr_and_port(
    params: &RendezvousParameters,
) -> Result<(Option<String>, Option<u16>), AgentError> {
    if params.backend != "static" {
        return Ok((None, None));
    }
    let endpoint = params.endpoint.trim();
    if endpoint.is_empty() {
        return Err(RendezvousError::BadEndpoint(
            "static backend requires a master endpoint".to_string(),
        )
        .into());
    }
    let (addr, port) = endpoint
        .rsplit_once(':')
        .ok_or_else(|| RendezvousError::BadEndpoint(format!("port missing in {endpoint}")))?;
    let port = port
        .parse()
        .map_err(|_| RendezvousError::BadEndpoint(format!("bad port in {endpoint}")))?;
    Ok((Some(addr.to_string()), Some(port)))
}

/// Launch an elastic agent on this node and run it to completion.
pub fn launch_agent(
    config: &LaunchConfig,
    entrypoint: &str,
    args: Vec<String>,
    registries: &Registries,
) -> Result<AgentOutcome, AgentError> {
    let run_id = if config.run_id.is_empty() {
        let generated = uuid::Uuid::new_v4().to_string();
        tracing::warn!(run_id = %generated, "config has no run_id, generated a new one");
        generated
    } else {
        config.run_id.clone()
    };

    tracing::info!(
        entrypoint,
        min_nodes = config.min_nodes,
        max_nodes = config.max_nodes,
        nproc_per_node = config.nproc_per_node,
        run_id = %run_id,
        rdzv_backend = %config.rdzv_backend,
        rdzv_endpoint = %config.rdzv_endpoint,
        rdzv_port = %config.rdzv_port,
        monitor_interval_ms = config.monitor_interval.as_millis() as u64,
        metric_pushgateway_endpoint = %config.metric_pushgateway_endpoint,
        metric_pushgateway_backend = %config.metric_pushgateway_backend,
        "starting elastic agent"
    );

    let rdzv_configs = config.effective_rdzv_configs();
    let params = RendezvousParameters {
        backend: config.rdzv_backend.clone(),
        endpoint: config.rdzv_endpoint.clone(),
        port: config.rdzv_port.clone(),
        run_id: run_id.clone(),
        min_nodes: config.min_nodes,
        max_nodes: config.max_nodes,
        config: rdzv_configs.clone(),
    };
    let handler = registries.rendezvous.get_handler(&params)?;
    let (master_addr, master_port) = addr_and_port(&params)?;

    let mut spec = WorkerSpec::new(
        &config.framework,
        &config.role,
        config.nproc_per_node,
        entrypoint,
        handler,
        config.monitor_interval,
    )?
    .args(args)
    .redirects(config.redirects.clone())
    .tee(config.tee.clone());
    if let Some(addr) = master_addr {
        spec = spec.master_addr(addr);
    }
    if let Some(port) = master_port {
        spec = spec.master_port(port);
    }

    let extra_env: HashMap<String, String> = [
        ("RDZV_BACKEND".to_string(), config.rdzv_backend.clone()),
        ("RDZV_ENDPOINT".to_string(), config.rdzv_endpoint.clone()),
        ("MIN_NODES".to_string(), config.min_nodes.to_string()),
        ("MAX_NODES".to_string(), config.max_nodes.to_string()),
        (
            "RDZV_CONFIG".to_string(),
            serde_json::to_string(&rdzv_configs).unwrap_or_default(),
        ),
        ("NUM_LOCAL_DEVICES".to_string(), config.nproc_per_node.to_string()),
    ]
    .into_iter()
    .collect();

    let monitor_config: HashMap<String, String> = [
        (
            "metric_pushgateway_endpoint".to_string(),
            config.metric_pushgateway_endpoint.clone(),
        ),
        (
            "metric_pushgateway_backend".to_string(),
            config.metric_pushgateway_backend.clone(),
        ),
        ("metric_pushgateway_job_id".to_string(), run_id.clone()),
    ]
    .into_iter()
    .collect();

    let launcher = ProcLauncher::new(&run_id, config.log_dir.clone())?
        .extra_env(extra_env)
        .monitor_config(monitor_config);

    let mut agent = ElasticAgent::new(spec, launcher, Arc::clone(&registries.workers))
        .exit_barrier_timeout(config.exit_barrier_timeout)
        .restart_policy(config.restart_policy);

    agent.run()
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
