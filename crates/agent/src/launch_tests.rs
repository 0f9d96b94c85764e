// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lattice_core::WorkerState;

#[test]
fn timeout_defaults_into_rdzv_configs() {
    let config = LaunchConfig::new("generic", 1, 1, 1);
    assert_eq!(config.effective_rdzv_configs()["timeout"], "900");
}

#[test]
fn explicit_rdzv_timeout_wins() {
    let config = LaunchConfig::new("generic", 1, 1, 1).rdzv_timeout(60u64);
    assert_eq!(config.effective_rdzv_configs()["timeout"], "60");
}

#[test]
fn preexisting_timeout_key_is_kept() {
    let mut configs = std::collections::HashMap::new();
    configs.insert("timeout".to_string(), "120".to_string());
    let config = LaunchConfig::new("generic", 1, 1, 1).rdzv_configs(configs);
    assert_eq!(config.effective_rdzv_configs()["timeout"], "120");
}

fn params(backend: &str, endpoint: &str) -> lattice_core::RendezvousParameters {
    lattice_core::RendezvousParameters {
        backend: backend.to_string(),
        endpoint: endpoint.to_string(),
        port: String::new(),
        run_id: "r".to_string(),
        min_nodes: 1,
        max_nodes: 1,
        config: Default::default(),
    }
}

#[test]
fn non_static_backend_has_no_fixed_master() {
    assert_eq!(addr_and_port(&params("local", "")).unwrap(), (None, None));
}

#[test]
fn static_backend_parses_the_endpoint() {
    let (addr, port) = addr_and_port(&params("static", "trainer-0:29500")).unwrap();
    assert_eq!(addr.as_deref(), Some("trainer-0"));
    assert_eq!(port, Some(29500));
}

#[test]
fn static_backend_rejects_missing_endpoint_or_port() {
    assert!(addr_and_port(&params("static", "  ")).is_err());
    assert!(addr_and_port(&params("static", "host-only")).is_err());
    assert!(addr_and_port(&params("static", "host:nan")).is_err());
}

#[test]
fn launch_agent_runs_the_group_to_success() {
    let dir = tempfile::tempdir().unwrap();
    let config = LaunchConfig::new("generic", 1, 1, 2)
        .run_id("launch-e2e")
        .rdzv_backend("local")
        .monitor_interval(std::time::Duration::from_millis(10))
        .exit_barrier_timeout(std::time::Duration::from_millis(100))
        .log_dir(dir.path().to_path_buf());

    let outcome =
        launch_agent(&config, "/usr/bin/env", Vec::new(), &Registries::default()).unwrap();
    let result = outcome.into_run_result().unwrap();
    assert_eq!(result.state, WorkerState::Succeeded);
    assert_eq!(result.return_values.len(), 2);
    assert!(result.failures.is_empty());
}

#[test]
fn unknown_rendezvous_backend_fails_at_startup() {
    let config = LaunchConfig::new("generic", 1, 1, 1).run_id("r").rdzv_backend("zeusd");
    let err = launch_agent(&config, "/usr/bin/env", Vec::new(), &Registries::default())
        .unwrap_err();
    assert!(matches!(
        err,
        AgentError::Rendezvous(RendezvousError::UnknownBackend(b)) if b == "zeusd"
    ));
}
