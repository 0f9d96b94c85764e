// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::rendezvous::LocalRendezvous;
use crate::Std;
use yare::parameterized;

fn handler() -> Arc<dyn RendezvousHandler> {
    Arc::new(LocalRendezvous::new("test-run"))
}

fn spec(local_world_size: u32) -> WorkerSpec {
    WorkerSpec::new(
        "generic",
        "test_trainer",
        local_world_size,
        "/usr/bin/env",
        handler(),
        Duration::from_secs(1),
    )
    .unwrap()
}

#[parameterized(
    unknown = { WorkerState::Unknown, false },
    init = { WorkerState::Init, false },
    healthy = { WorkerState::Healthy, true },
    unhealthy = { WorkerState::Unhealthy, true },
    stopped = { WorkerState::Stopped, false },
    succeeded = { WorkerState::Succeeded, false },
    failed = { WorkerState::Failed, false },
)]
fn is_running_only_for_live_states(state: WorkerState, expected: bool) {
    assert_eq!(state.is_running(), expected);
}

#[test]
fn spec_rejects_zero_local_world_size() {
    let result = WorkerSpec::new(
        "generic",
        "r",
        0,
        "/usr/bin/env",
        handler(),
        Duration::from_secs(1),
    );
    assert!(matches!(result, Err(ConfigError::ZeroLocalWorldSize)));
}

#[test]
fn spec_rejects_zero_monitor_interval() {
    let result =
        WorkerSpec::new("generic", "r", 1, "/usr/bin/env", handler(), Duration::ZERO);
    assert!(matches!(result, Err(ConfigError::ZeroMonitorInterval)));
}

#[test]
fn spec_rejects_empty_entrypoint() {
    let result = WorkerSpec::new("generic", "r", 1, "", handler(), Duration::from_secs(1));
    assert!(matches!(result, Err(ConfigError::EmptyEntrypoint)));
}

#[test]
fn spec_defaults_tee_stderr() {
    let spec = spec(1);
    assert_eq!(spec.tee, StdSpec::Single(Std::Err));
    assert_eq!(spec.redirects, StdSpec::Single(Std::None));
}

#[test]
fn entrypoint_name_is_the_basename() {
    let spec = spec(1);
    assert_eq!(spec.entrypoint_name(), "env");
}

#[test]
fn group_starts_in_init_with_placeholder_workers() {
    let group = WorkerGroup::new(spec(4));
    assert_eq!(group.state, WorkerState::Init);
    assert_eq!(group.workers.len(), 4);
    assert!(group.group_rank.is_none());
    assert!(group.store.is_none());
    for (i, worker) in group.workers.iter().enumerate() {
        assert_eq!(worker.local_id, i);
        assert!(worker.id.is_none());
    }
}

#[test]
fn validate_config_reports_missing_keys() {
    let worker = Worker::with_required_vars(
        "trainer",
        [("RANK".to_string(), "0".to_string())].into_iter().collect(),
        &["RANK", "WORLD_SIZE", "MASTER_ADDR"],
    );
    let err = worker.validate_config().unwrap_err();
    match err {
        ConfigError::MissingRequiredVars { keys } => {
            assert_eq!(keys, vec!["WORLD_SIZE", "MASTER_ADDR"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn validate_config_passes_without_requirements() {
    let worker = Worker::new("generic");
    worker.validate_config().unwrap();
}
