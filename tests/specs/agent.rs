// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end agent scenarios with real worker processes.

use std::time::Duration;

use lattice_agent::{launch_agent, AgentOutcome, LaunchConfig, Registries};
use lattice_core::{Std, StdSpec, WorkerState};

fn local_config(nproc_per_node: u32, run_id: &str) -> (tempfile::TempDir, LaunchConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = LaunchConfig::new("generic", 1, 1, nproc_per_node)
        .run_id(run_id)
        .rdzv_backend("local")
        .monitor_interval(Duration::from_millis(10))
        .exit_barrier_timeout(Duration::from_millis(200))
        .tee(StdSpec::Single(Std::Err))
        .log_dir(dir.path().to_path_buf());
    (dir, config)
}

/// Happy path: one node, two workers, generic framework, `/usr/bin/env`.
#[test]
fn one_node_two_workers_succeed() {
    let (dir, config) = local_config(2, "specs-happy");

    let outcome =
        launch_agent(&config, "/usr/bin/env", Vec::new(), &Registries::default()).unwrap();
    let result = outcome.into_run_result().unwrap();

    assert_eq!(result.state, WorkerState::Succeeded);
    assert_eq!(result.return_values.len(), 2);
    assert!(result.failures.is_empty());

    // Global ranks are dense starting at zero.
    let mut ranks: Vec<u32> = result.return_values.keys().copied().collect();
    ranks.sort_unstable();
    assert_eq!(ranks, vec![0, 1]);

    // Per-attempt logs land under {run_dir}/attempt_0/.
    let run_dir = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().starts_with("specs-happy_"))
        .unwrap();
    assert!(run_dir.path().join("attempt_0").join("stderr_0.log").exists());
}

/// Worker env carries the run id and the NCCL error-handling toggle.
#[test]
fn worker_env_identifies_the_run() {
    let (dir, mut config) = local_config(1, "specs-env");
    config = config.redirects(StdSpec::Single(Std::Out));

    let outcome =
        launch_agent(&config, "/usr/bin/env", Vec::new(), &Registries::default()).unwrap();
    assert_eq!(outcome.into_run_result().unwrap().state, WorkerState::Succeeded);

    let run_dir = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().starts_with("specs-env_"))
        .unwrap();
    let stdout =
        std::fs::read_to_string(run_dir.path().join("attempt_0").join("stdout_0.log")).unwrap();
    assert!(stdout.contains("LATTICE_RUN_ID=specs-env"));
    assert!(stdout.contains("NCCL_ASYNC_ERROR_HANDLING=1"));
    assert!(stdout.contains("RDZV_BACKEND=local"));
    assert!(stdout.contains("MIN_NODES=1"));
    assert!(stdout.contains("MAX_NODES=1"));
    assert!(stdout.contains("NUM_LOCAL_DEVICES=1"));
}

/// User failure: a worker exits non-zero with an ordinary error. The run
/// result carries the failure by global rank.
#[test]
fn failing_worker_surfaces_a_user_failure() {
    let (_dir, config) = local_config(2, "specs-fail");

    let outcome = launch_agent(
        &config,
        "/bin/sh",
        vec![
            "-c".to_string(),
            "if [ \"$LATTICE_RUN_ID\" = specs-fail ]; then echo 'ValueError: bad config' >&2; exit 1; fi"
                .to_string(),
        ],
        &Registries::default(),
    )
    .unwrap();

    let result = outcome.into_run_result().unwrap();
    assert_eq!(result.state, WorkerState::Failed);
    assert!(result.is_failed());
    assert_eq!(result.error_type, lattice_multiproc::ErrorType::UserFailure);
    assert!(result.return_values.is_empty());

    let failure = result.failures.values().next().unwrap();
    assert_eq!(failure.exitcode, 1);
    assert!(failure.stderr.contains("ValueError: bad config"));
}

/// `${local_rank}` substitution reaches each worker's argv.
#[test]
fn local_rank_macro_is_substituted() {
    let (dir, mut config) = local_config(2, "specs-macro");
    config = config.redirects(StdSpec::Single(Std::Out));

    let outcome = launch_agent(
        &config,
        "/bin/sh",
        vec!["-c".to_string(), "echo rank=${local_rank}".to_string()],
        &Registries::default(),
    )
    .unwrap();
    assert_eq!(outcome.into_run_result().unwrap().state, WorkerState::Succeeded);

    let run_dir = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().starts_with("specs-macro_"))
        .unwrap();
    let attempt = run_dir.path().join("attempt_0");
    let rank0 = std::fs::read_to_string(attempt.join("stdout_0.log")).unwrap();
    let rank1 = std::fs::read_to_string(attempt.join("stdout_1.log")).unwrap();
    assert!(rank0.contains("rank=0"));
    assert!(rank1.contains("rank=1"));
}

/// The pytorch framework injects the full distributed env protocol.
#[test]
fn pytorch_workers_receive_the_env_protocol() {
    let dir = tempfile::tempdir().unwrap();
    let config = LaunchConfig::new("pytorch", 1, 1, 2)
        .run_id("specs-pytorch")
        .rdzv_backend("local")
        .monitor_interval(Duration::from_millis(10))
        .exit_barrier_timeout(Duration::from_millis(200))
        .redirects(StdSpec::Single(Std::Out))
        .log_dir(dir.path().to_path_buf());

    let outcome =
        launch_agent(&config, "/usr/bin/env", Vec::new(), &Registries::default()).unwrap();
    assert_eq!(outcome.into_run_result().unwrap().state, WorkerState::Succeeded);

    let run_dir = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().starts_with("specs-pytorch_"))
        .unwrap();
    let attempt = run_dir.path().join("attempt_0");
    for rank in 0..2 {
        let stdout =
            std::fs::read_to_string(attempt.join(format!("stdout_{rank}.log"))).unwrap();
        assert!(stdout.contains(&format!("LOCAL_RANK={rank}")));
        assert!(stdout.contains(&format!("RANK={rank}")));
        assert!(stdout.contains("WORLD_SIZE=2"));
        assert!(stdout.contains("MASTER_ADDR="));
        assert!(stdout.contains("MASTER_PORT="));
    }
}
