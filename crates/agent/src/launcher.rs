// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-backed worker lifecycle.
//!
//! Composes each worker's environment and argv, lays out per-attempt log
//! directories, and drives the multiproc supervisor. Failure stderr is
//! classified through the injected matcher.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use lattice_core::{Worker, WorkerGroup, WorkerState};
use lattice_multiproc::{
    start_processes, ProcGroup, Signal, SignalError, StartConfig, TerminationFlag,
    DEFAULT_CLOSE_GRACE,
};

use crate::api::WorkerLifecycle;
use crate::classify::{check_errors, default_infra_matcher, InfraMatcher};
use crate::error::AgentError;
use crate::result::RunResult;

/// Token in argv elements replaced by the worker's local rank.
pub const LOCAL_RANK_MACRO: &str = "${local_rank}";

/// Replace [`LOCAL_RANK_MACRO`] in every argv element.
pub fn substitute_rank(args: &[String], local_rank: usize) -> Vec<String> {
    let rank = local_rank.to_string();
    args.iter().map(|arg| arg.replace(LOCAL_RANK_MACRO, &rank)).collect()
}

/// Merge the worker environment in layers: framework config, run
/// identification, caller extras, then a forwarded `OMP_NUM_THREADS`.
fn compose_worker_env(
    worker: &Worker,
    run_id: &str,
    extra_env: &HashMap<String, String>,
    omp_num_threads: Option<&str>,
) -> HashMap<String, String> {
    let mut env = worker.config.clone();
    env.insert("LATTICE_RUN_ID".to_string(), run_id.to_string());
    env.insert("NCCL_ASYNC_ERROR_HANDLING".to_string(), "1".to_string());
    for (key, value) in extra_env {
        env.insert(key.clone(), value.clone());
    }
    if let Some(omp) = omp_num_threads {
        env.insert("OMP_NUM_THREADS".to_string(), omp.to_string());
    }
    env
}

/// [`WorkerLifecycle`] implementation spawning real child processes.
pub struct ProcLauncher {
    log_dir: PathBuf,
    extra_env: HashMap<String, String>,
    monitor_config: HashMap<String, String>,
    matcher: InfraMatcher,
    termination: TerminationFlag,
    group: Option<ProcGroup>,
    start_pids: HashMap<usize, u32>,
}

impl ProcLauncher {
    /// Create a launcher, preparing the run's log directory and installing
    /// the termination handler.
    ///
    /// Logs land under `{base}/{run_id}_{suffix}/attempt_{n}/`; `base`
    /// defaults to a fresh directory under the system temp dir.
    pub fn new(run_id: &str, log_dir: Option<PathBuf>) -> Result<Self, AgentError> {
        let base = log_dir.unwrap_or_else(|| std::env::temp_dir().join("torchelastic"));
        fs::create_dir_all(&base)
            .map_err(|source| AgentError::LogDir { path: base.clone(), source })?;

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let dir = base.join(format!("{run_id}_{}", &suffix[..8]));
        fs::create_dir_all(&dir)
            .map_err(|source| AgentError::LogDir { path: dir.clone(), source })?;
        tracing::info!(dir = %dir.display(), "log directory set");

        Ok(Self {
            log_dir: dir,
            extra_env: HashMap::new(),
            monitor_config: HashMap::new(),
            matcher: default_infra_matcher(),
            termination: TerminationFlag::install()?,
            group: None,
            start_pids: HashMap::new(),
        })
    }

    lattice_core::setters! {
        extra_env: HashMap<String, String>;
        monitor_config: HashMap<String, String>;
        matcher: InfraMatcher;
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    fn global_rank(worker: &Worker) -> u32 {
        worker.id.unwrap_or(worker.local_id as u32)
    }
}

impl WorkerLifecycle for ProcLauncher {
    fn start_workers(
        &mut self,
        group: &WorkerGroup,
        restart_count: u32,
    ) -> Result<HashMap<usize, u32>, AgentError> {
        let spec = &group.spec;
        let run_id = spec.rdzv_handler.run_id().to_string();
        let omp = std::env::var("OMP_NUM_THREADS").ok();

        let mut args = HashMap::new();
        let mut envs = HashMap::new();
        for worker in &group.workers {
            envs.insert(
                worker.local_id,
                compose_worker_env(worker, &run_id, &self.extra_env, omp.as_deref()),
            );
            args.insert(worker.local_id, substitute_rank(&spec.args, worker.local_id));
        }

        // Scale events that reuse an attempt number get a clean directory.
        let attempt_dir = self.log_dir.join(format!("attempt_{restart_count}"));
        let _ = fs::remove_dir_all(&attempt_dir);
        fs::create_dir_all(&attempt_dir)
            .map_err(|source| AgentError::LogDir { path: attempt_dir.clone(), source })?;

        let proc_group = start_processes(
            StartConfig {
                name: spec.role.clone(),
                entrypoint: spec.entrypoint.clone(),
                args,
                envs,
                log_dir: attempt_dir,
                redirects: spec.redirects.clone(),
                tee: spec.tee.clone(),
                monitor_config: self.monitor_config.clone(),
            },
            self.termination.clone(),
        )?;

        self.start_pids = proc_group.pids();
        self.group = Some(proc_group);
        Ok(self.start_pids.clone())
    }

    fn stop_workers(&mut self, _group: &WorkerGroup) -> Result<(), AgentError> {
        self.shutdown(lattice_multiproc::default_death_signal());
        Ok(())
    }

    fn monitor_workers(&mut self, group: &WorkerGroup) -> Result<RunResult, AgentError> {
        let Some(proc_group) = self.group.as_mut() else {
            return Ok(RunResult::with_state(WorkerState::Unknown));
        };

        let current_pids = proc_group.pids();
        if current_pids != self.start_pids {
            tracing::error!(
                role = %group.spec.role,
                expected = ?self.start_pids,
                actual = ?current_pids,
                "worker pids do not match the supervised process group"
            );
            return Ok(RunResult::with_state(WorkerState::Unknown));
        }

        match proc_group.poll()? {
            Some(result) if result.is_failed() => {
                let mut failures = HashMap::new();
                for (local_rank, failure) in result.failures {
                    let global = group
                        .workers
                        .get(local_rank)
                        .map(Self::global_rank)
                        .unwrap_or(local_rank as u32);
                    failures.insert(global, failure);
                }
                let error_type = check_errors(&failures, &self.matcher);
                let mut run_result = RunResult::with_state(WorkerState::Failed);
                run_result.failures = failures;
                run_result.error_type = error_type;
                Ok(run_result)
            }
            Some(result) => {
                let mut run_result = RunResult::with_state(WorkerState::Succeeded);
                for (local_rank, value) in result.return_values {
                    let global = group
                        .workers
                        .get(local_rank)
                        .map(Self::global_rank)
                        .unwrap_or(local_rank as u32);
                    run_result.return_values.insert(global, value);
                }
                Ok(run_result)
            }
            None => Ok(RunResult::with_state(WorkerState::Healthy)),
        }
    }

    fn shutdown(&mut self, death_sig: Signal) {
        if let Some(group) = self.group.as_mut() {
            group.close(Some(death_sig), DEFAULT_CLOSE_GRACE);
        }
    }

    fn check_signal(&self) -> Result<(), SignalError> {
        self.termination.check()
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
