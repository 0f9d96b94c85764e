// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The elastic agent run loop.
//!
//! One iteration per monitor interval: rendezvous the group, start the
//! workers, then monitor until the group succeeds, fails, or a membership
//! change forces a restart. Infra failures restart the group; user failures
//! shut rendezvous down and surface the result to the caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use lattice_core::{
    barrier, set_master_addr_port, Clock, Store, SystemClock, WorkerGroup, WorkerRegistry,
    WorkerSpec, WorkerState,
};
use lattice_multiproc::{default_death_signal, ErrorType, Signal, SignalError};

use crate::error::AgentError;
use crate::result::RunResult;

/// Store key prefix for the post-run exit barrier.
pub const EXIT_BARRIER_KEY: &str = "torchelastic/agent/terminal_state";

/// Default time successful agents wait for their peers before exiting.
pub const DEFAULT_EXIT_BARRIER_TIMEOUT: Duration = Duration::from_secs(300);

/// Worker process lifecycle the agent drives.
///
/// The production implementation is [`crate::ProcLauncher`]; tests inject
/// scripted fakes. Implementors must handle workers in any state: stopping
/// non-existent workers is not an error.
pub trait WorkerLifecycle {
    /// Start `local_world_size` workers for the group. Returns the pid of
    /// each started worker keyed by local rank.
    fn start_workers(
        &mut self,
        group: &WorkerGroup,
        restart_count: u32,
    ) -> Result<HashMap<usize, u32>, AgentError>;

    /// Stop all workers of the group.
    fn stop_workers(&mut self, group: &WorkerGroup) -> Result<(), AgentError>;

    /// Check on the workers and report the group's new state.
    fn monitor_workers(&mut self, group: &WorkerGroup) -> Result<RunResult, AgentError>;

    /// Release all resources, forwarding `death_sig` to live workers.
    fn shutdown(&mut self, death_sig: Signal);

    /// Error out if a death signal is pending for the agent process.
    fn check_signal(&self) -> Result<(), SignalError> {
        Ok(())
    }
}

/// Restart accounting policy.
///
/// Membership-change restarts advance `restart_count` by default; operators
/// can exclude scale events so they reuse the same attempt number.
#[derive(Debug, Clone, Copy)]
pub struct RestartPolicy {
    pub count_membership_changes: bool,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self { count_membership_changes: true }
    }
}

/// How an agent run ended.
#[derive(Debug)]
pub enum AgentOutcome {
    /// The group reached a terminal state; inspect the result for failures.
    Completed(RunResult),
    /// A death signal interrupted the run; workers were shut down with it.
    Signaled(i32),
}

impl AgentOutcome {
    pub fn run_result(&self) -> Option<&RunResult> {
        match self {
            AgentOutcome::Completed(result) => Some(result),
            AgentOutcome::Signaled(_) => None,
        }
    }

    pub fn into_run_result(self) -> Option<RunResult> {
        match self {
            AgentOutcome::Completed(result) => Some(result),
            AgentOutcome::Signaled(_) => None,
        }
    }
}

/// Per-node agent managing the worker group for a single [`WorkerSpec`].
pub struct ElasticAgent<L: WorkerLifecycle, C: Clock = SystemClock> {
    worker_group: WorkerGroup,
    lifecycle: L,
    registry: Arc<WorkerRegistry>,
    restart_count: u32,
    store: Option<Arc<dyn Store>>,
    exit_barrier_timeout: Duration,
    restart_policy: RestartPolicy,
    total_execution_time: Option<Duration>,
    clock: C,
}

impl<L: WorkerLifecycle> ElasticAgent<L> {
    pub fn new(spec: WorkerSpec, lifecycle: L, registry: Arc<WorkerRegistry>) -> Self {
        Self::with_clock(spec, lifecycle, registry, SystemClock)
    }
}

impl<L: WorkerLifecycle, C: Clock> ElasticAgent<L, C> {
    /// An agent reading time through the given clock.
    pub fn with_clock(
        spec: WorkerSpec,
        lifecycle: L,
        registry: Arc<WorkerRegistry>,
        clock: C,
    ) -> Self {
        Self {
            worker_group: WorkerGroup::new(spec),
            lifecycle,
            registry,
            restart_count: 0,
            store: None,
            exit_barrier_timeout: DEFAULT_EXIT_BARRIER_TIMEOUT,
            restart_policy: RestartPolicy::default(),
            total_execution_time: None,
            clock,
        }
    }

    lattice_core::setters! {
        exit_barrier_timeout: Duration;
        restart_policy: RestartPolicy;
    }

    pub fn worker_group(&self) -> &WorkerGroup {
        &self.worker_group
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    /// Total wall-clock time of the last `run`, recorded even when the run
    /// ended in an error.
    pub fn total_execution_time(&self) -> Option<Duration> {
        self.total_execution_time
    }

    /// Run the agent, retrying the worker group on infra failures.
    ///
    /// Returns [`AgentOutcome::Signaled`] after a death signal: workers are
    /// shut down with the received signal and no result is produced. Any
    /// error not related to worker processes propagates.
    pub fn run(&mut self) -> Result<AgentOutcome, AgentError> {
        let start = self.clock.now();
        let result = self.invoke_run();

        let outcome = match result {
            Ok(run_result) => {
                self.lifecycle.shutdown(default_death_signal());
                Ok(AgentOutcome::Completed(run_result))
            }
            Err(err) => match err.signal() {
                Some(signal) => {
                    tracing::warn!(signal, "received death signal, shutting down workers");
                    let death_sig =
                        Signal::try_from(signal).unwrap_or_else(|_| default_death_signal());
                    self.lifecycle.shutdown(death_sig);
                    Ok(AgentOutcome::Signaled(signal))
                }
                None => {
                    self.lifecycle.shutdown(default_death_signal());
                    Err(err)
                }
            },
        };

        self.total_execution_time = Some(self.clock.now().duration_since(start));
        outcome
    }

    fn invoke_run(&mut self) -> Result<RunResult, AgentError> {
        let role = self.worker_group.spec.role.clone();
        tracing::info!(
            role = %role,
            entrypoint = %self.worker_group.spec.entrypoint_name(),
            "starting workers"
        );

        self.initialize_workers()?;
        let monitor_interval = self.worker_group.spec.monitor_interval;

        loop {
            std::thread::sleep(monitor_interval);

            let run_result = self.lifecycle.monitor_workers(&self.worker_group)?;
            let state = run_result.state;
            self.worker_group.state = state;

            match state {
                WorkerState::Succeeded => {
                    tracing::info!(
                        role = %role,
                        timeout_secs = self.exit_barrier_timeout.as_secs(),
                        "worker group successfully finished, waiting for other agents"
                    );
                    self.exit_barrier()?;
                    return Ok(run_result);
                }
                WorkerState::Unhealthy | WorkerState::Failed => {
                    self.restart_count += 1;
                    match run_result.error_type {
                        ErrorType::InfraFailure => self.restart_workers()?,
                        ErrorType::UserFailure => {
                            self.lifecycle.stop_workers(&self.worker_group)?;
                            self.worker_group.spec.rdzv_handler.shutdown();
                            return Ok(run_result);
                        }
                        ErrorType::None => {
                            self.lifecycle.stop_workers(&self.worker_group)?;
                            self.worker_group.state = WorkerState::Failed;
                            self.exit_barrier()?;
                            return Ok(run_result);
                        }
                    }
                }
                WorkerState::Healthy => {
                    // Membership changes restart the group at the new size.
                    let waiting = self.worker_group.spec.rdzv_handler.num_nodes_waiting();
                    if waiting > 0 {
                        tracing::info!(
                            role = %role,
                            num_nodes_waiting = waiting,
                            group_rank = ?self.worker_group.group_rank,
                            "detected new nodes, restarting worker group"
                        );
                        if self.restart_policy.count_membership_changes {
                            self.restart_count += 1;
                        }
                        self.restart_workers()?;
                    }
                }
                state => return Err(AgentError::UnknownState(state)),
            }
        }
    }

    /// Rendezvous and assign ranks: obtain the store and group rank, run
    /// the framework's rank assignment, and build the configured workers.
    fn rendezvous(&mut self) -> Result<(), AgentError> {
        let info = self.worker_group.spec.rdzv_handler.clone().next_rendezvous()?;
        let framework = self.worker_group.spec.framework.clone();

        let worker_info = self.registry.get_worker_info(
            &framework,
            info.store.as_ref(),
            info.group_rank,
            info.group_world_size,
            &self.worker_group.spec,
        )?;

        if info.group_rank == 0 {
            set_master_addr_port(
                info.store.as_ref(),
                self.worker_group.spec.master_addr.as_deref(),
                self.worker_group.spec.master_port,
            )?;
        }

        let workers = self.registry.create_workers(&framework, info.store.as_ref(), &worker_info)?;

        tracing::info!(
            group_rank = info.group_rank,
            group_world_size = info.group_world_size,
            workers = workers.len(),
            "rendezvous complete"
        );

        self.worker_group.workers = workers;
        self.worker_group.group_rank = Some(info.group_rank);
        self.worker_group.group_world_size = Some(info.group_world_size);
        self.worker_group.store = Some(Arc::clone(&info.store));
        self.store = Some(info.store);
        Ok(())
    }

    /// Rendezvous followed by a worker start. Optimistically marks the
    /// group `Healthy`; actual monitoring decides the real state.
    fn initialize_workers(&mut self) -> Result<(), AgentError> {
        let role = self.worker_group.spec.role.clone();
        self.worker_group.state = WorkerState::Init;
        tracing::info!(role = %role, "rendezvous'ing worker group");
        self.rendezvous()?;

        tracing::info!(role = %role, "starting worker group");
        let worker_pids = self.lifecycle.start_workers(&self.worker_group, self.restart_count)?;
        tracing::info!(role = %role, pids = ?worker_pids, "worker group started");

        self.worker_group.state = WorkerState::Healthy;
        Ok(())
    }

    /// Stop, re-rendezvous, and start all local workers.
    fn restart_workers(&mut self) -> Result<(), AgentError> {
        let role = self.worker_group.spec.role.clone();
        tracing::info!(role = %role, "stopping worker group");
        self.lifecycle.stop_workers(&self.worker_group)?;
        self.worker_group.state = WorkerState::Stopped;
        self.initialize_workers()
    }

    /// Best-effort barrier so successful agents wait for their peers.
    ///
    /// Errors are logged and never change the run result; a pending death
    /// signal re-raises after logging.
    fn exit_barrier(&mut self) -> Result<(), AgentError> {
        tracing::info!(
            state = %self.worker_group.state,
            timeout_secs = self.exit_barrier_timeout.as_secs(),
            "local worker group finished, waiting for other agents"
        );
        let (Some(store), Some(rank), Some(world_size)) = (
            self.store.as_ref(),
            self.worker_group.group_rank,
            self.worker_group.group_world_size,
        ) else {
            return Ok(());
        };

        let start = self.clock.now();
        match barrier(store.as_ref(), rank, world_size, EXIT_BARRIER_KEY, self.exit_barrier_timeout)
        {
            Ok(()) => {
                tracing::info!(
                    elapsed_ms = self.clock.now().duration_since(start).as_millis() as u64,
                    "done waiting for other agents"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    elapsed_ms = self.clock.now().duration_since(start).as_millis() as u64,
                    "error waiting on exit barrier"
                );
            }
        }

        if let Err(e) = self.lifecycle.check_signal() {
            tracing::warn!(signal = e.signal, "got termination signal during exit barrier");
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
