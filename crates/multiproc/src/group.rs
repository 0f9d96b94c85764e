// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Start/poll/wait/close over a set of worker child processes.
//!
//! The supervisor follows an all-or-nothing policy: a run is successful iff
//! every child exits zero. As soon as any child exits non-zero the rest of
//! the group is closed and the failure set is returned.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::time::Duration;

use nix::sys::signal::Signal;

use lattice_core::{Clock, StdSpec, SystemClock};

use crate::errors::{ProcError, ProcessFailure, SignalError};
use crate::handler::SubprocessHandler;
use crate::metrics::MetricPublisher;
use crate::monitor::{LogMonitor, LogSink};
use crate::signals::{default_death_signal, kill_signal, TerminationFlag};

/// Grace period before survivors are SIGKILLed on close.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(30);

/// Everything needed to start one worker group.
pub struct StartConfig {
    /// Role name used in log-line headers.
    pub name: String,
    pub entrypoint: String,
    /// Per-local-rank argv (must cover ranks `0..n` exactly).
    pub args: HashMap<usize, Vec<String>>,
    /// Per-local-rank environment (same rank coverage as `args`).
    pub envs: HashMap<usize, HashMap<String, String>>,
    /// Attempt directory receiving `{stdout,stderr}_{rank}.log` files.
    pub log_dir: PathBuf,
    pub redirects: StdSpec,
    pub tee: StdSpec,
    pub monitor_config: HashMap<String, String>,
}

/// Result of a completed run. All fields are keyed by local rank.
///
/// `return_values` is only populated on success and holds `None` per rank:
/// binary entrypoints have no canonical return value.
#[derive(Debug, Default)]
pub struct RunProcsResult {
    pub return_values: HashMap<usize, Option<String>>,
    pub failures: HashMap<usize, ProcessFailure>,
    pub stdouts: HashMap<usize, Option<PathBuf>>,
    pub stderrs: HashMap<usize, Option<PathBuf>>,
}

impl RunProcsResult {
    pub fn is_failed(&self) -> bool {
        !self.failures.is_empty()
    }
}

fn validate_full_rank<T>(
    map: &HashMap<usize, T>,
    nprocs: usize,
    what: &'static str,
) -> Result<(), ProcError> {
    let complete = map.len() == nprocs && (0..nprocs).all(|rank| map.contains_key(&rank));
    if complete {
        Ok(())
    } else {
        Err(ProcError::RankMismatch { what, nprocs })
    }
}

/// Spawn the group and start the log tailers.
///
/// Tee'd streams are implemented as redirect plus tail, so the effective
/// redirect set is the union of `redirects` and `tee`.
pub fn start_processes(
    config: StartConfig,
    termination: TerminationFlag,
) -> Result<ProcGroup, ProcError> {
    start_processes_with_clock(config, termination, SystemClock)
}

/// [`start_processes`] with an injected time source for the group's
/// deadlines and failure timestamps.
pub fn start_processes_with_clock<C: Clock>(
    config: StartConfig,
    termination: TerminationFlag,
    clock: C,
) -> Result<ProcGroup<C>, ProcError> {
    let nprocs = config.args.len();
    validate_full_rank(&config.args, nprocs, "args")?;
    validate_full_rank(&config.envs, nprocs, "envs")?;

    let redirects = config.redirects.to_map(nprocs);
    let tees = config.tee.to_map(nprocs);

    let mut handlers = HashMap::new();
    let mut stdouts = HashMap::new();
    let mut stderrs = HashMap::new();
    let mut error_files = HashMap::new();
    let mut tee_stdouts = HashMap::new();
    let mut tee_stderrs = HashMap::new();

    for rank in 0..nprocs {
        let effective = redirects[&rank].union(tees[&rank]);
        let stdout_path = effective
            .includes_out()
            .then(|| config.log_dir.join(format!("stdout_{rank}.log")));
        let stderr_path = effective
            .includes_err()
            .then(|| config.log_dir.join(format!("stderr_{rank}.log")));

        if tees[&rank].includes_out() {
            if let Some(path) = &stdout_path {
                tee_stdouts.insert(rank, path.clone());
            }
        }
        if tees[&rank].includes_err() {
            if let Some(path) = &stderr_path {
                tee_stderrs.insert(rank, path.clone());
            }
        }

        let handler = SubprocessHandler::spawn(
            rank,
            &config.entrypoint,
            &config.args[&rank],
            &config.envs[&rank],
            stdout_path.as_deref(),
            stderr_path.as_deref(),
        )?;
        tracing::info!(rank, pid = handler.pid(), entrypoint = %config.entrypoint,
            "spawned worker process");

        handlers.insert(rank, handler);
        stdouts.insert(rank, stdout_path);
        stderrs.insert(rank, stderr_path);
        error_files.insert(rank, config.log_dir.join(format!("error_{rank}.json")));
    }

    let publisher =
        MetricPublisher::from_monitor_config(&config.monitor_config).map(std::sync::Arc::new);
    let mut stdout_tail =
        LogMonitor::new(&config.name, tee_stdouts, LogSink::Stdout, publisher.clone());
    let mut stderr_tail = LogMonitor::new(&config.name, tee_stderrs, LogSink::Stderr, publisher);
    stdout_tail.start();
    stderr_tail.start();

    Ok(ProcGroup {
        name: config.name,
        entrypoint: config.entrypoint,
        running: (0..nprocs).collect(),
        handlers,
        failures: HashMap::new(),
        stdouts,
        stderrs,
        error_files,
        nprocs,
        stdout_tail,
        stderr_tail,
        termination,
        clock,
        closed: false,
    })
}

/// A started worker group under supervision.
pub struct ProcGroup<C: Clock = SystemClock> {
    name: String,
    entrypoint: String,
    handlers: HashMap<usize, SubprocessHandler>,
    running: HashSet<usize>,
    failures: HashMap<usize, ProcessFailure>,
    stdouts: HashMap<usize, Option<PathBuf>>,
    stderrs: HashMap<usize, Option<PathBuf>>,
    error_files: HashMap<usize, PathBuf>,
    nprocs: usize,
    stdout_tail: LogMonitor,
    stderr_tail: LogMonitor,
    termination: TerminationFlag,
    clock: C,
    closed: bool,
}

impl<C: Clock> ProcGroup<C> {
    /// Pids of all spawned children, keyed by local rank.
    pub fn pids(&self) -> HashMap<usize, u32> {
        self.handlers.iter().map(|(rank, h)| (*rank, h.pid())).collect()
    }

    pub fn stdout_tail(&self) -> &LogMonitor {
        &self.stdout_tail
    }

    pub fn stderr_tail(&self) -> &LogMonitor {
        &self.stderr_tail
    }

    /// Check the group once.
    ///
    /// `Ok(None)` while children are running with no failures recorded.
    /// Otherwise the remaining children are closed and the result returned.
    /// Errors with [`SignalError`] if a death signal has been received.
    pub fn poll(&mut self) -> Result<Option<RunProcsResult>, SignalError> {
        self.termination.check()?;

        let mut done = Vec::new();
        for &rank in &self.running {
            let Some(handler) = self.handlers.get_mut(&rank) else { continue };
            match handler.child.try_wait() {
                Ok(Some(status)) => {
                    done.push(rank);
                    if !status.success() {
                        let exitcode =
                            status.code().unwrap_or_else(|| -status.signal().unwrap_or(0));
                        let stderr = read_tail(self.stderrs.get(&rank));
                        self.failures.insert(
                            rank,
                            ProcessFailure::new(
                                rank,
                                handler.pid(),
                                exitcode,
                                self.error_files[&rank].clone(),
                                stderr,
                                self.clock.epoch_ms(),
                            ),
                        );
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(rank, error = %e, "wait on child failed");
                }
            }
        }
        for rank in done {
            self.running.remove(&rank);
        }

        if !self.running.is_empty() && self.failures.is_empty() {
            return Ok(None);
        }

        // All finished, or something failed: tear down whatever remains.
        self.close(None, DEFAULT_CLOSE_GRACE);

        let mut result = RunProcsResult {
            failures: self.failures.clone(),
            stdouts: self.stdouts.clone(),
            stderrs: self.stderrs.clone(),
            ..Default::default()
        };
        if result.is_failed() {
            if let Some(first) =
                result.failures.values().min_by_key(|failure| failure.timestamp_ms)
            {
                tracing::error!(
                    exitcode = first.exitcode,
                    local_rank = first.local_rank,
                    pid = first.pid,
                    entrypoint = %self.entrypoint,
                    "worker group failed"
                );
            }
        } else {
            result.return_values = (0..self.nprocs).map(|rank| (rank, None)).collect();
        }
        Ok(Some(result))
    }

    /// Poll every `period` until done or `timeout` expires.
    ///
    /// `None` means wait forever; `Some(Duration::ZERO)` is a single poll.
    /// A received death signal is never swallowed.
    pub fn wait(
        &mut self,
        timeout: Option<Duration>,
        period: Duration,
    ) -> Result<Option<RunProcsResult>, SignalError> {
        if timeout == Some(Duration::ZERO) {
            return self.poll();
        }

        let deadline = timeout.map(|t| self.clock.now() + t);
        loop {
            if let Some(result) = self.poll()? {
                return Ok(Some(result));
            }
            if let Some(deadline) = deadline {
                if self.clock.now() >= deadline {
                    return Ok(None);
                }
            }
            std::thread::sleep(period);
        }
    }

    /// Terminate the group: send `death_sig` (default SIGTERM) to running
    /// children, SIGKILL whoever survives `grace`, and stop the tailers.
    /// Idempotent.
    pub fn close(&mut self, death_sig: Option<Signal>, grace: Duration) {
        if self.closed {
            return;
        }
        let death_sig = death_sig.unwrap_or_else(default_death_signal);

        for handler in self.handlers.values_mut() {
            if matches!(handler.child.try_wait(), Ok(None)) {
                tracing::warn!(pid = handler.pid(), signal = %death_sig,
                    "sending worker closing signal");
                handler.send_signal(death_sig);
            }
        }

        let deadline = self.clock.now() + grace;
        for handler in self.handlers.values_mut() {
            while matches!(handler.child.try_wait(), Ok(None)) {
                if self.clock.now() >= deadline {
                    break;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        }

        for handler in self.handlers.values_mut() {
            if matches!(handler.child.try_wait(), Ok(None)) {
                tracing::warn!(pid = handler.pid(), signal = %death_sig,
                    "worker did not exit, force killing");
                handler.send_signal(kill_signal());
                let _ = handler.child.wait();
            }
        }

        self.stdout_tail.stop();
        self.stderr_tail.stop();
        self.closed = true;
        tracing::info!(name = %self.name, "worker group closed");
    }
}

/// Contents of a per-rank stderr log, or empty when absent.
fn read_tail(path: Option<&Option<PathBuf>>) -> String {
    match path {
        Some(Some(path)) => fs::read_to_string(path).unwrap_or_default(),
        _ => String::new(),
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
