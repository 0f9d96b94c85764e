// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure taxonomy of supervised worker processes.

use std::path::PathBuf;

use thiserror::Error;

/// Classification of a failed worker group.
///
/// Infra failures (fabric/collective errors) are retryable with a full
/// group restart; user failures terminate the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorType {
    #[default]
    None,
    InfraFailure,
    UserFailure,
}

lattice_core::simple_display! {
    ErrorType {
        None => "NONE",
        InfraFailure => "INFRA_FAILURE",
        UserFailure => "USER_FAILURE",
    }
}

/// A single worker process exiting non-zero.
///
/// `stderr` holds the contents of the per-rank stderr log at the time the
/// failure was observed; `timestamp_ms` is the observation instant,
/// stamped by the supervisor's clock.
#[derive(Debug, Clone)]
pub struct ProcessFailure {
    pub local_rank: usize,
    pub pid: u32,
    pub exitcode: i32,
    pub error_file: PathBuf,
    pub stderr: String,
    pub timestamp_ms: u64,
}

impl ProcessFailure {
    pub fn new(
        local_rank: usize,
        pid: u32,
        exitcode: i32,
        error_file: PathBuf,
        stderr: String,
        timestamp_ms: u64,
    ) -> Self {
        Self { local_rank, pid, exitcode, error_file, stderr, timestamp_ms }
    }
}

/// Raised when the supervisor process receives a death signal.
///
/// The signal handler only records the signal; supervisor entry points
/// surface it as this error so the caller can unwind into `close(signal)`.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("process got death signal {signal}")]
pub struct SignalError {
    pub signal: i32,
}

/// Errors from the process supervisor.
#[derive(Debug, Error)]
pub enum ProcError {
    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error("failed to spawn local rank {local_rank}: {source}")]
    Spawn {
        local_rank: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("{what} local rank mapping mismatch, expected ranks 0..{nprocs}")]
    RankMismatch { what: &'static str, nprocs: usize },

    #[error("failed to register signal handler: {0}")]
    SignalSetup(std::io::Error),
}
