// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed error carrying the process exit code.
//!
//! `run` returns `ExitError` instead of calling `std::process::exit`
//! inline; `main` prints the message and maps it to the process status.

use thiserror::Error;

/// Launcher outcomes that end the process with a non-zero status.
#[derive(Debug, Error)]
pub enum ExitError {
    #[error("worker group failed ({failed} failed ranks)")]
    WorkerFailure { failed: usize },

    #[error("run terminated by signal {signal}")]
    Signaled { signal: i32 },

    #[error(transparent)]
    Startup(#[from] anyhow::Error),
}

impl ExitError {
    /// Process exit status for this error.
    pub fn code(&self) -> i32 {
        match self {
            ExitError::WorkerFailure { .. } => 1,
            ExitError::Signaled { signal } => 128 + signal,
            ExitError::Startup(_) => 1,
        }
    }
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
