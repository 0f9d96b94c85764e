// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent error taxonomy.

use lattice_core::{ConfigError, RegistryError, RendezvousError, StoreError, WorkerState};
use lattice_multiproc::{ProcError, SignalError};
use thiserror::Error;

/// Errors surfacing from the elastic agent.
///
/// `Signal` is the recoverable interruption path: `run` converts it into a
/// worker shutdown with the received signal. Everything else terminates the
/// agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Rendezvous(#[from] RendezvousError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("worker group in {0} state")]
    UnknownState(WorkerState),

    #[error(transparent)]
    Proc(#[from] ProcError),

    #[error("failed to prepare log directory {path}: {source}")]
    LogDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AgentError {
    /// The signal value when this error is a signal interruption.
    pub fn signal(&self) -> Option<i32> {
        match self {
            AgentError::Signal(e) => Some(e.signal),
            AgentError::Proc(ProcError::Signal(e)) => Some(e.signal),
            _ => None,
        }
    }
}
