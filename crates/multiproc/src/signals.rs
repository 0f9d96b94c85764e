// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Death-signal handling for the supervisor process.
//!
//! POSIX only: the default termination signal is SIGTERM and the hard-kill
//! signal is SIGKILL. The handler never unwinds out of signal context; it
//! records the signal in an atomic that supervisor entry points poll.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nix::sys::signal::Signal;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};

use crate::errors::{ProcError, SignalError};

/// Default signal sent to children on shutdown.
pub fn default_death_signal() -> Signal {
    Signal::SIGTERM
}

/// Signal used to force-kill children that outlive the grace period.
pub fn kill_signal() -> Signal {
    Signal::SIGKILL
}

/// Records the last death signal received by this process.
///
/// Cloned flags share the same underlying state, so the flag installed
/// before worker start is visible to every supervisor call site.
#[derive(Clone)]
pub struct TerminationFlag {
    signal: Arc<AtomicUsize>,
}

impl TerminationFlag {
    /// Install handlers for SIGTERM/SIGINT/SIGHUP/SIGQUIT that record the
    /// received signal.
    pub fn install() -> Result<Self, ProcError> {
        let signal = Arc::new(AtomicUsize::new(0));
        for sig in [SIGTERM, SIGINT, SIGHUP, SIGQUIT] {
            signal_hook::flag::register_usize(sig, Arc::clone(&signal), sig as usize)
                .map_err(ProcError::SignalSetup)?;
        }
        Ok(Self { signal })
    }

    /// A flag that no handler feeds; for tests and embedders that manage
    /// signals themselves.
    pub fn unregistered() -> Self {
        Self { signal: Arc::new(AtomicUsize::new(0)) }
    }

    /// Record a signal as if it had been delivered.
    pub fn raise(&self, signal: i32) {
        self.signal.store(signal as usize, Ordering::SeqCst);
    }

    /// Error out if a death signal has been received.
    pub fn check(&self) -> Result<(), SignalError> {
        match self.signal.load(Ordering::SeqCst) {
            0 => Ok(()),
            sig => Err(SignalError { signal: sig as i32 }),
        }
    }
}
