// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process supervisor for local worker groups.
//!
//! Spawns one child process per local rank with redirected std streams,
//! polls them under an all-or-nothing policy, translates termination
//! signals into recoverable errors, and fans tee'd log files into the
//! aggregate sink with metric-tag extraction.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod errors;
mod group;
mod handler;
mod metrics;
mod monitor;
mod signals;

pub use errors::{ErrorType, ProcError, ProcessFailure, SignalError};
pub use group::{
    start_processes, start_processes_with_clock, ProcGroup, RunProcsResult, StartConfig,
    DEFAULT_CLOSE_GRACE,
};
pub use handler::SubprocessHandler;
pub use metrics::{MetricPublisher, MetricPublisherConfig, PROMETHEUS_BACKEND};
pub use monitor::{LogMonitor, LogSink, METRICS_TAG};
pub use signals::{default_death_signal, kill_signal, TerminationFlag};

pub use nix::sys::signal::Signal;
