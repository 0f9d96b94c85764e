// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures for other crates' tests (behind the `test-support` feature).

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use crate::rendezvous::{LocalRendezvous, RendezvousHandler};
use crate::worker::WorkerSpec;

/// A spec wired to an in-process rendezvous, suitable for driving the agent
/// without external infrastructure.
pub fn local_spec(framework: &str, local_world_size: u32) -> WorkerSpec {
    spec_with_handler(
        framework,
        local_world_size,
        Arc::new(LocalRendezvous::new("test-run")),
    )
}

/// A spec with a caller-provided rendezvous handler.
pub fn spec_with_handler(
    framework: &str,
    local_world_size: u32,
    handler: Arc<dyn RendezvousHandler>,
) -> WorkerSpec {
    WorkerSpec::new(
        framework,
        "test_trainer",
        local_world_size,
        "/usr/bin/env",
        handler,
        Duration::from_millis(10),
    )
    .unwrap()
}
