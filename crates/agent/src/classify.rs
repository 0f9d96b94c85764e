// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure classification from captured worker stderr.
//!
//! The matcher decides whether a failure looks like fabric/collective
//! trouble (restartable) rather than a bug in user code. The default rule
//! is the current contract; operators can swap in their own predicate.

use std::collections::HashMap;
use std::sync::Arc;

use lattice_multiproc::{ErrorType, ProcessFailure};

/// Predicate over captured stderr: does this failure look infrastructural?
pub type InfraMatcher = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// The default rule: NCCL errors, or gloo peer-connection resets/closes.
pub fn default_infra_matcher() -> InfraMatcher {
    Arc::new(|stderr: &str| {
        stderr.contains("NCCL")
            || (stderr.contains("gloo")
                && (stderr.contains("Connection reset by peer")
                    || stderr.contains("Connection closed by peer")))
    })
}

/// Classify a failure set: any infra-looking failure makes the whole group
/// restartable.
pub fn check_errors(
    failures: &HashMap<u32, ProcessFailure>,
    matcher: &InfraMatcher,
) -> ErrorType {
    if failures.values().any(|failure| matcher(&failure.stderr)) {
        ErrorType::InfraFailure
    } else {
        ErrorType::UserFailure
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
