// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run results reported by the agent.

use std::collections::HashMap;

use lattice_core::WorkerState;
use lattice_multiproc::{ErrorType, ProcessFailure};

/// Outcome of one worker group run, following the all-or-nothing policy:
/// the run succeeded iff every local worker completed successfully.
///
/// `return_values` and `failures` are keyed by GLOBAL rank and their key
/// sets are disjoint. Workers the agent terminated as part of its restart
/// policy appear in neither. Return values only carry data for function
/// entrypoints; binary entrypoints yield `None` per rank.
#[derive(Debug)]
pub struct RunResult {
    pub state: WorkerState,
    pub return_values: HashMap<u32, Option<String>>,
    pub failures: HashMap<u32, ProcessFailure>,
    pub error_type: ErrorType,
}

impl RunResult {
    pub fn with_state(state: WorkerState) -> Self {
        Self {
            state,
            return_values: HashMap::new(),
            failures: HashMap::new(),
            error_type: ErrorType::None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == WorkerState::Failed
    }
}
