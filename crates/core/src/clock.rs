// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time source abstraction for timing-sensitive paths.
//!
//! The supervisor's grace/wait deadlines, failure timestamps, and the
//! agent's execution timing all read time through [`Clock`] so tests can
//! drive them deterministically with [`FakeClock`].

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Source of monotonic and wall-clock time.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn epoch_ms(&self) -> u64;
}

/// The real system clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Manually advanced clock for tests.
///
/// Anchored at construction; `advance` shifts the monotonic and wall-clock
/// readings by the same amount. Clones share the offset, so a test can
/// hold one handle while the code under test holds another.
#[derive(Clone)]
pub struct FakeClock {
    anchor: Instant,
    base_epoch_ms: u64,
    offset: Arc<Mutex<Duration>>,
}

impl FakeClock {
    /// A clock whose wall-clock reading starts at `base_epoch_ms`.
    pub fn at_epoch_ms(base_epoch_ms: u64) -> Self {
        Self {
            anchor: Instant::now(),
            base_epoch_ms,
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::at_epoch_ms(1_000_000)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.anchor + *self.offset.lock()
    }

    fn epoch_ms(&self) -> u64 {
        self.base_epoch_ms + self.offset.lock().as_millis() as u64
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
