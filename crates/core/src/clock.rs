// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for lifecycle timestamps.
//!
//! Work timestamps are Unix epoch seconds as floats. Production code uses
//! [`SystemClock`]; tests inject a [`FakeClock`] so timeout and audit logic
//! can be exercised without sleeping.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Source of wall-clock and monotonic time.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn epoch(&self) -> f64;

    /// Monotonic instant for elapsed-time measurement.
    fn now(&self) -> Instant;
}

/// System time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests.
#[derive(Debug, Clone)]
pub struct FakeClock {
    epoch: Arc<Mutex<f64>>,
    base: Instant,
}

impl FakeClock {
    /// Create a fake clock starting at the given epoch second.
    pub fn new(epoch: f64) -> Self {
        Self {
            epoch: Arc::new(Mutex::new(epoch)),
            base: Instant::now(),
        }
    }

    /// Advance the clock by `secs` seconds.
    pub fn advance(&self, secs: f64) {
        *self.epoch.lock() += secs;
    }
}

impl Clock for FakeClock {
    fn epoch(&self) -> f64 {
        *self.epoch.lock()
    }

    fn now(&self) -> Instant {
        self.base
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
