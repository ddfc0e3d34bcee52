// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Idp Sync Authors

//! Clock abstraction for testable time handling.
//!
//! The reconciler's `user_deleted` cutoff and the event-log poller's cursor
//! both depend on "now" — every place that matters takes a `Clock` so tests
//! can inject a `FakeClock` instead of racing the wall clock.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// A clock that provides the current time.
///
/// Deliberately not `Clone`-bounded: every caller holds this behind
/// `Arc<dyn Clock>`, and a `Clone` supertrait would make the trait object
/// unconstructible (`Clone::clone` returns `Self` by value).
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl FakeClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { current: Arc::new(Mutex::new(start)) }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, duration: chrono::Duration) {
        let mut current = self.current.lock();
        *current += duration;
    }

    /// Set the clock to a specific instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock() = instant;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
