use crate::clock::Clock;
use std::sync::{Arc, Mutex};

/// A test implementation of [`Clock`] that allows deterministic control of the
/// current time in unit tests.
///
/// Clones share the same time value, so a test can keep a clone and move the
/// other one into the module under test.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Creates a clock that reports `now` milliseconds.
    pub fn new(now: f64) -> Self {
        ManualClock {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Sets the time reported by every clone of this clock.
    pub fn set(&self, now: f64) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
