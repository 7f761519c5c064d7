//! Deterministic `Clock` implementations for tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use storyweave_core::clock::Clock;

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A clock tests advance manually. Clones share the same underlying time,
/// so a test can hold one handle while the engine holds another.
#[derive(Debug, Clone)]
pub struct StepClock(Arc<Mutex<DateTime<Utc>>>);

impl StepClock {
    /// Creates a step clock starting at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Arc::new(Mutex::new(start)))
    }

    /// Advances the clock by `delta` and returns the new time.
    ///
    /// # Panics
    ///
    /// Panics if a clone of this clock panicked while holding the lock.
    pub fn advance(&self, delta: Duration) -> DateTime<Utc> {
        let mut now = self.0.lock().unwrap();
        *now += delta;
        *now
    }
}

impl Default for StepClock {
    /// Starts at the Unix epoch.
    fn default() -> Self {
        Self::new(DateTime::UNIX_EPOCH)
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}
