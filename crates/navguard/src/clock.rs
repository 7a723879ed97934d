//! Wall-clock adapter.
//!
//! The guard state machine takes explicit `now_millis` values so every
//! transition is deterministic and replayable. Hosts that want real time
//! read it through [`Clock`] at the call boundary.

use std::cell::Cell;

/// Epoch-millisecond clock.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Hand-advanced clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: Cell<i64>,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: Cell::new(start_millis),
        }
    }

    pub fn advance(&self, delta_millis: i64) {
        self.millis.set(self.millis.get().saturating_add(delta_millis));
    }

    pub fn set(&self, millis: i64) {
        self.millis.set(millis);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.get()
    }
}
