//! Nullable clock: block timestamps under test control.

use stakelock_types::Timestamp;
use std::cell::Cell;

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to.
pub struct NullClock {
    current: Cell<Timestamp>,
}

impl NullClock {
    pub fn new(initial_secs: u64) -> Self {
        Self {
            current: Cell::new(Timestamp::new(initial_secs)),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.current.get()
    }

    /// Advance time by `secs`, saturating at the far end of the range.
    pub fn advance(&self, secs: u64) {
        self.current.set(self.current.get().saturating_add(secs));
    }

    /// Advance by whole days.
    pub fn advance_days(&self, days: u64) {
        self.advance(days.saturating_mul(86_400));
    }

    pub fn set(&self, at: Timestamp) {
        self.current.set(at);
    }
}
