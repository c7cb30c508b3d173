//! Nullable clock: a deterministic counter for testing.

use std::sync::atomic::{AtomicU64, Ordering};
use yieldshare_types::{Clock, Tick};

/// A deterministic counter.
///
/// Time only advances when you tell it to.
pub struct NullClock {
    current: AtomicU64,
}

impl NullClock {
    pub fn new(initial: u64) -> Self {
        Self {
            current: AtomicU64::new(initial),
        }
    }

    /// Advance the counter by `ticks`.
    pub fn advance(&self, ticks: u64) {
        self.current.fetch_add(ticks, Ordering::SeqCst);
    }

    /// Set the counter to a specific value.
    pub fn set(&self, value: u64) {
        self.current.store(value, Ordering::SeqCst);
    }
}

impl Clock for NullClock {
    fn now(&self) -> Tick {
        Tick::new(self.current.load(Ordering::SeqCst))
    }
}

impl Default for NullClock {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_and_set() {
        let clock = NullClock::new(5);
        assert_eq!(clock.now(), Tick::new(5));
        clock.advance(10);
        assert_eq!(clock.now(), Tick::new(15));
        clock.set(3);
        assert_eq!(clock.now(), Tick::new(3));
    }
}
