//! The monotonic counter that drives epochs and credit accrual.
//!
//! A tick is whatever the host uses as its ordering clock (block height,
//! slot, seconds). The engine only relies on it never going backwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A value of the host's monotonic counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick(u64);

impl Tick {
    pub const ZERO: Self = Self(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Ticks elapsed from `self` up to `now` (zero if `now` is earlier).
    pub fn elapsed_until(&self, now: Tick) -> u64 {
        now.0.saturating_sub(self.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for Tick {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Source of the current counter value.
pub trait Clock: Send + Sync {
    fn now(&self) -> Tick;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_saturates_backwards() {
        assert_eq!(Tick::new(10).elapsed_until(Tick::new(25)), 15);
        assert_eq!(Tick::new(25).elapsed_until(Tick::new(10)), 0);
    }
}
