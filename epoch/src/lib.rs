//! Epoch schedule.
//!
//! An epoch is a fixed-length window of the monotonic counter. Epochs are
//! derived, never stored: every bound is a pure function of the counter.
//!
//! ```text
//! index = ⌊(counter − origin) / length⌋ + 1
//! start = origin + (index − 1) · length
//! end   = start + length
//! ```
//!
//! Epoch indices start at 1. The claim window of an epoch is its first half,
//! inclusive of the midpoint.

use serde::{Deserialize, Serialize};
use yieldshare_types::{RewardError, Result, Tick};

/// Bounds of one epoch. `start` is inclusive, `end` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epoch {
    pub index: u64,
    pub start: Tick,
    pub end: Tick,
}

impl Epoch {
    pub fn length(&self) -> u64 {
        self.end.value() - self.start.value()
    }

    /// Counter ticks left in the epoch at `now`.
    pub fn remaining(&self, now: Tick) -> u64 {
        now.elapsed_until(self.end)
    }

    /// Last counter value at which claims are accepted.
    pub fn claim_deadline(&self) -> Tick {
        Tick::new(self.start.value() + self.length() / 2)
    }

    pub fn claim_window_open(&self, now: Tick) -> bool {
        now >= self.start && now <= self.claim_deadline()
    }
}

/// Maps counter values to epochs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSchedule {
    origin: Tick,
    length: u64,
}

impl EpochSchedule {
    /// # Errors
    ///
    /// - [`RewardError::InvalidSchedule`] if `length` is zero
    pub fn new(origin: Tick, length: u64) -> Result<Self> {
        if length == 0 {
            return Err(RewardError::InvalidSchedule);
        }
        Ok(Self { origin, length })
    }

    pub fn origin(&self) -> Tick {
        self.origin
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// The epoch containing `counter`.
    ///
    /// # Errors
    ///
    /// - [`RewardError::InvalidTime`] if `counter` precedes the origin
    /// - [`RewardError::Overflow`] if the epoch end does not fit the counter
    pub fn epoch_of(&self, counter: Tick) -> Result<Epoch> {
        if counter < self.origin {
            return Err(RewardError::InvalidTime {
                counter: counter.value(),
                reference: self.origin.value(),
            });
        }
        let offset = counter.value() - self.origin.value();
        let index = offset / self.length + 1;
        self.bounds(index)
    }

    /// Bounds of the epoch with the given 1-based index.
    pub fn bounds(&self, index: u64) -> Result<Epoch> {
        let start = index
            .checked_sub(1)
            .and_then(|i| i.checked_mul(self.length))
            .and_then(|s| s.checked_add(self.origin.value()))
            .ok_or(RewardError::Overflow)?;
        let end = start.checked_add(self.length).ok_or(RewardError::Overflow)?;
        Ok(Epoch {
            index,
            start: Tick::new(start),
            end: Tick::new(end),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(origin: u64, length: u64) -> EpochSchedule {
        EpochSchedule::new(Tick::new(origin), length).expect("valid schedule")
    }

    #[test]
    fn first_epoch_starts_at_origin() {
        let s = schedule(0, 100);
        let e = s.epoch_of(Tick::new(0)).expect("epoch");
        assert_eq!(e.index, 1);
        assert_eq!(e.start, Tick::new(0));
        assert_eq!(e.end, Tick::new(100));
    }

    #[test]
    fn boundary_belongs_to_next_epoch() {
        let s = schedule(0, 100);
        assert_eq!(s.epoch_of(Tick::new(99)).expect("epoch").index, 1);
        assert_eq!(s.epoch_of(Tick::new(100)).expect("epoch").index, 2);
    }

    #[test]
    fn nonzero_origin_offsets_bounds() {
        let s = schedule(1_000, 50);
        let e = s.epoch_of(Tick::new(1_120)).expect("epoch");
        assert_eq!(e.index, 3);
        assert_eq!(e.start, Tick::new(1_100));
        assert_eq!(e.end, Tick::new(1_150));
        assert_eq!(e.remaining(Tick::new(1_120)), 30);
    }

    #[test]
    fn counter_before_origin_is_invalid_time() {
        let s = schedule(1_000, 50);
        let err = s.epoch_of(Tick::new(999)).unwrap_err();
        assert!(matches!(
            err,
            RewardError::InvalidTime {
                counter: 999,
                reference: 1_000
            }
        ));
    }

    #[test]
    fn zero_length_rejected() {
        assert!(matches!(
            EpochSchedule::new(Tick::ZERO, 0),
            Err(RewardError::InvalidSchedule)
        ));
    }

    #[test]
    fn claim_window_is_first_half_inclusive() {
        let s = schedule(0, 100);
        let e = s.epoch_of(Tick::new(10)).expect("epoch");
        assert_eq!(e.claim_deadline(), Tick::new(50));
        assert!(e.claim_window_open(Tick::new(0)));
        assert!(e.claim_window_open(Tick::new(50)));
        assert!(!e.claim_window_open(Tick::new(51)));
    }

    #[test]
    fn bounds_of_index_zero_is_overflow() {
        assert!(matches!(schedule(0, 10).bounds(0), Err(RewardError::Overflow)));
    }
}
