//! Per-participant stake position and credit settlement.

use serde::{Deserialize, Serialize};
use yieldshare_epoch::Epoch;
use yieldshare_types::{RewardError, Result, Tick};

/// A participant's stake. Exists only while `amount > 0`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePosition {
    /// Units of the governance asset currently staked.
    pub amount: u128,
    /// Counter value up to which `accrued` is settled. Never decreases.
    pub settled_at: Tick,
    /// Credits earned in the epoch containing `settled_at`.
    pub accrued: u128,
    /// This position's contribution to that epoch's credit projection.
    pub projected: u128,
}

impl StakePosition {
    pub fn open(now: Tick) -> Self {
        Self {
            amount: 0,
            settled_at: now,
            accrued: 0,
            projected: 0,
        }
    }

    /// Bring `accrued` up to `now` within `epoch`.
    ///
    /// A position last settled before the epoch began starts over: credits
    /// from earlier epochs do not carry forward, and its projected
    /// contribution is the full-epoch estimate used to seed the projection.
    ///
    /// # Errors
    ///
    /// - [`RewardError::InvalidTime`] if `now` precedes `settled_at`
    /// - [`RewardError::Overflow`] on arithmetic overflow
    pub fn settle(&mut self, epoch: &Epoch, now: Tick) -> Result<()> {
        if now < self.settled_at {
            return Err(RewardError::InvalidTime {
                counter: now.value(),
                reference: self.settled_at.value(),
            });
        }

        if self.settled_at < epoch.start {
            let held = epoch.start.elapsed_until(now) as u128;
            self.accrued = held.checked_mul(self.amount).ok_or(RewardError::Overflow)?;
            self.projected = (epoch.length() as u128)
                .checked_mul(self.amount)
                .ok_or(RewardError::Overflow)?;
        } else {
            let held = self.settled_at.elapsed_until(now) as u128;
            let earned = held.checked_mul(self.amount).ok_or(RewardError::Overflow)?;
            self.accrued = self.accrued.checked_add(earned).ok_or(RewardError::Overflow)?;
        }
        self.settled_at = now;
        Ok(())
    }
}
