//! Core stake ledger engine.

use std::sync::{Arc, PoisonError};

use serde::Serialize;
use yieldshare_epoch::{Epoch, EpochSchedule};
use yieldshare_types::{
    mul_div, AccountId, AssetId, EventBus, Payout, RewardError, RewardEvent, Result, Tick,
    TransferGateway, SCALE,
};

use crate::position::StakePosition;
use crate::sink::{RewardSinkCell, SharedSink};
use crate::state::LedgerState;

/// Outcome of a successful claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClaimReceipt {
    pub epoch: u64,
    pub accrued: u128,
    pub percentage: u128,
    pub payouts: Vec<Payout>,
}

/// Prior values of every key one operation touches, restored if its
/// transfer step fails.
struct Checkpoint {
    owner: AccountId,
    position: Option<StakePosition>,
    epoch: u64,
    projection: Option<u128>,
    total_staked: u128,
    claimed: bool,
}

/// Owns stake positions and turns settled credits into claim shares.
///
/// Every mutating operation validates first, commits its state, and only then
/// hands value movement to the transfer gateway. A failed transfer restores
/// the touched keys before the error is returned.
pub struct StakeLedger {
    schedule: EpochSchedule,
    stake_asset: AssetId,
    state: LedgerState,
    sink: RewardSinkCell,
    gateway: Arc<dyn TransferGateway>,
    events: Arc<EventBus>,
}

impl StakeLedger {
    pub fn new(
        schedule: EpochSchedule,
        stake_asset: AssetId,
        governor: AccountId,
        gateway: Arc<dyn TransferGateway>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            schedule,
            stake_asset,
            state: LedgerState::default(),
            sink: RewardSinkCell::new(governor),
            gateway,
            events,
        }
    }

    /// Stake `amount` of the governance asset for `owner`.
    ///
    /// The first stake of an epoch seeds its projection as
    /// `total_staked × epoch_length`, i.e. all stake already present is
    /// assumed to be held for the whole epoch.
    ///
    /// # Errors
    ///
    /// - [`RewardError::InvalidAmount`] if `amount` is zero
    /// - [`RewardError::InvalidTime`] if `now` precedes the origin or the position's last settlement
    /// - [`RewardError::Transfer`] if the pull of funds fails (nothing is changed)
    pub fn stake(&mut self, owner: &AccountId, amount: u128, now: Tick) -> Result<()> {
        if amount == 0 {
            return Err(RewardError::InvalidAmount {
                requested: 0,
                available: self.balance_of(owner),
            });
        }
        let epoch = self.schedule.epoch_of(now)?;

        let mut position = match self.state.positions.get(owner) {
            Some(existing) => {
                let mut p = existing.clone();
                p.settle(&epoch, now)?;
                p
            }
            None => StakePosition::open(now),
        };
        let projected = (epoch.remaining(now) as u128)
            .checked_mul(amount)
            .ok_or(RewardError::Overflow)?;
        position.amount = position.amount.checked_add(amount).ok_or(RewardError::Overflow)?;
        position.projected = position
            .projected
            .checked_add(projected)
            .ok_or(RewardError::Overflow)?;
        position.settled_at = now;
        let projection = self
            .seeded_projection(&epoch)?
            .checked_add(projected)
            .ok_or(RewardError::Overflow)?;
        let total_staked = self
            .state
            .total_staked
            .checked_add(amount)
            .ok_or(RewardError::Overflow)?;
        let balance = position.amount;

        let checkpoint = self.checkpoint(owner, epoch.index);
        self.state.positions.insert(owner.clone(), position);
        self.state.projections.insert(epoch.index, projection);
        self.state.total_staked = total_staked;

        if let Err(e) = self.gateway.transfer_in(owner, &self.stake_asset, amount) {
            self.restore(checkpoint);
            tracing::warn!(%owner, amount, error = %e, "stake rolled back");
            return Err(e.into());
        }

        tracing::info!(%owner, amount, epoch = epoch.index, projected, "staked");
        self.events.emit(&RewardEvent::Staked {
            owner: owner.clone(),
            epoch: epoch.index,
            amount,
            projected,
            balance,
        });
        Ok(())
    }

    /// Withdraw `amount` of `owner`'s stake.
    ///
    /// The epoch projection loses the credits the withdrawn units would have
    /// earned over the rest of the epoch. A position reduced to zero is
    /// deleted, forfeiting whatever it had accrued.
    ///
    /// # Errors
    ///
    /// - [`RewardError::InvalidAmount`] if `amount` is zero or exceeds the position
    /// - [`RewardError::InvalidTime`] if `now` precedes the origin or the position's last settlement
    /// - [`RewardError::Transfer`] if the release of funds fails (nothing is changed)
    pub fn unstake(&mut self, owner: &AccountId, amount: u128, now: Tick) -> Result<()> {
        let available = self.balance_of(owner);
        if amount == 0 || amount > available {
            return Err(RewardError::InvalidAmount {
                requested: amount,
                available,
            });
        }
        let epoch = self.schedule.epoch_of(now)?;

        let mut position = match self.state.positions.get(owner) {
            Some(existing) => existing.clone(),
            None => {
                return Err(RewardError::InvalidAmount {
                    requested: amount,
                    available: 0,
                })
            }
        };
        position.settle(&epoch, now)?;
        let released = (epoch.remaining(now) as u128)
            .checked_mul(amount)
            .ok_or(RewardError::Overflow)?;
        let projection = self.seeded_projection(&epoch)?.saturating_sub(released);
        position.projected = position.projected.saturating_sub(released);
        position.amount -= amount;
        let total_staked = self
            .state
            .total_staked
            .checked_sub(amount)
            .ok_or(RewardError::Overflow)?;
        let balance = position.amount;

        let checkpoint = self.checkpoint(owner, epoch.index);
        if balance == 0 {
            self.state.positions.remove(owner);
        } else {
            self.state.positions.insert(owner.clone(), position);
        }
        self.state.projections.insert(epoch.index, projection);
        self.state.total_staked = total_staked;

        if let Err(e) = self.gateway.transfer_out(owner, &self.stake_asset, amount) {
            self.restore(checkpoint);
            tracing::warn!(%owner, amount, error = %e, "unstake rolled back");
            return Err(e.into());
        }

        tracing::info!(%owner, amount, epoch = epoch.index, released, balance, "unstaked");
        self.events.emit(&RewardEvent::Unstaked {
            owner: owner.clone(),
            epoch: epoch.index,
            amount,
            released,
            balance,
        });
        Ok(())
    }

    /// Claim `owner`'s share of the current epoch's rewards.
    ///
    /// Settles the position, computes
    /// `percentage = accrued × SCALE / projection(epoch)` and forwards it to
    /// the reward sink. A sink failure undoes the settlement and the claim mark.
    ///
    /// # Errors
    ///
    /// - [`RewardError::ClaimWindowClosed`] past the epoch midpoint
    /// - [`RewardError::AlreadyClaimed`] on a second claim for the same epoch
    /// - [`RewardError::NoRewardSink`] if no sink is configured
    /// - [`RewardError::ZeroProjection`] if the epoch has no projection
    /// - any error returned by the sink's `distribute`
    pub fn claim(&mut self, owner: &AccountId, now: Tick) -> Result<ClaimReceipt> {
        let epoch = self.schedule.epoch_of(now)?;
        if !epoch.claim_window_open(now) {
            return Err(RewardError::ClaimWindowClosed {
                now: now.value(),
                closes_at: epoch.claim_deadline().value(),
            });
        }
        if self.has_claimed(owner, epoch.index) {
            return Err(RewardError::AlreadyClaimed {
                owner: owner.clone(),
                epoch: epoch.index,
            });
        }
        let sink = self.sink.current().ok_or(RewardError::NoRewardSink)?;

        let settled = match self.state.positions.get(owner) {
            Some(existing) => {
                let mut p = existing.clone();
                p.settle(&epoch, now)?;
                Some(p)
            }
            None => None,
        };
        let accrued = settled.as_ref().map_or(0, |p| p.accrued);
        let projection = match self.state.projections.get(&epoch.index) {
            Some(&p) if p > 0 => p,
            _ => return Err(RewardError::ZeroProjection(epoch.index)),
        };
        let percentage = mul_div(accrued, SCALE, projection).ok_or(RewardError::Overflow)?;

        let mut checkpoint = self.checkpoint(owner, epoch.index);
        checkpoint.claimed = true;
        if let Some(p) = settled {
            self.state.positions.insert(owner.clone(), p);
        }
        self.state.claims.insert((owner.clone(), epoch.index));

        let distributed = sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .distribute(percentage, owner, epoch.index);
        let payouts = match distributed {
            Ok(payouts) => payouts,
            Err(e) => {
                self.restore(checkpoint);
                tracing::warn!(%owner, epoch = epoch.index, percentage, error = %e, "claim rolled back");
                return Err(e);
            }
        };

        tracing::info!(%owner, epoch = epoch.index, accrued, percentage, "claimed");
        self.events.emit(&RewardEvent::Claimed {
            owner: owner.clone(),
            epoch: epoch.index,
            accrued,
            percentage,
        });
        Ok(ClaimReceipt {
            epoch: epoch.index,
            accrued,
            percentage,
            payouts,
        })
    }

    /// Replace the reward sink. Restricted to the governor.
    pub fn rotate_reward_sink(&mut self, caller: &AccountId, sink: SharedSink) -> Result<()> {
        self.sink.rotate(caller, sink)?;
        tracing::info!(by = %caller, "reward sink rotated");
        self.events.emit(&RewardEvent::RewardSinkRotated { by: caller.clone() });
        Ok(())
    }

    /// Percentage `owner` would receive if they claimed at `now`, without
    /// changing any state. Ignores the claim window and prior claims.
    pub fn claimable_percentage(&self, owner: &AccountId, now: Tick) -> Result<u128> {
        let epoch = self.schedule.epoch_of(now)?;
        let accrued = match self.state.positions.get(owner) {
            Some(existing) => {
                let mut p = existing.clone();
                p.settle(&epoch, now)?;
                p.accrued
            }
            None => 0,
        };
        match self.state.projections.get(&epoch.index) {
            Some(&p) if p > 0 => mul_div(accrued, SCALE, p).ok_or(RewardError::Overflow),
            _ => Err(RewardError::ZeroProjection(epoch.index)),
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn position(&self, owner: &AccountId) -> Option<&StakePosition> {
        self.state.positions.get(owner)
    }

    pub fn balance_of(&self, owner: &AccountId) -> u128 {
        self.state.positions.get(owner).map_or(0, |p| p.amount)
    }

    pub fn total_staked(&self) -> u128 {
        self.state.total_staked
    }

    pub fn projection(&self, epoch: u64) -> Option<u128> {
        self.state.projections.get(&epoch).copied()
    }

    pub fn has_claimed(&self, owner: &AccountId, epoch: u64) -> bool {
        self.state.claims.contains(&(owner.clone(), epoch))
    }

    pub fn epoch_at(&self, now: Tick) -> Result<Epoch> {
        self.schedule.epoch_of(now)
    }

    pub fn schedule(&self) -> &EpochSchedule {
        &self.schedule
    }

    pub fn stake_asset(&self) -> &AssetId {
        &self.stake_asset
    }

    pub fn has_reward_sink(&self) -> bool {
        self.sink.is_configured()
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn export_state(&self) -> LedgerState {
        self.state.clone()
    }

    /// Replace all ledger state. Collaborators are left untouched.
    pub fn import_state(&mut self, state: LedgerState) {
        self.state = state;
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// The epoch's projection, or the seed it would receive on first touch.
    fn seeded_projection(&self, epoch: &Epoch) -> Result<u128> {
        match self.state.projections.get(&epoch.index) {
            Some(&p) => Ok(p),
            None => self
                .state
                .total_staked
                .checked_mul(epoch.length() as u128)
                .ok_or(RewardError::Overflow),
        }
    }

    fn checkpoint(&self, owner: &AccountId, epoch: u64) -> Checkpoint {
        Checkpoint {
            owner: owner.clone(),
            position: self.state.positions.get(owner).cloned(),
            epoch,
            projection: self.state.projections.get(&epoch).copied(),
            total_staked: self.state.total_staked,
            claimed: false,
        }
    }

    fn restore(&mut self, cp: Checkpoint) {
        match cp.position {
            Some(p) => self.state.positions.insert(cp.owner.clone(), p),
            None => self.state.positions.remove(&cp.owner),
        };
        match cp.projection {
            Some(p) => self.state.projections.insert(cp.epoch, p),
            None => self.state.projections.remove(&cp.epoch),
        };
        if cp.claimed {
            self.state.claims.remove(&(cp.owner, cp.epoch));
        }
        self.state.total_staked = cp.total_staked;
    }
}
