//! Error taxonomy shared by the ledger and the vault.
//!
//! Every failure is scoped to one invocation: the operation that returns it
//! has left no state change and issued no transfer.

use thiserror::Error;

use crate::account::{AccountId, AssetId};
use crate::transfer::TransferError;

#[derive(Debug, Error)]
pub enum RewardError {
    #[error("invalid amount: requested {requested}, available {available}")]
    InvalidAmount { requested: u128, available: u128 },

    #[error("counter {counter} precedes reference point {reference}")]
    InvalidTime { counter: u64, reference: u64 },

    #[error("epoch length must be non-zero")]
    InvalidSchedule,

    #[error("asset and amount lists must be non-empty and of equal length ({assets} vs {amounts})")]
    ArityMismatch { assets: usize, amounts: usize },

    #[error("asset {0} is not allow-listed")]
    AssetNotAllowed(AssetId),

    #[error("percentage {0} outside (0, SCALE]")]
    InvalidPercentage(u128),

    #[error("epoch {0} has nothing to distribute")]
    NothingToDistribute(u64),

    #[error("claim window closed at {closes_at}, now {now}")]
    ClaimWindowClosed { now: u64, closes_at: u64 },

    #[error("{owner} has already claimed epoch {epoch}")]
    AlreadyClaimed { owner: AccountId, epoch: u64 },

    #[error("no reward sink configured")]
    NoRewardSink,

    #[error("epoch {0} has no credit projection")]
    ZeroProjection(u64),

    #[error("{0} is not authorized for this operation")]
    Unauthorized(AccountId),

    #[error("arithmetic overflow in reward accounting")]
    Overflow,

    #[error("value transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

pub type Result<T> = std::result::Result<T, RewardError>;
