//! The reward-sink boundary between the stake ledger and the reward vault.

use serde::{Deserialize, Serialize};

use crate::account::{AccountId, AssetId};
use crate::error::Result;

/// Amount of one asset paid to a claimant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub asset: AssetId,
    pub amount: u128,
}

/// Receiver of claim results: pays `percentage / SCALE` of an epoch's frozen
/// pools to `owner`.
///
/// A returned error means nothing was paid and the sink's state is unchanged.
pub trait RewardSink {
    fn distribute(&mut self, percentage: u128, owner: &AccountId, epoch: u64) -> Result<Vec<Payout>>;
}
