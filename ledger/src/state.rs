//! Serializable ledger state.
//!
//! Everything the ledger knows, minus its collaborators. Exported for
//! persistence and restored verbatim; the encoding is bincode.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use yieldshare_types::AccountId;

use crate::position::StakePosition;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Open positions; an account without an entry has nothing staked.
    pub positions: HashMap<AccountId, StakePosition>,
    /// Projected total credits per epoch. An epoch without an entry has not
    /// been seeded yet, which is distinct from a projection of zero.
    pub projections: HashMap<u64, u128>,
    /// `(owner, epoch)` pairs that have claimed.
    pub claims: HashSet<(AccountId, u64)>,
    /// Sum of `amount` over all positions.
    pub total_staked: u128,
}

impl LedgerState {
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Recompute `Σ positions.amount`; should always equal `total_staked`.
    pub fn sum_of_positions(&self) -> u128 {
        self.positions.values().map(|p| p.amount).sum()
    }
}
