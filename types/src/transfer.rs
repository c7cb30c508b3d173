//! The value-transfer boundary.
//!
//! The engine never moves value itself. Each mutating operation describes the
//! movements it needs as a batch of [`Transfer`]s and hands the whole batch to
//! a [`TransferGateway`] as its final step, after its own state is committed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::{AccountId, AssetId};

/// One movement of value across the engine's boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transfer {
    /// Pull `amount` of `asset` from `from` into engine custody.
    In {
        from: AccountId,
        asset: AssetId,
        amount: u128,
    },
    /// Push `amount` of `asset` out of engine custody to `to`.
    Out {
        to: AccountId,
        asset: AssetId,
        amount: u128,
    },
}

impl Transfer {
    pub fn asset(&self) -> &AssetId {
        match self {
            Self::In { asset, .. } | Self::Out { asset, .. } => asset,
        }
    }

    pub fn amount(&self) -> u128 {
        match self {
            Self::In { amount, .. } | Self::Out { amount, .. } => *amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("transfer declined: {0}")]
    Declined(String),

    #[error("transfer collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Synchronous, all-or-nothing value movement.
///
/// `execute` either applies every transfer in the batch or none of them.
/// Implementations must not call back into the engine that issued the batch.
pub trait TransferGateway: Send + Sync {
    fn execute(&self, batch: &[Transfer]) -> Result<(), TransferError>;

    fn transfer_in(&self, from: &AccountId, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        self.execute(&[Transfer::In {
            from: from.clone(),
            asset: asset.clone(),
            amount,
        }])
    }

    fn transfer_out(&self, to: &AccountId, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        self.execute(&[Transfer::Out {
            to: to.clone(),
            asset: asset.clone(),
            amount,
        }])
    }
}
