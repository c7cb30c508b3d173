//! Structured records emitted after every committed mutation.

use serde::Serialize;

use crate::account::{AccountId, AssetId};

/// Audit record for one committed state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewardEvent {
    Staked {
        owner: AccountId,
        epoch: u64,
        amount: u128,
        /// Credits added to the epoch projection by this stake.
        projected: u128,
        balance: u128,
    },
    Unstaked {
        owner: AccountId,
        epoch: u64,
        amount: u128,
        /// Credits removed from the epoch projection by this unstake.
        released: u128,
        balance: u128,
    },
    Claimed {
        owner: AccountId,
        epoch: u64,
        accrued: u128,
        percentage: u128,
    },
    Deposited {
        depositor: AccountId,
        epoch: u64,
        asset: AssetId,
        amount: u128,
    },
    Distributed {
        owner: AccountId,
        epoch: u64,
        asset: AssetId,
        amount: u128,
    },
    RolledOver {
        source_epoch: u64,
        target_epoch: u64,
        asset: AssetId,
        amount: u128,
    },
    AllowlistUpdated {
        asset: AssetId,
        allowed: bool,
    },
    RewardSinkRotated {
        by: AccountId,
    },
}

impl RewardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Staked { .. } => "staked",
            Self::Unstaked { .. } => "unstaked",
            Self::Claimed { .. } => "claimed",
            Self::Deposited { .. } => "deposited",
            Self::Distributed { .. } => "distributed",
            Self::RolledOver { .. } => "rolled_over",
            Self::AllowlistUpdated { .. } => "allowlist_updated",
            Self::RewardSinkRotated { .. } => "reward_sink_rotated",
        }
    }
}

/// Synchronous fan-out bus for reward events.
///
/// Listeners are invoked inline on the emitting thread, after the emitting
/// operation has committed; keep handlers fast.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&RewardEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&RewardEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &RewardEvent) {
        tracing::debug!(kind = event.name(), ?event, "reward event");
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
