//! Reward vault. Holds deposited reward assets per epoch and pays claims.
//!
//! Each epoch owns one pool per asset. The first distribution in an epoch
//! freezes the pools into a snapshot; every later claim in that epoch is
//! computed against the snapshot, clamped to what is actually left:
//!
//! `owed = min(snapshot[asset] × percentage / SCALE, pool[asset])`
//!
//! Unclaimed balances can be moved forward with a rollover.

pub mod state;
pub mod vault;

pub use state::VaultState;
pub use vault::{Rollover, RewardVault};
