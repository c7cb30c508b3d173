//! Stake ledger: the credit accrual side of the reward engine.
//!
//! A participant's credit for an epoch is `amount × ticks held` inside that
//! epoch. The ledger never sums credits across all participants; instead each
//! epoch carries a running projection of its total credits, adjusted on every
//! stake and unstake, which serves as the denominator of a claim.
//!
//! `percentage(owner) = accrued(owner) × SCALE / projection(epoch)`
//!
//! This crate handles:
//! - Stake positions and lazy settlement of accrued credits
//! - Per-epoch credit projections (seeded lazily from the total stake)
//! - Claims, forwarded to a configured reward sink
//! - The governor-gated reward-sink reference

pub mod engine;
pub mod position;
pub mod sink;
pub mod state;

pub use engine::{ClaimReceipt, StakeLedger};
pub use position::StakePosition;
pub use sink::{RewardSinkCell, SharedSink};
pub use state::LedgerState;
