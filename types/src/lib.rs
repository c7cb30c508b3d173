//! Fundamental types for the yieldshare reward engine.
//!
//! This crate defines the vocabulary shared by every other crate in the workspace:
//! account and asset identities, the monotonic counter, fixed-point helpers, the
//! error taxonomy, and the two collaborator boundaries (value transfer and reward
//! sink) plus the structured records emitted on every mutation.

pub mod account;
pub mod error;
pub mod event;
pub mod fixed;
pub mod sink;
pub mod time;
pub mod transfer;

pub use account::{AccountId, AssetId};
pub use error::{RewardError, Result};
pub use event::{EventBus, RewardEvent};
pub use fixed::{mul_div, SCALE};
pub use sink::{Payout, RewardSink};
pub use time::{Clock, Tick};
pub use transfer::{Transfer, TransferError, TransferGateway};
