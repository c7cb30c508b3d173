//! Reward hub: composes the stake ledger and the reward vault.
//!
//! The hub owns the pair, installs the vault as the ledger's reward sink,
//! reads the counter from an injected clock and serializes every operation
//! behind a single lock.

pub mod config;
pub mod error;
pub mod hub;
pub mod state;

pub use config::HubConfig;
pub use error::HubError;
pub use hub::RewardHub;
pub use state::HubState;
