//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the reward engine (clock, value transfer,
//! event sink) sits behind a trait. This crate provides in-memory
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (advance time, arm failures)
//! - Never touch the filesystem or network
//!
//! The simulator binary also runs on these, since it has no real chain to talk to.

pub mod clock;
pub mod events;
pub mod gateway;

pub use clock::NullClock;
pub use events::NullEventLog;
pub use gateway::NullGateway;
