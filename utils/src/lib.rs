//! Shared utilities for yieldshare binaries.

pub mod logging;

pub use logging::{init_logging, LogFormat, UnknownLogFormat};
