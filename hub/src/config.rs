//! Hub configuration with TOML file support.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::HubError;

/// Configuration for a reward hub.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Counter value at which epoch 1 begins.
    #[serde(default)]
    pub origin: u64,

    /// Epoch length in counter ticks. Must be nonzero.
    #[serde(default = "default_epoch_length")]
    pub epoch_length: u64,

    /// Asset participants stake.
    #[serde(default = "default_stake_asset")]
    pub stake_asset: String,

    /// Identity allowed to rotate the reward sink and edit the allowlist.
    #[serde(default = "default_governor")]
    pub governor: String,

    /// Reward assets accepted for deposit from the start.
    #[serde(default)]
    pub allowed_assets: Vec<String>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_epoch_length() -> u64 {
    100
}

fn default_stake_asset() -> String {
    "GOV".to_string()
}

fn default_governor() -> String {
    "governor".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl HubConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, HubError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| HubError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, HubError> {
        toml::from_str(s).map_err(|e| HubError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, HubError> {
        toml::to_string_pretty(self).map_err(|e| HubError::Config(e.to_string()))
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            origin: 0,
            epoch_length: default_epoch_length(),
            stake_asset: default_stake_asset(),
            governor: default_governor(),
            allowed_assets: Vec::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = HubConfig::default();
        let toml_str = config.to_toml_string().expect("serialize");
        let parsed = HubConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = HubConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.epoch_length, 100);
        assert_eq!(config.stake_asset, "GOV");
        assert_eq!(config.log_format, "human");
        assert!(config.allowed_assets.is_empty());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            origin = 1000
            epoch_length = 60
            allowed_assets = ["USDC", "WETH"]
        "#;
        let config = HubConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.origin, 1_000);
        assert_eq!(config.epoch_length, 60);
        assert_eq!(config.allowed_assets, vec!["USDC", "WETH"]);
        assert_eq!(config.governor, "governor"); // default
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = HubConfig::from_toml_str("epoch_length = \"soon\"").unwrap_err();
        assert!(matches!(err, HubError::Config(_)));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = HubConfig::from_toml_file("/nonexistent/yieldshare.toml").unwrap_err();
        assert!(matches!(err, HubError::Config(msg) if msg.contains("yieldshare.toml")));
    }
}
