//! Simulation scripts.
//!
//! A script is a TOML document made of `[[step]]` tables, each carrying the
//! counter value it runs at and an `op` with its fields:
//!
//! ```toml
//! [[step]]
//! at = 0
//! op = "deposit"
//! depositor = "treasury"
//! assets = ["USDC"]
//! amounts = [1000]
//!
//! [[step]]
//! at = 50
//! op = "claim"
//! owner = "alice"
//! ```

use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(rename = "step", default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    pub at: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    Stake {
        owner: String,
        amount: u64,
    },
    Unstake {
        owner: String,
        amount: u64,
    },
    Claim {
        owner: String,
    },
    Deposit {
        depositor: String,
        assets: Vec<String>,
        amounts: Vec<u64>,
        /// Defaults to the epoch containing `at`.
        #[serde(default)]
        epoch: Option<u64>,
    },
    Rollover {
        target: u64,
        source: u64,
    },
    Allow {
        asset: String,
        #[serde(default = "default_allowed")]
        allowed: bool,
        /// Defaults to the configured governor.
        #[serde(default)]
        caller: Option<String>,
    },
}

fn default_allowed() -> bool {
    true
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stake { .. } => "stake",
            Self::Unstake { .. } => "unstake",
            Self::Claim { .. } => "claim",
            Self::Deposit { .. } => "deposit",
            Self::Rollover { .. } => "rollover",
            Self::Allow { .. } => "allow",
        }
    }
}

impl Script {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let script: Script = toml::from_str(s).context("invalid simulation script")?;
        script.check_order()?;
        Ok(script)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Steps must not move the counter backwards.
    fn check_order(&self) -> anyhow::Result<()> {
        for (i, pair) in self.steps.windows(2).enumerate() {
            if pair[1].at < pair[0].at {
                bail!(
                    "step {} runs at {} but step {} already ran at {}",
                    i + 2,
                    pair[1].at,
                    i + 1,
                    pair[0].at
                );
            }
        }
        Ok(())
    }
}
