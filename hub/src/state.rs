//! Combined hub state, persisted as one bincode file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use yieldshare_ledger::LedgerState;
use yieldshare_vault::VaultState;

use crate::HubError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubState {
    pub ledger: LedgerState,
    pub vault: VaultState,
}

impl HubState {
    pub fn to_bytes(&self) -> Result<Vec<u8>, HubError> {
        bincode::serialize(self).map_err(|e| HubError::State(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HubError> {
        bincode::deserialize(bytes).map_err(|e| HubError::State(e.to_string()))
    }

    pub fn write_to(&self, path: &Path) -> Result<(), HubError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)
            .map_err(|e| HubError::State(format!("{}: {e}", path.display())))
    }

    pub fn read_from(path: &Path) -> Result<Self, HubError> {
        let bytes = std::fs::read(path)
            .map_err(|e| HubError::State(format!("{}: {e}", path.display())))?;
        Self::from_bytes(&bytes)
    }
}
