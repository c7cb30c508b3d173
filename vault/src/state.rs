//! Serializable vault state.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use yieldshare_types::AssetId;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
    /// Remaining balance per `(epoch, asset)`.
    pub pools: HashMap<(u64, AssetId), u128>,
    /// Assets registered for distribution in each epoch.
    pub asset_lists: HashMap<u64, BTreeSet<AssetId>>,
    /// Pool balances frozen at the epoch's first distribution. Written once.
    pub snapshots: HashMap<u64, BTreeMap<AssetId, u128>>,
    pub allowlist: HashSet<AssetId>,
}

impl VaultState {
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    pub fn pool(&self, epoch: u64, asset: &AssetId) -> u128 {
        self.pools
            .get(&(epoch, asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Everything the vault holds per asset, across all epochs.
    pub fn holdings(&self) -> BTreeMap<AssetId, u128> {
        let mut held: BTreeMap<AssetId, u128> = BTreeMap::new();
        for ((_, asset), amount) in &self.pools {
            let entry = held.entry(asset.clone()).or_default();
            *entry = entry.saturating_add(*amount);
        }
        held.retain(|_, amount| *amount > 0);
        held
    }
}
