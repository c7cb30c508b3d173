//! The reward hub.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use yieldshare_epoch::{Epoch, EpochSchedule};
use yieldshare_ledger::{ClaimReceipt, SharedSink, StakeLedger, StakePosition};
use yieldshare_types::{
    AccountId, AssetId, Clock, EventBus, Result, Tick, TransferGateway,
};
use yieldshare_vault::{Rollover, RewardVault};

use crate::{HubConfig, HubError, HubState};

/// Owns a stake ledger and its reward vault.
///
/// Every operation takes the ledger lock first, vault operations then take
/// the vault lock, so all operations are totally ordered. Transfers run
/// while the ledger lock is held: a gateway must never call back into the
/// hub.
pub struct RewardHub {
    ledger: Mutex<StakeLedger>,
    vault: Arc<Mutex<RewardVault>>,
    clock: Arc<dyn Clock>,
    config: HubConfig,
}

impl RewardHub {
    /// Build the ledger/vault pair from `config`.
    ///
    /// The vault is installed as the ledger's reward sink through the
    /// governor-gated rotation and the allowlist is seeded from
    /// `config.allowed_assets`.
    pub fn new(
        config: HubConfig,
        gateway: Arc<dyn TransferGateway>,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
    ) -> std::result::Result<Self, HubError> {
        let schedule = EpochSchedule::new(Tick::new(config.origin), config.epoch_length)?;
        let governor = AccountId::new(config.governor.clone());

        let mut vault = RewardVault::new(schedule, governor.clone(), gateway.clone(), events.clone());
        for asset in &config.allowed_assets {
            vault.set_allowlist(&governor, &AssetId::new(asset.clone()), true)?;
        }
        let vault = Arc::new(Mutex::new(vault));

        let mut ledger = StakeLedger::new(
            schedule,
            AssetId::new(config.stake_asset.clone()),
            governor.clone(),
            gateway,
            events,
        );
        let sink: SharedSink = vault.clone();
        ledger.rotate_reward_sink(&governor, sink)?;

        tracing::info!(
            origin = config.origin,
            epoch_length = config.epoch_length,
            stake_asset = %config.stake_asset,
            allowed = config.allowed_assets.len(),
            "reward hub ready"
        );

        Ok(Self {
            ledger: Mutex::new(ledger),
            vault,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    // ── Ledger operations ───────────────────────────────────────────────

    pub fn stake(&self, owner: &AccountId, amount: u128) -> Result<()> {
        let now = self.clock.now();
        self.ledger().stake(owner, amount, now)
    }

    pub fn unstake(&self, owner: &AccountId, amount: u128) -> Result<()> {
        let now = self.clock.now();
        self.ledger().unstake(owner, amount, now)
    }

    pub fn claim(&self, owner: &AccountId) -> Result<ClaimReceipt> {
        let now = self.clock.now();
        self.ledger().claim(owner, now)
    }

    pub fn rotate_reward_sink(&self, caller: &AccountId, sink: SharedSink) -> Result<()> {
        self.ledger().rotate_reward_sink(caller, sink)
    }

    // ── Vault operations ────────────────────────────────────────────────

    pub fn deposit(
        &self,
        depositor: &AccountId,
        assets: &[AssetId],
        amounts: &[u128],
        epoch: u64,
    ) -> Result<()> {
        let _serial = self.ledger();
        self.vault().deposit(depositor, assets, amounts, epoch)
    }

    /// Deposit into the epoch the clock is currently in; returns its index.
    pub fn deposit_current(
        &self,
        depositor: &AccountId,
        assets: &[AssetId],
        amounts: &[u128],
    ) -> Result<u64> {
        let now = self.clock.now();
        let _serial = self.ledger();
        self.vault().deposit_current(depositor, assets, amounts, now)
    }

    pub fn rollover(&self, target: u64, source: u64) -> Result<Vec<Rollover>> {
        let _serial = self.ledger();
        self.vault().rollover(target, source)
    }

    pub fn set_allowlist(&self, caller: &AccountId, asset: &AssetId, allowed: bool) -> Result<()> {
        let _serial = self.ledger();
        self.vault().set_allowlist(caller, asset, allowed)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn current_epoch(&self) -> Result<Epoch> {
        self.ledger().epoch_at(self.clock.now())
    }

    pub fn position(&self, owner: &AccountId) -> Option<StakePosition> {
        self.ledger().position(owner).cloned()
    }

    pub fn total_staked(&self) -> u128 {
        self.ledger().total_staked()
    }

    pub fn projection(&self, epoch: u64) -> Option<u128> {
        self.ledger().projection(epoch)
    }

    pub fn has_claimed(&self, owner: &AccountId, epoch: u64) -> bool {
        self.ledger().has_claimed(owner, epoch)
    }

    pub fn claimable_percentage(&self, owner: &AccountId) -> Result<u128> {
        let now = self.clock.now();
        self.ledger().claimable_percentage(owner, now)
    }

    pub fn pool(&self, epoch: u64, asset: &AssetId) -> u128 {
        let _serial = self.ledger();
        self.vault().pool(epoch, asset)
    }

    pub fn snapshot(&self, epoch: u64, asset: &AssetId) -> Option<u128> {
        let _serial = self.ledger();
        self.vault().snapshot(epoch, asset)
    }

    pub fn is_allowed(&self, asset: &AssetId) -> bool {
        let _serial = self.ledger();
        self.vault().is_allowed(asset)
    }

    pub fn epoch_assets(&self, epoch: u64) -> Vec<AssetId> {
        let _serial = self.ledger();
        self.vault().epoch_assets(epoch)
    }

    /// What the gateway must hold in custody for this state: the stake asset
    /// behind every open position plus every undistributed pool.
    pub fn held_balances(&self) -> BTreeMap<AssetId, u128> {
        let ledger = self.ledger();
        let mut held = self.vault().state().holdings();
        if ledger.total_staked() > 0 {
            let entry = held.entry(ledger.stake_asset().clone()).or_default();
            *entry = entry.saturating_add(ledger.total_staked());
        }
        held
    }

    // ── Persistence ─────────────────────────────────────────────────────

    pub fn export_state(&self) -> HubState {
        let ledger = self.ledger();
        let vault = self.vault();
        HubState {
            ledger: ledger.export_state(),
            vault: vault.export_state(),
        }
    }

    /// Replace ledger and vault state. Gateway, events and the sink wiring
    /// are kept.
    pub fn import_state(&self, state: HubState) {
        let mut ledger = self.ledger();
        let mut vault = self.vault();
        ledger.import_state(state.ledger);
        vault.import_state(state.vault);
    }

    pub fn save_state(&self, path: impl AsRef<Path>) -> std::result::Result<(), HubError> {
        let path = path.as_ref();
        self.export_state().write_to(path)?;
        tracing::info!(path = %path.display(), "hub state saved");
        Ok(())
    }

    pub fn load_state(&self, path: impl AsRef<Path>) -> std::result::Result<(), HubError> {
        let path = path.as_ref();
        let state = HubState::read_from(path)?;
        self.import_state(state);
        tracing::info!(path = %path.display(), "hub state loaded");
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn ledger(&self) -> MutexGuard<'_, StakeLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn vault(&self) -> MutexGuard<'_, RewardVault> {
        self.vault.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
