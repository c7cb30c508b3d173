//! Reward vault engine.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use yieldshare_epoch::EpochSchedule;
use yieldshare_types::{
    mul_div, AccountId, AssetId, EventBus, Payout, RewardError, RewardEvent, RewardSink, Result,
    Tick, Transfer, TransferGateway, SCALE,
};

use crate::state::VaultState;

/// One balance moved by a rollover.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rollover {
    pub asset: AssetId,
    pub amount: u128,
}

/// Prior values of the keys one operation touches in a single epoch,
/// restored if its transfer batch fails.
struct Checkpoint {
    epoch: u64,
    pools: Vec<(AssetId, Option<u128>)>,
    asset_list: Option<BTreeSet<AssetId>>,
    snapshot: Option<BTreeMap<AssetId, u128>>,
}

/// Per-epoch reward pools with frozen distribution snapshots.
///
/// Like the stake ledger, every mutating operation commits its state before
/// handing its transfer batch to the gateway and restores the touched keys
/// if the batch fails.
pub struct RewardVault {
    schedule: EpochSchedule,
    governor: AccountId,
    state: VaultState,
    gateway: Arc<dyn TransferGateway>,
    events: Arc<EventBus>,
}

impl RewardVault {
    pub fn new(
        schedule: EpochSchedule,
        governor: AccountId,
        gateway: Arc<dyn TransferGateway>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            schedule,
            governor,
            state: VaultState::default(),
            gateway,
            events,
        }
    }

    /// Fund `epoch`'s pools with `amounts[i]` of `assets[i]`.
    ///
    /// All pulls go to the gateway as one batch; if it fails no pool changes.
    /// Zero amounts are skipped and an asset repeated in one call accumulates.
    ///
    /// # Errors
    ///
    /// - [`RewardError::ArityMismatch`] if the lists are empty or differ in length
    /// - [`RewardError::AssetNotAllowed`] if any asset is off the allowlist
    /// - [`RewardError::Transfer`] if the gateway rejects the batch
    pub fn deposit(
        &mut self,
        depositor: &AccountId,
        assets: &[AssetId],
        amounts: &[u128],
        epoch: u64,
    ) -> Result<()> {
        if assets.is_empty() || assets.len() != amounts.len() {
            return Err(RewardError::ArityMismatch {
                assets: assets.len(),
                amounts: amounts.len(),
            });
        }
        if let Some(asset) = assets.iter().find(|a| !self.state.allowlist.contains(*a)) {
            return Err(RewardError::AssetNotAllowed(asset.clone()));
        }

        let mut credited: BTreeMap<AssetId, u128> = BTreeMap::new();
        let mut batch = Vec::new();
        for (asset, &amount) in assets.iter().zip(amounts) {
            if amount == 0 {
                continue;
            }
            let entry = credited.entry(asset.clone()).or_default();
            *entry = entry.checked_add(amount).ok_or(RewardError::Overflow)?;
            batch.push(Transfer::In {
                from: depositor.clone(),
                asset: asset.clone(),
                amount,
            });
        }
        let mut updated = Vec::with_capacity(credited.len());
        for (asset, amount) in &credited {
            let pool = self
                .state
                .pool(epoch, asset)
                .checked_add(*amount)
                .ok_or(RewardError::Overflow)?;
            updated.push((asset.clone(), pool));
        }
        if batch.is_empty() {
            return Ok(());
        }

        let checkpoint = self.checkpoint(epoch, credited.keys());
        for (asset, pool) in updated {
            self.state.pools.insert((epoch, asset.clone()), pool);
            self.state
                .asset_lists
                .entry(epoch)
                .or_default()
                .insert(asset);
        }

        if let Err(e) = self.gateway.execute(&batch) {
            self.restore(checkpoint);
            tracing::warn!(%depositor, epoch, error = %e, "deposit rolled back");
            return Err(e.into());
        }

        for transfer in &batch {
            tracing::info!(%depositor, epoch, asset = %transfer.asset(), amount = transfer.amount(), "deposited");
            self.events.emit(&RewardEvent::Deposited {
                depositor: depositor.clone(),
                epoch,
                asset: transfer.asset().clone(),
                amount: transfer.amount(),
            });
        }
        Ok(())
    }

    /// [`deposit`](Self::deposit) into the epoch containing `now`.
    pub fn deposit_current(
        &mut self,
        depositor: &AccountId,
        assets: &[AssetId],
        amounts: &[u128],
        now: Tick,
    ) -> Result<u64> {
        let epoch = self.schedule.epoch_of(now)?.index;
        self.deposit(depositor, assets, amounts, epoch)?;
        Ok(epoch)
    }

    /// Move every nonzero balance of `source` into `target`.
    ///
    /// Permissionless and idempotent: a second sweep finds nothing to move.
    /// No value leaves the vault, so the gateway is not involved.
    pub fn rollover(&mut self, target: u64, source: u64) -> Result<Vec<Rollover>> {
        if target == source {
            return Ok(Vec::new());
        }
        let assets: Vec<AssetId> = self
            .state
            .asset_lists
            .get(&source)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default();

        let mut moves = Vec::new();
        for asset in assets {
            let amount = self.state.pool(source, &asset);
            if amount == 0 {
                continue;
            }
            let merged = self
                .state
                .pool(target, &asset)
                .checked_add(amount)
                .ok_or(RewardError::Overflow)?;
            moves.push((asset, amount, merged));
        }

        let mut rolled = Vec::with_capacity(moves.len());
        for (asset, amount, merged) in moves {
            self.state.pools.insert((source, asset.clone()), 0);
            self.state.pools.insert((target, asset.clone()), merged);
            self.state
                .asset_lists
                .entry(target)
                .or_default()
                .insert(asset.clone());
            tracing::info!(source, target, %asset, amount, "rolled over");
            self.events.emit(&RewardEvent::RolledOver {
                source_epoch: source,
                target_epoch: target,
                asset: asset.clone(),
                amount,
            });
            rolled.push(Rollover { asset, amount });
        }
        Ok(rolled)
    }

    /// Add or remove `asset` from the deposit allowlist. Governor only.
    pub fn set_allowlist(&mut self, caller: &AccountId, asset: &AssetId, allowed: bool) -> Result<()> {
        if caller != &self.governor {
            return Err(RewardError::Unauthorized(caller.clone()));
        }
        if allowed {
            self.state.allowlist.insert(asset.clone());
        } else {
            self.state.allowlist.remove(asset);
        }
        tracing::info!(%asset, allowed, "allowlist updated");
        self.events.emit(&RewardEvent::AllowlistUpdated {
            asset: asset.clone(),
            allowed,
        });
        Ok(())
    }

    pub fn pool(&self, epoch: u64, asset: &AssetId) -> u128 {
        self.state.pool(epoch, asset)
    }

    pub fn snapshot(&self, epoch: u64, asset: &AssetId) -> Option<u128> {
        self.state
            .snapshots
            .get(&epoch)
            .and_then(|s| s.get(asset))
            .copied()
    }

    pub fn is_allowed(&self, asset: &AssetId) -> bool {
        self.state.allowlist.contains(asset)
    }

    pub fn epoch_assets(&self, epoch: u64) -> Vec<AssetId> {
        self.state
            .asset_lists
            .get(&epoch)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn governor(&self) -> &AccountId {
        &self.governor
    }

    pub fn schedule(&self) -> &EpochSchedule {
        &self.schedule
    }

    pub fn state(&self) -> &VaultState {
        &self.state
    }

    pub fn export_state(&self) -> VaultState {
        self.state.clone()
    }

    pub fn import_state(&mut self, state: VaultState) {
        self.state = state;
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn checkpoint<'a>(&self, epoch: u64, assets: impl Iterator<Item = &'a AssetId>) -> Checkpoint {
        Checkpoint {
            epoch,
            pools: assets
                .map(|a| (a.clone(), self.state.pools.get(&(epoch, a.clone())).copied()))
                .collect(),
            asset_list: self.state.asset_lists.get(&epoch).cloned(),
            snapshot: self.state.snapshots.get(&epoch).cloned(),
        }
    }

    fn restore(&mut self, cp: Checkpoint) {
        for (asset, pool) in cp.pools {
            match pool {
                Some(p) => self.state.pools.insert((cp.epoch, asset), p),
                None => self.state.pools.remove(&(cp.epoch, asset)),
            };
        }
        match cp.asset_list {
            Some(list) => self.state.asset_lists.insert(cp.epoch, list),
            None => self.state.asset_lists.remove(&cp.epoch),
        };
        match cp.snapshot {
            Some(frozen) => self.state.snapshots.insert(cp.epoch, frozen),
            None => self.state.snapshots.remove(&cp.epoch),
        };
    }
}

impl RewardSink for RewardVault {
    /// Pay `percentage / SCALE` of `epoch`'s snapshot to `owner`, clamped
    /// to each pool's remaining balance.
    ///
    /// The first call for an epoch freezes its snapshot. Assets owed
    /// nothing are left out of the result. A failed payout batch leaves
    /// pools untouched and discards a snapshot taken by this call.
    fn distribute(&mut self, percentage: u128, owner: &AccountId, epoch: u64) -> Result<Vec<Payout>> {
        if percentage == 0 || percentage > SCALE {
            return Err(RewardError::InvalidPercentage(percentage));
        }
        let assets = self.epoch_assets(epoch);
        if assets.is_empty() {
            return Err(RewardError::NothingToDistribute(epoch));
        }

        let fresh_snapshot = !self.state.snapshots.contains_key(&epoch);
        let snapshot: BTreeMap<AssetId, u128> = match self.state.snapshots.get(&epoch) {
            Some(frozen) => frozen.clone(),
            None => assets
                .iter()
                .map(|a| (a.clone(), self.state.pool(epoch, a)))
                .collect(),
        };

        let mut payouts = Vec::with_capacity(assets.len());
        let mut remaining = Vec::with_capacity(assets.len());
        for asset in &assets {
            let base = snapshot.get(asset).copied().unwrap_or(0);
            let pool = self.state.pool(epoch, asset);
            let owed = mul_div(base, percentage, SCALE)
                .ok_or(RewardError::Overflow)?
                .min(pool);
            if owed == 0 {
                continue;
            }
            payouts.push(Payout {
                asset: asset.clone(),
                amount: owed,
            });
            remaining.push((asset.clone(), pool - owed));
        }
        let batch: Vec<Transfer> = payouts
            .iter()
            .map(|p| Transfer::Out {
                to: owner.clone(),
                asset: p.asset.clone(),
                amount: p.amount,
            })
            .collect();

        let checkpoint = self.checkpoint(epoch, remaining.iter().map(|(a, _)| a));
        if fresh_snapshot {
            tracing::debug!(epoch, assets = snapshot.len(), "snapshot frozen");
            self.state.snapshots.insert(epoch, snapshot);
        }
        for (asset, left) in remaining {
            self.state.pools.insert((epoch, asset), left);
        }

        if !batch.is_empty() {
            if let Err(e) = self.gateway.execute(&batch) {
                self.restore(checkpoint);
                tracing::warn!(%owner, epoch, error = %e, "distribution rolled back");
                return Err(e.into());
            }
        }

        for payout in &payouts {
            tracing::info!(%owner, epoch, asset = %payout.asset, amount = payout.amount, "distributed");
            self.events.emit(&RewardEvent::Distributed {
                owner: owner.clone(),
                epoch,
                asset: payout.asset.clone(),
                amount: payout.amount,
            });
        }
        Ok(payouts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yieldshare_nullables::{NullEventLog, NullGateway};

    fn gov() -> AccountId {
        AccountId::new("gov")
    }

    fn x() -> AssetId {
        AssetId::new("X")
    }

    fn y() -> AssetId {
        AssetId::new("Y")
    }

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn setup() -> (RewardVault, Arc<NullGateway>, NullEventLog) {
        let gateway = Arc::new(NullGateway::new());
        let log = NullEventLog::new();
        let mut bus = EventBus::new();
        bus.subscribe(log.listener());
        let mut vault = RewardVault::new(
            EpochSchedule::new(Tick::ZERO, 100).unwrap(),
            gov(),
            gateway.clone(),
            Arc::new(bus),
        );
        vault.set_allowlist(&gov(), &x(), true).unwrap();
        vault.set_allowlist(&gov(), &y(), true).unwrap();
        log.clear();
        (vault, gateway, log)
    }

    #[test]
    fn deposit_registers_assets_once() {
        let (mut vault, gateway, log) = setup();
        vault.deposit(&gov(), &[x()], &[600], 1).unwrap();
        vault.deposit(&gov(), &[x(), y()], &[400, 50], 1).unwrap();

        assert_eq!(vault.pool(1, &x()), 1_000);
        assert_eq!(vault.pool(1, &y()), 50);
        assert_eq!(vault.epoch_assets(1), vec![x(), y()]);
        assert_eq!(gateway.custody_of(&x()), 1_000);
        assert_eq!(gateway.batch_count(), 2);
        assert_eq!(log.count("deposited"), 3);
    }

    #[test]
    fn deposit_arity_checked() {
        let (mut vault, gateway, _) = setup();
        assert!(matches!(
            vault.deposit(&gov(), &[x(), y()], &[1], 1),
            Err(RewardError::ArityMismatch { assets: 2, amounts: 1 })
        ));
        assert!(matches!(
            vault.deposit(&gov(), &[], &[], 1),
            Err(RewardError::ArityMismatch { assets: 0, amounts: 0 })
        ));
        assert_eq!(gateway.batch_count(), 0);
    }

    #[test]
    fn deposit_of_unlisted_asset_rejected_whole() {
        let (mut vault, _, _) = setup();
        let z = AssetId::new("Z");
        let err = vault.deposit(&gov(), &[x(), z.clone()], &[10, 10], 1).unwrap_err();
        assert!(matches!(err, RewardError::AssetNotAllowed(a) if a == z));
        assert_eq!(vault.pool(1, &x()), 0);
    }

    #[test]
    fn zero_deposit_is_noop() {
        let (mut vault, gateway, log) = setup();
        vault.deposit(&gov(), &[x()], &[0], 1).unwrap();
        assert!(vault.epoch_assets(1).is_empty());
        assert_eq!(gateway.batch_count(), 0);
        assert!(log.events().is_empty());
    }

    #[test]
    fn failed_deposit_batch_changes_nothing() {
        let (mut vault, gateway, log) = setup();
        gateway.decline_asset(&y());
        let err = vault.deposit(&gov(), &[x(), y()], &[10, 10], 1).unwrap_err();
        assert!(matches!(err, RewardError::Transfer(_)));
        assert_eq!(vault.pool(1, &x()), 0);
        assert_eq!(gateway.custody_of(&x()), 0);
        assert!(log.events().is_empty());
    }

    #[test]
    fn failed_top_up_restores_prior_pool_and_asset_list() {
        let (mut vault, gateway, log) = setup();
        vault.deposit(&gov(), &[x()], &[300], 1).unwrap();
        let before = vault.export_state();
        log.clear();

        gateway.decline_asset(&y());
        assert!(vault.deposit(&gov(), &[x(), y()], &[50, 7], 1).is_err());
        assert_eq!(vault.export_state(), before);
        assert_eq!(vault.epoch_assets(1), vec![x()]);
        assert!(!vault.state().pools.contains_key(&(1, y())));
        assert!(log.events().is_empty());

        gateway.accept_asset(&y());
        vault.deposit(&gov(), &[x(), y()], &[50, 7], 1).unwrap();
        assert_eq!(vault.pool(1, &x()), 350);
        assert_eq!(gateway.custody_of(&x()), 350);
    }

    #[test]
    fn deposit_current_uses_epoch_of_counter() {
        let (mut vault, _, _) = setup();
        let epoch = vault.deposit_current(&gov(), &[x()], &[5], Tick::new(250)).unwrap();
        assert_eq!(epoch, 3);
        assert_eq!(vault.pool(3, &x()), 5);
    }

    #[test]
    fn distribute_pays_share_of_snapshot() {
        let (mut vault, gateway, _) = setup();
        vault.deposit(&gov(), &[x()], &[1_000], 1).unwrap();

        let payouts = vault.distribute(SCALE / 2, &alice(), 1).unwrap();
        assert_eq!(payouts, vec![Payout { asset: x(), amount: 500 }]);
        assert_eq!(vault.pool(1, &x()), 500);
        assert_eq!(vault.snapshot(1, &x()), Some(1_000));
        assert_eq!(gateway.balance_of(&alice(), &x()), 500);
    }

    #[test]
    fn snapshot_ignores_later_deposits() {
        let (mut vault, _, _) = setup();
        vault.deposit(&gov(), &[x()], &[1_000], 1).unwrap();
        vault.distribute(SCALE / 10, &alice(), 1).unwrap();
        vault.deposit(&gov(), &[x()], &[9_000], 1).unwrap();

        let payouts = vault.distribute(SCALE / 10, &AccountId::new("bob"), 1).unwrap();
        assert_eq!(payouts[0].amount, 100);
        assert_eq!(vault.snapshot(1, &x()), Some(1_000));
        assert_eq!(vault.pool(1, &x()), 1_000 - 200 + 9_000);
    }

    #[test]
    fn payout_clamped_to_pool() {
        let (mut vault, _, _) = setup();
        vault.deposit(&gov(), &[x()], &[1_000], 1).unwrap();
        vault.distribute(SCALE * 3 / 4, &alice(), 1).unwrap();

        let payouts = vault.distribute(SCALE / 2, &AccountId::new("bob"), 1).unwrap();
        assert_eq!(payouts[0].amount, 250);
        assert_eq!(vault.pool(1, &x()), 0);
    }

    #[test]
    fn distribute_rejects_bad_percentage() {
        let (mut vault, _, _) = setup();
        vault.deposit(&gov(), &[x()], &[1_000], 1).unwrap();
        assert!(matches!(
            vault.distribute(0, &alice(), 1),
            Err(RewardError::InvalidPercentage(0))
        ));
        assert!(matches!(
            vault.distribute(SCALE + 1, &alice(), 1),
            Err(RewardError::InvalidPercentage(_))
        ));
        assert!(vault.snapshot(1, &x()).is_none());
    }

    #[test]
    fn distribute_on_empty_epoch() {
        let (mut vault, _, _) = setup();
        assert!(matches!(
            vault.distribute(SCALE, &alice(), 7),
            Err(RewardError::NothingToDistribute(7))
        ));
    }

    #[test]
    fn failed_payout_discards_fresh_snapshot() {
        let (mut vault, gateway, log) = setup();
        vault.deposit(&gov(), &[x()], &[1_000], 1).unwrap();
        log.clear();

        gateway.fail_next();
        assert!(vault.distribute(SCALE / 2, &alice(), 1).is_err());
        assert_eq!(vault.pool(1, &x()), 1_000);
        assert!(vault.snapshot(1, &x()).is_none());
        assert!(log.events().is_empty());

        vault.distribute(SCALE / 2, &alice(), 1).unwrap();
        assert_eq!(vault.pool(1, &x()), 500);
    }

    #[test]
    fn failed_payout_keeps_frozen_snapshot_and_pools() {
        let (mut vault, gateway, log) = setup();
        vault.deposit(&gov(), &[x(), y()], &[1_000, 80], 1).unwrap();
        vault.distribute(SCALE / 4, &alice(), 1).unwrap();
        let before = vault.export_state();
        log.clear();

        gateway.decline_asset(&y());
        let bob = AccountId::new("bob");
        assert!(matches!(
            vault.distribute(SCALE / 4, &bob, 1),
            Err(RewardError::Transfer(_))
        ));
        assert_eq!(vault.export_state(), before);
        assert_eq!(gateway.balance_of(&bob, &x()), 0);
        assert!(log.events().is_empty());
    }

    #[test]
    fn zero_payouts_are_skipped() {
        let (mut vault, gateway, log) = setup();
        vault.deposit(&gov(), &[x(), y()], &[1_000, 3], 1).unwrap();
        log.clear();

        // 3 * 10% rounds down to nothing for Y
        let payouts = vault.distribute(SCALE / 10, &alice(), 1).unwrap();
        assert_eq!(payouts, vec![Payout { asset: x(), amount: 100 }]);
        assert_eq!(log.names(), vec!["distributed"]);
        assert_eq!(vault.pool(1, &y()), 3);
        assert_eq!(vault.snapshot(1, &y()), Some(3));
        assert!(gateway
            .executed()
            .iter()
            .all(|t| t.asset() != &y() || matches!(t, Transfer::In { .. })));

        // a swept pool pays nothing but the claim still succeeds
        vault.rollover(2, 1).unwrap();
        log.clear();
        let batches = gateway.batch_count();
        let payouts = vault.distribute(SCALE / 10, &AccountId::new("bob"), 1).unwrap();
        assert!(payouts.is_empty());
        assert!(log.events().is_empty());
        assert_eq!(gateway.batch_count(), batches);
    }

    #[test]
    fn rollover_moves_and_is_idempotent() {
        let (mut vault, _, log) = setup();
        vault.deposit(&gov(), &[x(), y()], &[300, 20], 1).unwrap();
        log.clear();

        let moved = vault.rollover(2, 1).unwrap();
        assert_eq!(moved.len(), 2);
        assert_eq!(vault.pool(1, &x()), 0);
        assert_eq!(vault.pool(2, &x()), 300);
        assert_eq!(vault.epoch_assets(2), vec![x(), y()]);
        assert_eq!(log.count("rolled_over"), 2);

        assert!(vault.rollover(2, 1).unwrap().is_empty());
        assert_eq!(vault.pool(2, &x()), 300);
        assert_eq!(log.count("rolled_over"), 2);
    }

    #[test]
    fn rollover_onto_itself_is_noop() {
        let (mut vault, _, _) = setup();
        vault.deposit(&gov(), &[x()], &[300], 1).unwrap();
        assert!(vault.rollover(1, 1).unwrap().is_empty());
        assert_eq!(vault.pool(1, &x()), 300);
    }

    #[test]
    fn allowlist_is_governor_only() {
        let (mut vault, _, log) = setup();
        let z = AssetId::new("Z");
        assert!(matches!(
            vault.set_allowlist(&alice(), &z, true),
            Err(RewardError::Unauthorized(_))
        ));
        assert!(!vault.is_allowed(&z));

        vault.set_allowlist(&gov(), &x(), false).unwrap();
        assert!(!vault.is_allowed(&x()));
        assert_eq!(log.names(), vec!["allowlist_updated"]);
    }
}
