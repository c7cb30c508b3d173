//! Nullable value-transfer collaborator backed by an in-memory custody book.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use yieldshare_types::{AccountId, AssetId, Transfer, TransferError, TransferGateway};

#[derive(Clone, Default)]
struct Book {
    holders: HashMap<(AccountId, AssetId), u128>,
    custody: HashMap<AssetId, u128>,
    executed: Vec<Transfer>,
    batches: usize,
}

impl Book {
    fn apply(&mut self, transfer: &Transfer, strict: bool) -> Result<(), TransferError> {
        match transfer {
            Transfer::In {
                from,
                asset,
                amount,
            } => {
                let held = self
                    .holders
                    .entry((from.clone(), asset.clone()))
                    .or_default();
                if strict && *held < *amount {
                    return Err(TransferError::Declined(format!(
                        "{from} holds {held} {asset}, needs {amount}"
                    )));
                }
                *held = held.saturating_sub(*amount);
                *self.custody.entry(asset.clone()).or_default() += *amount;
            }
            Transfer::Out { to, asset, amount } => {
                let custody = self.custody.entry(asset.clone()).or_default();
                if *custody < *amount {
                    return Err(TransferError::Declined(format!(
                        "custody holds {custody} {asset}, cannot release {amount}"
                    )));
                }
                *custody -= *amount;
                *self
                    .holders
                    .entry((to.clone(), asset.clone()))
                    .or_default() += *amount;
            }
        }
        self.executed.push(transfer.clone());
        Ok(())
    }
}

/// A transfer gateway that moves value between in-memory balances.
///
/// In permissive mode (the default) pulls from unfunded holders succeed; in
/// strict mode a pull needs a prior [`NullGateway::fund`]. Pushes always need
/// custody to cover them. Failures can be armed for the next batch or for a
/// specific asset.
pub struct NullGateway {
    book: Mutex<Book>,
    strict: bool,
    fail_next: AtomicBool,
    declined_assets: Mutex<HashSet<AssetId>>,
}

impl NullGateway {
    pub fn new() -> Self {
        Self {
            book: Mutex::new(Book::default()),
            strict: false,
            fail_next: AtomicBool::new(false),
            declined_assets: Mutex::new(HashSet::new()),
        }
    }

    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::new()
        }
    }

    /// Credit `holder` with `amount` of `asset` outside of any batch.
    pub fn fund(&self, holder: &AccountId, asset: &AssetId, amount: u128) {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        *book
            .holders
            .entry((holder.clone(), asset.clone()))
            .or_default() += amount;
    }

    /// Overwrite the custody balance of `asset`, as when resuming from a
    /// saved engine state.
    pub fn set_custody(&self, asset: &AssetId, amount: u128) {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.custody.insert(asset.clone(), amount);
    }

    pub fn balance_of(&self, holder: &AccountId, asset: &AssetId) -> u128 {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.holders
            .get(&(holder.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn custody_of(&self, asset: &AssetId) -> u128 {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.custody.get(asset).copied().unwrap_or(0)
    }

    /// Every transfer applied so far, in order.
    pub fn executed(&self) -> Vec<Transfer> {
        self.book
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .executed
            .clone()
    }

    /// Number of batches that committed.
    pub fn batch_count(&self) -> usize {
        self.book
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .batches
    }

    /// Decline the next batch, whatever it contains.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Decline every batch touching `asset` until [`NullGateway::accept_asset`].
    pub fn decline_asset(&self, asset: &AssetId) {
        self.declined_assets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(asset.clone());
    }

    pub fn accept_asset(&self, asset: &AssetId) {
        self.declined_assets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(asset);
    }
}

impl Default for NullGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferGateway for NullGateway {
    fn execute(&self, batch: &[Transfer]) -> Result<(), TransferError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            tracing::debug!(transfers = batch.len(), "null gateway: armed failure");
            return Err(TransferError::Unavailable("armed failure".to_string()));
        }
        {
            let declined = self
                .declined_assets
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(t) = batch.iter().find(|t| declined.contains(t.asset())) {
                return Err(TransferError::Declined(format!("asset {} declined", t.asset())));
            }
        }

        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = book.clone();
        for transfer in batch {
            next.apply(transfer, self.strict)?;
        }
        next.batches += 1;
        *book = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn usdc() -> AssetId {
        AssetId::new("USDC")
    }

    #[test]
    fn restored_custody_covers_pushes() {
        let gw = NullGateway::new();
        assert!(gw.transfer_out(&alice(), &usdc(), 1).is_err());
        gw.set_custody(&usdc(), 70);
        gw.transfer_out(&alice(), &usdc(), 70).expect("push");
        assert_eq!(gw.custody_of(&usdc()), 0);
        assert_eq!(gw.batch_count(), 1);
    }

    #[test]
    fn pull_then_push_moves_custody() {
        let gw = NullGateway::new();
        gw.transfer_in(&alice(), &usdc(), 100).expect("pull");
        assert_eq!(gw.custody_of(&usdc()), 100);
        gw.transfer_out(&alice(), &usdc(), 40).expect("push");
        assert_eq!(gw.custody_of(&usdc()), 60);
        assert_eq!(gw.balance_of(&alice(), &usdc()), 40);
        assert_eq!(gw.batch_count(), 2);
    }

    #[test]
    fn strict_pull_needs_funding() {
        let gw = NullGateway::strict();
        assert!(gw.transfer_in(&alice(), &usdc(), 10).is_err());
        gw.fund(&alice(), &usdc(), 10);
        gw.transfer_in(&alice(), &usdc(), 10).expect("funded pull");
        assert_eq!(gw.balance_of(&alice(), &usdc()), 0);
    }

    #[test]
    fn push_beyond_custody_declined() {
        let gw = NullGateway::new();
        let err = gw.transfer_out(&alice(), &usdc(), 1).unwrap_err();
        assert!(matches!(err, TransferError::Declined(_)));
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let gw = NullGateway::new();
        gw.transfer_in(&alice(), &usdc(), 50).expect("seed custody");
        let batch = vec![
            Transfer::Out {
                to: alice(),
                asset: usdc(),
                amount: 30,
            },
            Transfer::Out {
                to: alice(),
                asset: usdc(),
                amount: 30,
            },
        ];
        assert!(gw.execute(&batch).is_err());
        assert_eq!(gw.custody_of(&usdc()), 50);
        assert_eq!(gw.executed().len(), 1);
    }

    #[test]
    fn armed_failure_fires_once() {
        let gw = NullGateway::new();
        gw.fail_next();
        assert!(gw.transfer_in(&alice(), &usdc(), 1).is_err());
        gw.transfer_in(&alice(), &usdc(), 1).expect("second attempt");
    }

    #[test]
    fn declined_asset_until_accepted() {
        let gw = NullGateway::new();
        gw.decline_asset(&usdc());
        assert!(gw.transfer_in(&alice(), &usdc(), 1).is_err());
        gw.accept_asset(&usdc());
        gw.transfer_in(&alice(), &usdc(), 1).expect("accepted");
    }
}
