//! The reward-sink reference held by the ledger.

use std::sync::{Arc, Mutex};

use yieldshare_types::{AccountId, RewardError, RewardSink, Result};

/// A reward sink shared between the ledger and whoever else operates it.
pub type SharedSink = Arc<Mutex<dyn RewardSink + Send>>;

/// Single mutable reference to the current reward sink.
///
/// Only the governing identity may rotate it; every rotation replaces the
/// reference exactly once.
pub struct RewardSinkCell {
    governor: AccountId,
    sink: Option<SharedSink>,
}

impl RewardSinkCell {
    pub fn new(governor: AccountId) -> Self {
        Self {
            governor,
            sink: None,
        }
    }

    pub fn governor(&self) -> &AccountId {
        &self.governor
    }

    pub fn is_configured(&self) -> bool {
        self.sink.is_some()
    }

    pub fn current(&self) -> Option<SharedSink> {
        self.sink.clone()
    }

    /// # Errors
    ///
    /// - [`RewardError::Unauthorized`] if `caller` is not the governor
    pub fn rotate(&mut self, caller: &AccountId, sink: SharedSink) -> Result<()> {
        if caller != &self.governor {
            return Err(RewardError::Unauthorized(caller.clone()));
        }
        self.sink = Some(sink);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yieldshare_types::Payout;

    struct Silent;

    impl RewardSink for Silent {
        fn distribute(&mut self, _: u128, _: &AccountId, _: u64) -> Result<Vec<Payout>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn governor_can_rotate() {
        let gov = AccountId::new("gov");
        let mut cell = RewardSinkCell::new(gov.clone());
        assert!(!cell.is_configured());
        cell.rotate(&gov, Arc::new(Mutex::new(Silent))).expect("rotate");
        assert!(cell.is_configured());
    }

    #[test]
    fn stranger_cannot_rotate() {
        let mut cell = RewardSinkCell::new(AccountId::new("gov"));
        let err = cell
            .rotate(&AccountId::new("mallory"), Arc::new(Mutex::new(Silent)))
            .unwrap_err();
        assert!(matches!(err, RewardError::Unauthorized(who) if who.as_str() == "mallory"));
        assert!(cell.current().is_none());
    }
}
