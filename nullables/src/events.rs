//! Nullable event sink that captures emitted records for assertions.

use std::sync::{Arc, Mutex, PoisonError};
use yieldshare_types::RewardEvent;

/// Collects every event delivered to its listeners.
#[derive(Clone, Default)]
pub struct NullEventLog {
    events: Arc<Mutex<Vec<RewardEvent>>>,
}

impl NullEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener suitable for [`yieldshare_types::EventBus::subscribe`].
    pub fn listener(&self) -> Box<dyn Fn(&RewardEvent) + Send + Sync> {
        let events = Arc::clone(&self.events);
        Box::new(move |event| {
            events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        })
    }

    pub fn events(&self) -> Vec<RewardEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Event names in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(RewardEvent::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
