//! Typed in-process sync bus
//!
//! Views that need to refresh after a pull, a push or a local write subscribe
//! here. Cross-process fanout is the worker's job: it forwards bus events to
//! Redis pub/sub.

use loyalty_core::SyncEvent;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct SyncBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SyncBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event, returning how many subscribers received it
    pub fn publish(&self, event: SyncEvent) -> usize {
        let event_type = event.event_type();
        // No subscribers is fine
        let receivers = self.tx.send(event).unwrap_or(0);
        tracing::trace!(event_type, receivers, "Sync event published");
        receivers
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }
}
