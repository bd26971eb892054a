use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

const BUS_CAPACITY: usize = 1024;

/// One dashboard notification. `category` and `event_type` are always one
/// of the constants in [`super::event_types`].
#[derive(Debug, Clone, Serialize)]
pub struct BusEvent {
    pub id: Uuid,
    pub seq: u64,
    pub category: &'static str,
    pub event_type: &'static str,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// Fan-out of change notifications to any number of subscribers.
///
/// Slow subscribers lag and lose the oldest events rather than blocking
/// the sync engine.
pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
    seq: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            seq: AtomicU64::new(0),
        }
    }

    /// Publish an event and return its sequence number. Having no
    /// subscribers is normal in headless runs.
    pub fn emit(&self, category: &'static str, event_type: &'static str, payload: Value) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let event = BusEvent {
            id: Uuid::new_v4(),
            seq,
            category,
            event_type,
            payload,
            created_at: Utc::now(),
        };
        if self.tx.send(event).is_err() {
            tracing::trace!("{event_type} #{seq} had no subscribers");
        }
        seq
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
