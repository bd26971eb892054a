//! The one event (if any) highlighted in both the list and the map.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;

use crate::bus::event_types::{CATEGORY_SELECTION, EVENT_SELECTION_CHANGED, EVENT_SELECTION_CLEARED};
use crate::bus::EventBus;
use crate::core::{Collection, NaturalKey, NormalizedRecord};

/// Result of checking the selection against a fresh collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revalidation {
    /// Nothing was selected.
    Empty,
    /// The selected record is still present and identical.
    Kept,
    /// The natural key is still present but other fields changed; the
    /// selection now points at the new record.
    Reresolved,
    /// The record disappeared and the selection was cleared.
    Cleared,
}

pub struct SelectionCoordinator {
    tx: watch::Sender<Option<NormalizedRecord>>,
    bus: Arc<EventBus>,
}

impl SelectionCoordinator {
    pub fn new(bus: Arc<EventBus>) -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx, bus }
    }

    pub fn select(&self, record: NormalizedRecord) {
        let key = record.natural_key();
        self.tx.send_replace(Some(record));
        self.bus.emit(
            CATEGORY_SELECTION,
            EVENT_SELECTION_CHANGED,
            json!({ "key": key, "reason": "user" }),
        );
    }

    /// Select the record in `collection` matching `key`, if there is one.
    pub fn select_by_key(&self, collection: &Collection, key: &NaturalKey) -> Option<NormalizedRecord> {
        let record = collection.find(key)?.clone();
        self.select(record.clone());
        Some(record)
    }

    /// Returns whether anything was selected before.
    pub fn clear(&self) -> bool {
        let previous = self.tx.send_replace(None);
        if previous.is_some() {
            self.bus.emit(
                CATEGORY_SELECTION,
                EVENT_SELECTION_CLEARED,
                json!({ "reason": "user" }),
            );
        }
        previous.is_some()
    }

    pub fn current(&self) -> Option<NormalizedRecord> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<NormalizedRecord>> {
        self.tx.subscribe()
    }

    /// Re-resolve the selection by natural key after a collection swap.
    ///
    /// The check and the replacement happen in one step on the channel, so
    /// a concurrent `clear` or `select` is never overwritten with a stale
    /// value.
    pub fn revalidate(&self, collection: &Collection) -> Revalidation {
        let mut outcome = Revalidation::Empty;
        let mut key = None;
        self.tx.send_if_modified(|selected| {
            let Some(current) = selected.as_ref() else {
                return false;
            };
            let current_key = current.natural_key();
            outcome = match collection.find(&current_key) {
                Some(found) if found == current => Revalidation::Kept,
                Some(found) => {
                    *selected = Some(found.clone());
                    Revalidation::Reresolved
                }
                None => {
                    *selected = None;
                    Revalidation::Cleared
                }
            };
            key = Some(current_key);
            outcome != Revalidation::Kept
        });

        let Some(key) = key else {
            return outcome;
        };
        match outcome {
            Revalidation::Reresolved => {
                self.bus.emit(
                    CATEGORY_SELECTION,
                    EVENT_SELECTION_CHANGED,
                    json!({ "key": key, "reason": "refreshed", "version": collection.version() }),
                );
            }
            Revalidation::Cleared => {
                tracing::debug!(
                    "selected event {} {} {} left the collection; clearing selection",
                    key.location,
                    key.date,
                    key.time
                );
                self.bus.emit(
                    CATEGORY_SELECTION,
                    EVENT_SELECTION_CLEARED,
                    json!({ "key": key, "reason": "missing_after_refresh", "version": collection.version() }),
                );
            }
            Revalidation::Empty | Revalidation::Kept => {}
        }
        outcome
    }
}
