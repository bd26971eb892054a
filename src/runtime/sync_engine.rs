//! Owner of the authoritative collection.
//!
//! Every trigger (startup, timer, push, manual) ends up in
//! [`SyncEngine::refresh`]. A refresh builds a complete new [`Collection`]
//! and swaps it in through a `watch` channel, so readers only ever hold a
//! whole generation. Overlapping refreshes are allowed; the one that
//! completes last wins.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::sync::watch;

use crate::bus::event_types::{
    CATEGORY_SYNC, EVENT_SYNC_REFRESHED, EVENT_SYNC_REFRESH_FAILED, EVENT_SYNC_RESTORED,
};
use crate::bus::EventBus;
use crate::core::{
    adapt, normalize, Collection, EarthquakeRecord, NaturalKey, NormalizedRecord, SourceSchema,
};
use crate::db::{queries, Database, DbError};
use crate::runtime::selection::SelectionCoordinator;
use crate::source::{EventSource, SourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    Startup,
    Timer,
    Push,
    Manual,
}

impl RefreshTrigger {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Timer => "timer",
            Self::Push => "push",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshOutcome {
    pub trigger: RefreshTrigger,
    pub version: u64,
    pub count: usize,
    pub dropped: usize,
    pub duplicates: usize,
    /// False when the payload is identical to the one it replaced.
    pub changed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] SourceError),
}

/// Records that survived mapping, validation and de-duplication.
#[derive(Debug)]
pub(crate) struct Ingested {
    pub records: Vec<NormalizedRecord>,
    pub dropped: usize,
    pub duplicates: usize,
}

/// Map, validate and de-duplicate one payload. Invalid records are dropped;
/// repeated natural keys keep their first occurrence.
pub(crate) fn ingest(raw: &[Value], schema: SourceSchema) -> Ingested {
    let records = raw.iter().enumerate().filter_map(|(idx, value)| {
        match adapt(value, schema).and_then(normalize) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("dropping record #{idx}: {e}");
                None
            }
        }
    });
    dedupe(records, raw.len())
}

fn dedupe(records: impl Iterator<Item = NormalizedRecord>, total: usize) -> Ingested {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(total);
    let mut valid = 0;
    for record in records {
        valid += 1;
        if seen.insert(record.natural_key()) {
            kept.push(record);
        }
    }
    Ingested {
        duplicates: valid - kept.len(),
        dropped: total - valid,
        records: kept,
    }
}

fn fingerprint(raw: &[Value]) -> String {
    let bytes = serde_json::to_vec(raw).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

/// Decrements the in-flight counter however the refresh exits.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct SyncEngine {
    source: Arc<dyn EventSource>,
    schema: SourceSchema,
    bus: Arc<EventBus>,
    selection: Arc<SelectionCoordinator>,
    db: Option<Arc<Database>>,
    tx: watch::Sender<Arc<Collection>>,
    next_version: AtomicU64,
    in_flight: AtomicUsize,
    /// Held from version assignment through selection revalidation and
    /// persistence, so installs land in version order.
    install: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn EventSource>,
        schema: SourceSchema,
        bus: Arc<EventBus>,
        selection: Arc<SelectionCoordinator>,
    ) -> Self {
        let (tx, _) = watch::channel(Arc::new(Collection::empty()));
        Self {
            source,
            schema,
            bus,
            selection,
            db: None,
            tx,
            next_version: AtomicU64::new(1),
            in_flight: AtomicUsize::new(0),
            install: Mutex::new(()),
        }
    }

    /// Persist every successful refresh as the last-known-good snapshot.
    pub fn with_database(mut self, db: Arc<Database>) -> Self {
        self.db = Some(db);
        self
    }

    /// The current generation. Cheap; callers keep it as long as they like.
    pub fn snapshot(&self) -> Arc<Collection> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Collection>> {
        self.tx.subscribe()
    }

    pub fn selection(&self) -> &Arc<SelectionCoordinator> {
        &self.selection
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Select the record with `key` in the collection installed right now.
    /// Never interleaves with an install, so the selection cannot point at
    /// a generation that has already been replaced.
    pub fn select_by_key(&self, key: &NaturalKey) -> Option<NormalizedRecord> {
        let _guard = self.lock_install();
        self.selection.select_by_key(&self.snapshot(), key)
    }

    /// Fetch the full record set and replace the collection with it.
    ///
    /// On failure the current collection stays in place.
    pub async fn refresh(&self, trigger: RefreshTrigger) -> Result<RefreshOutcome, SyncError> {
        let _in_flight = InFlight::enter(&self.in_flight);
        tracing::debug!("refresh ({trigger}) from {}", self.source.name());

        let raw = match self.source.fetch_records().await {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!("refresh ({trigger}) failed, keeping previous collection: {error}");
                self.bus.emit(
                    CATEGORY_SYNC,
                    EVENT_SYNC_REFRESH_FAILED,
                    json!({ "trigger": trigger, "error": error.to_string() }),
                );
                return Err(error.into());
            }
        };

        let fingerprint = fingerprint(&raw);
        let ingested = ingest(&raw, self.schema);
        if ingested.dropped > 0 {
            tracing::warn!(
                "dropped {} of {} records that failed validation",
                ingested.dropped,
                raw.len()
            );
        }

        let _guard = self.lock_install();
        let refreshed_at = Utc::now().to_rfc3339();
        let (collection, previous) = self.install(refreshed_at, fingerprint, ingested.records);
        let outcome = RefreshOutcome {
            trigger,
            version: collection.version(),
            count: collection.len(),
            dropped: ingested.dropped,
            duplicates: ingested.duplicates,
            changed: previous.fingerprint() != collection.fingerprint(),
        };

        if let Err(e) = self.persist(&collection) {
            tracing::warn!("failed to persist snapshot v{}: {e}", collection.version());
        }

        tracing::info!(
            "collection v{} installed ({trigger}): {} records, {} dropped, {} duplicates",
            outcome.version,
            outcome.count,
            outcome.dropped,
            outcome.duplicates
        );
        self.bus.emit(
            CATEGORY_SYNC,
            EVENT_SYNC_REFRESHED,
            serde_json::to_value(&outcome).unwrap_or(Value::Null),
        );
        Ok(outcome)
    }

    /// Install the last persisted snapshot, but only while nothing fresher
    /// has arrived. Returns the number of records restored.
    pub fn restore_from_db(&self) -> Result<Option<usize>, DbError> {
        let Some(db) = self.db.as_ref() else {
            return Ok(None);
        };
        let Some(row) = queries::latest_snapshot(db)? else {
            return Ok(None);
        };
        let _guard = self.lock_install();
        if self.snapshot().version() != 0 {
            return Ok(None);
        }

        let records: Vec<EarthquakeRecord> = serde_json::from_str(&row.records_json)
            .map_err(|e| DbError::Serialization(format!("snapshot {}: {e}", row.id)))?;
        let total = records.len();
        let ingested = dedupe(
            records.into_iter().filter_map(|record| normalize(record).ok()),
            total,
        );

        let (collection, _) = self.install(row.fetched_at, row.fingerprint, ingested.records);
        tracing::info!(
            "restored snapshot from {} ({} records)",
            collection.refreshed_at().unwrap_or("unknown"),
            collection.len()
        );
        self.bus.emit(
            CATEGORY_SYNC,
            EVENT_SYNC_RESTORED,
            json!({ "version": collection.version(), "count": collection.len() }),
        );
        Ok(Some(collection.len()))
    }

    fn lock_install(&self) -> MutexGuard<'_, ()> {
        self.install.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Callers hold the install lock.
    fn install(
        &self,
        refreshed_at: String,
        fingerprint: String,
        records: Vec<NormalizedRecord>,
    ) -> (Arc<Collection>, Arc<Collection>) {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        let collection = Arc::new(Collection::new(version, refreshed_at, fingerprint, records));
        let previous = self.tx.send_replace(collection.clone());
        self.selection.revalidate(&collection);
        (collection, previous)
    }

    fn persist(&self, collection: &Collection) -> Result<(), DbError> {
        let Some(db) = self.db.as_ref() else {
            return Ok(());
        };
        let records: Vec<&EarthquakeRecord> =
            collection.records().iter().map(NormalizedRecord::record).collect();
        let records_json = serde_json::to_string(&records)
            .map_err(|e| DbError::Serialization(e.to_string()))?;
        queries::replace_snapshot(
            db,
            collection.refreshed_at().unwrap_or_default(),
            collection.fingerprint().unwrap_or_default(),
            &records_json,
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(location: &str, time: &str, mag: f64) -> Value {
        json!({
            "date": "2024.03.01", "time": time, "lat": 39.0, "lng": 35.0,
            "depth": 10.0, "mag": mag, "location": location
        })
    }

    #[test]
    fn ingest_drops_invalid_and_duplicate_records() {
        let mut out_of_range = raw("NOWHERE", "00:00:01", 2.0);
        out_of_range["lat"] = json!(95.0);
        let payload = vec![
            raw("A", "00:00:01", 2.0),
            out_of_range,
            raw("A", "00:00:01", 2.0),
            json!("garbage"),
            raw("B", "00:00:02", 3.0),
        ];

        let ingested = ingest(&payload, SourceSchema::Auto);
        assert_eq!(ingested.records.len(), 2);
        assert_eq!(ingested.dropped, 2);
        assert_eq!(ingested.duplicates, 1);
        assert_eq!(ingested.records[0].location(), "A");
        assert_eq!(ingested.records[1].location(), "B");
    }

    #[test]
    fn fingerprint_tracks_payload_content() {
        let a = vec![raw("A", "00:00:01", 2.0)];
        let b = vec![raw("A", "00:00:01", 2.1)];
        assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 64);
    }

    #[test]
    fn triggers_serialize_as_snake_case() {
        assert_eq!(serde_json::to_value(RefreshTrigger::Push).unwrap(), "push");
        assert_eq!(RefreshTrigger::Startup.to_string(), "startup");
    }
}
