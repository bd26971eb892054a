use serde::Serialize;

use crate::core::record::{NaturalKey, NormalizedRecord};

/// One complete, immutable generation of the authoritative record set.
///
/// A new `Collection` is built for every successful refresh and swapped in
/// whole; nothing edits one in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Collection {
    version: u64,
    refreshed_at: Option<String>,
    fingerprint: Option<String>,
    records: Vec<NormalizedRecord>,
}

impl Collection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(
        version: u64,
        refreshed_at: String,
        fingerprint: String,
        records: Vec<NormalizedRecord>,
    ) -> Self {
        Self {
            version,
            refreshed_at: Some(refreshed_at),
            fingerprint: Some(fingerprint),
            records,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn refreshed_at(&self) -> Option<&str> {
        self.refreshed_at.as_deref()
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, key: &NaturalKey) -> Option<&NormalizedRecord> {
        self.records.iter().find(|record| record.matches(key))
    }
}
