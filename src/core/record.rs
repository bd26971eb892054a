use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::core::classify::{BadgeScale, BadgeTier, MagnitudeClassifier, MarkerScale, MarkerTier};

/// Canonical shape of an event as delivered by the event source, after the
/// per-source field mapping has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthquakeRecord {
    pub magnitude: f64,
    pub depth_km: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub location: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub is_anomaly: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_prediction: bool,
}

impl EarthquakeRecord {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            location: self.location.clone(),
            date: self.date.clone(),
            time: self.time.clone(),
            magnitude: self.magnitude,
        }
    }
}

/// A validated record with its derived presentation attributes.
///
/// Only [`crate::core::normalize::normalize`] builds these, and nothing can
/// mutate one afterwards, so the sort key and tiers always agree with the
/// source fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    #[serde(flatten)]
    record: EarthquakeRecord,
    sort_key: String,
    badge_tier: BadgeTier,
    marker_tier: MarkerTier,
}

impl NormalizedRecord {
    pub(crate) fn from_valid(record: EarthquakeRecord) -> Self {
        let sort_key = format!("{}{}", record.date, record.time);
        let badge_tier = BadgeScale.classify(record.magnitude);
        let marker_tier = MarkerScale.classify(record.magnitude);
        Self {
            record,
            sort_key,
            badge_tier,
            marker_tier,
        }
    }

    pub fn record(&self) -> &EarthquakeRecord {
        &self.record
    }

    pub fn into_record(self) -> EarthquakeRecord {
        self.record
    }

    pub fn magnitude(&self) -> f64 {
        self.record.magnitude
    }

    pub fn depth_km(&self) -> f64 {
        self.record.depth_km
    }

    pub fn latitude(&self) -> f64 {
        self.record.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.record.longitude
    }

    pub fn location(&self) -> &str {
        &self.record.location
    }

    pub fn date(&self) -> &str {
        &self.record.date
    }

    pub fn time(&self) -> &str {
        &self.record.time
    }

    pub fn is_anomaly(&self) -> bool {
        self.record.is_anomaly
    }

    /// `date` followed by `time`. Ordering on this key is only chronological
    /// when both fields are fixed width.
    pub fn sort_key(&self) -> &str {
        &self.sort_key
    }

    pub fn badge_tier(&self) -> BadgeTier {
        self.badge_tier
    }

    pub fn marker_tier(&self) -> MarkerTier {
        self.marker_tier
    }

    pub fn natural_key(&self) -> NaturalKey {
        self.record.natural_key()
    }

    pub fn matches(&self, key: &NaturalKey) -> bool {
        self.record.location == key.location
            && self.record.date == key.date
            && self.record.time == key.time
            && self.record.magnitude.to_bits() == key.magnitude.to_bits()
    }
}

/// Re-identifies a record across refreshes; the feed carries no stable id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaturalKey {
    pub location: String,
    pub date: String,
    pub time: String,
    pub magnitude: f64,
}

impl PartialEq for NaturalKey {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
            && self.date == other.date
            && self.time == other.time
            && self.magnitude.to_bits() == other.magnitude.to_bits()
    }
}

impl Eq for NaturalKey {}

impl Hash for NaturalKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location.hash(state);
        self.date.hash(state);
        self.time.hash(state);
        self.magnitude.to_bits().hash(state);
    }
}
