//! Presentation attributes handed to the map renderer and the list.

use serde::Serialize;

use crate::core::{ColorTier, NaturalKey, NormalizedRecord};

const MARKER_RADIUS_PER_MAGNITUDE: f64 = 3.0;
const ANOMALY_FILL: &str = "black";
const STROKE_COLOR: &str = "#000000ff";
const FILL_OPACITY: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

/// Initial camera and panning limits for the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapViewport {
    pub center: LatLng,
    pub zoom: u8,
    pub min_zoom: u8,
    /// South-west and north-east corners.
    pub max_bounds: [LatLng; 2],
}

impl Default for MapViewport {
    fn default() -> Self {
        Self {
            center: LatLng {
                latitude: 39.0,
                longitude: 35.0,
            },
            zoom: 6,
            min_zoom: 5,
            max_bounds: [
                LatLng {
                    latitude: 34.0,
                    longitude: 25.0,
                },
                LatLng {
                    latitude: 43.0,
                    longitude: 46.0,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerPopup {
    pub title: String,
    pub magnitude: f64,
    pub depth_km: f64,
    pub anomaly: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub key: NaturalKey,
    pub position: LatLng,
    pub radius: f64,
    pub fill_color: &'static str,
    pub stroke_color: &'static str,
    pub weight: u8,
    pub fill_opacity: f64,
    pub selected: bool,
    pub popup: MarkerPopup,
}

impl MapMarker {
    pub fn from_record(record: &NormalizedRecord, selected: Option<&NaturalKey>) -> Self {
        let anomaly = record.is_anomaly();
        Self {
            key: record.natural_key(),
            position: LatLng {
                latitude: record.latitude(),
                longitude: record.longitude(),
            },
            radius: record.magnitude() * MARKER_RADIUS_PER_MAGNITUDE,
            fill_color: if anomaly {
                ANOMALY_FILL
            } else {
                record.marker_tier().color()
            },
            stroke_color: STROKE_COLOR,
            weight: if anomaly { 3 } else { 1 },
            fill_opacity: FILL_OPACITY,
            selected: selected.is_some_and(|key| record.matches(key)),
            popup: MarkerPopup {
                title: record.location().to_string(),
                magnitude: record.magnitude(),
                depth_km: record.depth_km(),
                anomaly,
            },
        }
    }
}

/// One marker per record, in collection order.
pub fn markers(records: &[NormalizedRecord], selected: Option<&NaturalKey>) -> Vec<MapMarker> {
    records
        .iter()
        .map(|record| MapMarker::from_record(record, selected))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListEntry {
    pub key: NaturalKey,
    pub magnitude_label: String,
    pub badge_color: &'static str,
    pub location: String,
    pub date: String,
    pub time: String,
    pub depth_km: f64,
    pub anomaly: bool,
}

impl From<&NormalizedRecord> for ListEntry {
    fn from(record: &NormalizedRecord) -> Self {
        Self {
            key: record.natural_key(),
            magnitude_label: format!("{:.1}", record.magnitude()),
            badge_color: record.badge_tier().color(),
            location: record.location().to_string(),
            date: record.date().to_string(),
            time: record.time().to_string(),
            depth_km: record.depth_km(),
            anomaly: record.is_anomaly(),
        }
    }
}

pub fn list_entries(records: &[NormalizedRecord]) -> Vec<ListEntry> {
    records.iter().map(ListEntry::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{normalize, EarthquakeRecord};

    fn record(magnitude: f64, is_anomaly: bool) -> NormalizedRecord {
        normalize(EarthquakeRecord {
            magnitude,
            depth_km: 11.3,
            latitude: 40.7,
            longitude: 29.9,
            location: "IZMIT KORFEZI".to_string(),
            date: "1999.08.17".to_string(),
            time: "03:01:39".to_string(),
            is_anomaly,
            is_prediction: false,
        })
        .unwrap()
    }

    #[test]
    fn regular_marker_uses_tier_color() {
        let marker = MapMarker::from_record(&record(5.2, false), None);
        assert_eq!(marker.fill_color, "#ff6600");
        assert_eq!(marker.weight, 1);
        assert!((marker.radius - 15.6).abs() < 1e-9);
        assert!(!marker.selected);
        assert!(!marker.popup.anomaly);
    }

    #[test]
    fn anomaly_marker_is_black_and_heavier() {
        let marker = MapMarker::from_record(&record(3.1, true), None);
        assert_eq!(marker.fill_color, "black");
        assert_eq!(marker.weight, 3);
        assert!(marker.popup.anomaly);
    }

    #[test]
    fn selected_marker_is_flagged() {
        let records = vec![record(7.6, false), record(4.0, false)];
        let key = records[0].natural_key();
        let all = markers(&records, Some(&key));
        assert!(all[0].selected);
        assert!(!all[1].selected);
    }

    #[test]
    fn list_entry_formats_magnitude_with_badge_color() {
        let entry = ListEntry::from(&record(4.26, false));
        assert_eq!(entry.magnitude_label, "4.3");
        assert_eq!(entry.badge_color, "#ff8c00");
        assert_eq!(entry.location, "IZMIT KORFEZI");
    }

    #[test]
    fn default_viewport_matches_the_region() {
        let viewport = MapViewport::default();
        assert_eq!(viewport.zoom, 6);
        assert_eq!(viewport.max_bounds[1].longitude, 46.0);
    }
}
