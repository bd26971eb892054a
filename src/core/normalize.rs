use thiserror::Error;

use crate::core::record::{EarthquakeRecord, NormalizedRecord};

/// Why a record was excluded from the collection. Never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidRecord {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("non-finite {0}")]
    NonFinite(&'static str),
    #[error("latitude out of range: {0}")]
    LatitudeOutOfRange(f64),
    #[error("longitude out of range: {0}")]
    LongitudeOutOfRange(f64),
    #[error("negative magnitude: {0}")]
    NegativeMagnitude(f64),
}

pub fn normalize(raw: EarthquakeRecord) -> Result<NormalizedRecord, InvalidRecord> {
    for (field, value) in [
        ("magnitude", raw.magnitude),
        ("depth_km", raw.depth_km),
        ("latitude", raw.latitude),
        ("longitude", raw.longitude),
    ] {
        if !value.is_finite() {
            return Err(InvalidRecord::NonFinite(field));
        }
    }

    if !(-90.0..=90.0).contains(&raw.latitude) {
        return Err(InvalidRecord::LatitudeOutOfRange(raw.latitude));
    }
    if !(-180.0..=180.0).contains(&raw.longitude) {
        return Err(InvalidRecord::LongitudeOutOfRange(raw.longitude));
    }
    if raw.magnitude < 0.0 {
        return Err(InvalidRecord::NegativeMagnitude(raw.magnitude));
    }

    Ok(NormalizedRecord::from_valid(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(latitude: f64, longitude: f64, magnitude: f64) -> EarthquakeRecord {
        EarthquakeRecord {
            magnitude,
            depth_km: 10.0,
            latitude,
            longitude,
            location: "AKDENIZ".to_string(),
            date: "2024.02.11".to_string(),
            time: "03:15:00".to_string(),
            is_anomaly: false,
            is_prediction: false,
        }
    }

    #[test]
    fn accepts_boundary_coordinates() {
        assert!(normalize(record(90.0, 180.0, 0.0)).is_ok());
        assert!(normalize(record(-90.0, -180.0, 9.5)).is_ok());
    }

    #[test]
    fn rejects_latitude_above_ninety() {
        assert_eq!(
            normalize(record(95.0, 30.0, 3.0)),
            Err(InvalidRecord::LatitudeOutOfRange(95.0))
        );
    }

    #[test]
    fn rejects_longitude_out_of_range() {
        assert_eq!(
            normalize(record(39.0, -181.5, 3.0)),
            Err(InvalidRecord::LongitudeOutOfRange(-181.5))
        );
    }

    #[test]
    fn rejects_non_finite_fields() {
        assert_eq!(
            normalize(record(39.0, 35.0, f64::NAN)),
            Err(InvalidRecord::NonFinite("magnitude"))
        );
        let mut raw = record(39.0, 35.0, 2.0);
        raw.depth_km = f64::INFINITY;
        assert_eq!(normalize(raw), Err(InvalidRecord::NonFinite("depth_km")));
        assert_eq!(
            normalize(record(f64::NEG_INFINITY, 35.0, 2.0)),
            Err(InvalidRecord::NonFinite("latitude"))
        );
    }

    #[test]
    fn rejects_negative_magnitude() {
        assert_eq!(
            normalize(record(39.0, 35.0, -0.5)),
            Err(InvalidRecord::NegativeMagnitude(-0.5))
        );
    }

    #[test]
    fn keeps_anomaly_flag_as_delivered() {
        let mut raw = record(39.0, 35.0, 1.2);
        raw.is_anomaly = true;
        let normalized = normalize(raw).unwrap();
        assert!(normalized.is_anomaly());
    }
}
