// tests/common/mod.rs
//! Fixtures shared by the HTTP integration tests.

use std::sync::Arc;
use std::time::Duration;

use quakeview_lib::bus::EventBus;
use quakeview_lib::core::SourceSchema;
use quakeview_lib::runtime::{SelectionCoordinator, SyncEngine};
use quakeview_lib::source::HttpEventSource;
use serde_json::{json, Value};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Records in the observatory layout (`lng`, dotted dates).
pub fn observatory_payload() -> Value {
    json!([
        {
            "date": "2023.02.06", "time": "04:17:32", "lat": 37.288, "lng": 37.043,
            "depth": 8.6, "mag": 7.7, "location": "SOFALACI-SEHITKAMIL (GAZIANTEP)",
            "is_anomaly": true
        },
        {
            "date": "2023.02.06", "time": "13:24:47", "lat": 38.089, "lng": 37.239,
            "depth": 7.0, "mag": "7.6", "location": "EKINOZU (KAHRAMANMARAS)"
        },
        {
            "date": "2023.02.06", "time": "13:30:10", "lat": 38.1, "lng": 37.2,
            "depth": 5.0, "mag": "-.-", "location": "GOKSUN (KAHRAMANMARAS)"
        }
    ])
}

/// Records in the feed layout (`lon`).
pub fn feed_payload() -> Value {
    json!([
        {
            "date": "2024.11.02", "time": "10:05:00", "lat": 39.9, "lon": 32.8,
            "depth": 10.0, "mag": 3.9, "location": "ANKARA", "is_prediction": true
        },
        {
            "date": "2024.11.02", "time": "11:45:12", "lat": 40.8, "lon": 29.3,
            "depth": 12.1, "mag": 4.8, "location": "MARMARA DENIZI", "is_prediction": true
        }
    ])
}

pub fn http_source(base_url: &str) -> Arc<HttpEventSource> {
    Arc::new(HttpEventSource::new(base_url, TIMEOUT).expect("valid base url"))
}

pub fn engine_for(source: Arc<HttpEventSource>) -> (Arc<SyncEngine>, Arc<EventBus>) {
    let bus = Arc::new(EventBus::new());
    let selection = Arc::new(SelectionCoordinator::new(bus.clone()));
    let engine = SyncEngine::new(source, SourceSchema::Auto, bus.clone(), selection);
    (Arc::new(engine), bus)
}
