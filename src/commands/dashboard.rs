use serde::Serialize;

use crate::core::NormalizedRecord;
use crate::runtime::{RefreshOutcome, RefreshTrigger};
use crate::view::{self, DashboardView, ListEntry, MapMarker, MapViewport};
use crate::{AppError, AppState};

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub version: u64,
    pub refreshed_at: Option<String>,
    pub total: usize,
    pub view: DashboardView,
    pub selected: Option<NormalizedRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardLists {
    pub version: u64,
    pub recent: Vec<ListEntry>,
    pub anomalies: Vec<ListEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub version: u64,
    pub viewport: MapViewport,
    pub markers: Vec<MapMarker>,
}

pub fn get_dashboard_view(state: &AppState) -> DashboardSnapshot {
    let collection = state.engine.snapshot();
    DashboardSnapshot {
        version: collection.version(),
        refreshed_at: collection.refreshed_at().map(str::to_string),
        total: collection.len(),
        view: view::project_with_limit(collection.records(), state.config.recent_limit),
        selected: state.selection.current(),
    }
}

/// The two lists, already formatted for display.
pub fn get_dashboard_lists(state: &AppState) -> DashboardLists {
    let collection = state.engine.snapshot();
    let projected = view::project_with_limit(collection.records(), state.config.recent_limit);
    DashboardLists {
        version: collection.version(),
        recent: view::list_entries(&projected.recent),
        anomalies: view::list_entries(&projected.anomalies),
    }
}

pub fn get_map_markers(state: &AppState) -> MapView {
    let collection = state.engine.snapshot();
    let selected = state.selection.current().map(|record| record.natural_key());
    MapView {
        version: collection.version(),
        viewport: MapViewport::default(),
        markers: view::markers(collection.records(), selected.as_ref()),
    }
}

/// Refresh right away, outside the timer schedule.
///
/// The service is asked to scrape first so the fetch can see data newer
/// than its last scheduled scrape. If that request fails the fetch still
/// runs against whatever the service already has.
pub async fn refresh_now(state: &AppState) -> Result<RefreshOutcome, AppError> {
    match state.source.request_refresh().await {
        Ok(ack) => tracing::info!("server-side refresh: {}", ack.message),
        Err(e) => tracing::warn!("server-side refresh failed, fetching current data: {e}"),
    }
    Ok(state.engine.refresh(RefreshTrigger::Manual).await?)
}
