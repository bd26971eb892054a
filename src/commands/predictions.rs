use serde::Serialize;

use crate::runtime::sync_engine::ingest;
use crate::view::{self, MapMarker, RiskCard};
use crate::{AppError, AppState};

#[derive(Debug, Clone, Serialize)]
pub struct PossibleRisksView {
    pub markers: Vec<MapMarker>,
    pub dropped: usize,
}

/// Risk cards in the order the prediction service returned them.
pub async fn get_predictions(state: &AppState) -> Result<Vec<RiskCard>, AppError> {
    let predictions = state.source.fetch_predictions().await?;
    Ok(view::risk_cards(&predictions))
}

/// Markers for the "possible risks" feed. These records never enter the
/// authoritative collection or the selection.
pub async fn get_possible_risks(state: &AppState) -> Result<PossibleRisksView, AppError> {
    let raw = state.source.fetch_possible().await?;
    let ingested = ingest(&raw, state.config.source_schema);
    Ok(PossibleRisksView {
        markers: view::markers(&ingested.records, None),
        dropped: ingested.dropped,
    })
}
