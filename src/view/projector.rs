//! Read views over a collection generation.

use serde::Serialize;

use crate::core::NormalizedRecord;

/// Number of entries in the recent-events list.
pub const RECENT_LIMIT: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardView {
    pub recent: Vec<NormalizedRecord>,
    pub anomalies: Vec<NormalizedRecord>,
}

pub fn project(records: &[NormalizedRecord]) -> DashboardView {
    project_with_limit(records, RECENT_LIMIT)
}

/// Newest-first by sort key; `anomalies` keeps every flagged record.
///
/// The sort key is compared as a plain string, which is only chronological
/// when the source uses fixed-width, zero-padded dates and times. Equal keys
/// keep their collection order.
pub fn project_with_limit(records: &[NormalizedRecord], limit: usize) -> DashboardView {
    let mut ordered: Vec<&NormalizedRecord> = records.iter().collect();
    ordered.sort_by(|a, b| b.sort_key().cmp(a.sort_key()));

    let anomalies = ordered
        .iter()
        .filter(|record| record.is_anomaly())
        .map(|record| (*record).clone())
        .collect();
    let recent = ordered.into_iter().take(limit).cloned().collect();

    DashboardView { recent, anomalies }
}
