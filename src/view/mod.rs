//! Derived, read-only views. Nothing here mutates the collection.

pub mod markers;
pub mod projector;
pub mod risk;

pub use markers::{list_entries, markers, ListEntry, MapMarker, MapViewport};
pub use projector::{project, project_with_limit, DashboardView, RECENT_LIMIT};
pub use risk::{risk_cards, RiskCard};
