//! Command surface tests.
//!
//! These tests verify:
//! - Dashboard, list and map commands read one consistent generation
//! - Selection commands resolve by natural key and report misses
//! - Settings commands persist through SQLite

#[cfg(test)]
pub mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use crate::bus::EventBus;
    use crate::commands::{dashboard, selection, settings};
    use crate::config::DashboardConfig;
    use crate::core::SourceSchema;
    use crate::db::Database;
    use crate::runtime::{RefreshTrigger, SelectionCoordinator, SyncEngine};
    use crate::source::{EventSource, HttpEventSource, ReconnectPolicy};
    use crate::testing::{raw_event, ScriptedSource};
    use crate::{AppError, AppState};

    fn state_with(source: Arc<ScriptedSource>) -> AppState {
        let db = Arc::new(Database::open_in_memory().expect("in-memory DB"));
        let bus = Arc::new(EventBus::new());
        let selection = Arc::new(SelectionCoordinator::new(bus.clone()));
        let source: Arc<dyn EventSource> = source;
        let engine = Arc::new(
            SyncEngine::new(source, SourceSchema::Auto, bus.clone(), selection.clone())
                .with_database(db.clone()),
        );
        AppState {
            db,
            bus,
            engine,
            selection,
            source: Arc::new(
                HttpEventSource::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap(),
            ),
            config: DashboardConfig::default(),
        }
    }

    fn turkey_payload() -> Vec<serde_json::Value> {
        vec![
            raw_event("YESILYURT (MALATYA)", "2024.08.10", "08:00:00", 4.6, false),
            raw_event("ELBISTAN (KAHRAMANMARAS)", "2024.08.10", "09:30:00", 5.1, true),
            raw_event("SAMANDAG (HATAY)", "2024.08.10", "07:15:00", 2.4, false),
        ]
    }

    #[tokio::test]
    async fn test_dashboard_view_before_first_refresh_is_empty() {
        let state = state_with(Arc::new(ScriptedSource::new(Vec::new())));
        let snapshot = dashboard::get_dashboard_view(&state);
        assert_eq!(snapshot.version, 0);
        assert_eq!(snapshot.total, 0);
        assert!(snapshot.view.recent.is_empty());
        assert!(snapshot.selected.is_none());
    }

    #[tokio::test]
    async fn test_refresh_now_then_read_views() {
        let state = state_with(Arc::new(ScriptedSource::repeating(turkey_payload())));

        let outcome = dashboard::refresh_now(&state).await.unwrap();
        assert_eq!(outcome.trigger, RefreshTrigger::Manual);
        assert_eq!(outcome.count, 3);

        let snapshot = dashboard::get_dashboard_view(&state);
        assert_eq!(snapshot.version, outcome.version);
        let order: Vec<&str> = snapshot.view.recent.iter().map(|r| r.time()).collect();
        assert_eq!(order, vec!["09:30:00", "08:00:00", "07:15:00"]);
        assert_eq!(snapshot.view.anomalies.len(), 1);

        let lists = dashboard::get_dashboard_lists(&state);
        assert_eq!(lists.recent[0].magnitude_label, "5.1");
        assert_eq!(lists.recent[0].badge_color, "#ff0000");
        assert_eq!(lists.anomalies[0].location, "ELBISTAN (KAHRAMANMARAS)");
    }

    #[tokio::test]
    async fn test_select_event_marks_map_and_clears() {
        let state = state_with(Arc::new(ScriptedSource::repeating(turkey_payload())));
        state.engine.refresh(RefreshTrigger::Startup).await.unwrap();

        let target = state.engine.snapshot().records()[1].natural_key();
        let selected = selection::select_event(&state, target.clone()).unwrap();
        assert_eq!(selected.location(), "ELBISTAN (KAHRAMANMARAS)");
        assert_eq!(selection::get_selection(&state), Some(selected));

        let map = dashboard::get_map_markers(&state);
        let flagged: Vec<bool> = map.markers.iter().map(|m| m.selected).collect();
        assert_eq!(flagged, vec![false, true, false]);
        assert_eq!(map.markers[1].fill_color, "black");
        assert_eq!(map.viewport.zoom, 6);

        assert!(dashboard::get_dashboard_view(&state).selected.is_some());
        assert!(selection::clear_selection(&state));
        assert!(!selection::clear_selection(&state));
        assert!(selection::get_selection(&state).is_none());
    }

    #[tokio::test]
    async fn test_select_unknown_event_is_not_found() {
        let state = state_with(Arc::new(ScriptedSource::repeating(turkey_payload())));
        state.engine.refresh(RefreshTrigger::Startup).await.unwrap();

        let mut key = state.engine.snapshot().records()[0].natural_key();
        key.time = "23:59:59".to_string();

        let error = selection::select_event(&state, key).unwrap_err();
        assert!(matches!(error, AppError::NotFound(_)));
        let serialized = serde_json::to_value(&error).unwrap();
        assert!(serialized.as_str().unwrap().starts_with("not found: event YESILYURT"));
        assert!(selection::get_selection(&state).is_none());
    }

    #[tokio::test]
    async fn test_refresh_now_failure_surfaces_as_app_error() {
        let state = state_with(Arc::new(ScriptedSource::new(Vec::new())));
        let error = dashboard::refresh_now(&state).await.unwrap_err();
        assert!(matches!(error, AppError::Sync(_)));
        assert!(error.to_string().contains("script exhausted"));
    }

    #[test]
    fn test_dashboard_settings_round_trip() {
        let state = state_with(Arc::new(ScriptedSource::new(Vec::new())));
        let config = DashboardConfig {
            base_url: "http://quakes.internal:8000".to_string(),
            poll_interval_ms: 120_000,
            reconnect: ReconnectPolicy::bounded(5),
            ..DashboardConfig::default()
        };
        settings::set_dashboard_config(&state, config.clone()).unwrap();

        let stored = crate::db::queries::get_setting(&state.db, crate::config::DASHBOARD_CONFIG_SETTING_KEY)
            .unwrap()
            .unwrap();
        let stored: DashboardConfig = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored, config);

        let invalid = DashboardConfig {
            poll_interval_ms: 0,
            ..DashboardConfig::default()
        };
        assert!(matches!(
            settings::set_dashboard_config(&state, invalid),
            Err(AppError::Config(_))
        ));
    }
}
