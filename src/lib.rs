//! Live synchronization core for a seismic event dashboard.
//!
//! Keeps a consistent view model of earthquake events fetched from a remote
//! event source and exposes it to a rendering shell.
//!
//! # Architecture
//!
//! - `core`: record types, field adapter, normalizer, magnitude tiers
//! - `source`: HTTP client and push channel listener for the event source
//! - `runtime`: sync engine, selection coordinator, refresh scheduler
//! - `view`: pure projections (recent/anomalies lists, map markers, risk cards)
//! - `bus`: event bus for change notifications
//! - `db`: SQLite settings and last-known-good snapshot
//! - `commands`: entry points for a rendering shell
//! - `config`: dashboard settings resolution

pub mod bus;
pub mod commands;
pub mod config;
pub mod core;
pub mod db;
pub mod runtime;
pub mod source;
pub mod view;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use bus::{EventBatcher, EventBus, LogSink};
use config::{ConfigError, DashboardConfig};
use crate::core::Collection;
use db::Database;
use runtime::{RefreshTrigger, Scheduler, SelectionCoordinator, SyncEngine, SyncError};
use source::{HttpEventSource, SourceError, StreamListener};

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Sync(#[from] SyncError),
    #[error("{0}")]
    Source(#[from] SourceError),
    #[error("{0}")]
    Db(#[from] db::DbError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Other(String),
}

impl Serialize for AppError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub db: Arc<Database>,
    pub bus: Arc<EventBus>,
    pub engine: Arc<SyncEngine>,
    pub selection: Arc<SelectionCoordinator>,
    pub source: Arc<HttpEventSource>,
    pub config: DashboardConfig,
}

impl AppState {
    /// Wire the HTTP source, bus, selection and sync engine for `config`.
    pub fn new(db: Arc<Database>, config: DashboardConfig) -> Result<Self, AppError> {
        let source = Arc::new(HttpEventSource::new(
            &config.base_url,
            config.request_timeout(),
        )?);
        let bus = Arc::new(EventBus::new());
        let selection = Arc::new(SelectionCoordinator::new(bus.clone()));
        let engine = Arc::new(
            SyncEngine::new(
                source.clone(),
                config.source_schema,
                bus.clone(),
                selection.clone(),
            )
            .with_database(db.clone()),
        );

        Ok(Self {
            db,
            bus,
            engine,
            selection,
            source,
            config,
        })
    }
}

// ---------------------------------------------------------------------------
// Application entry point
// ---------------------------------------------------------------------------

/// Command-line overrides, applied on top of the resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub base_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub no_stream: bool,
    pub once: bool,
    pub reconnect: Option<u32>,
}

impl RunOptions {
    fn apply_to(&self, config: &mut DashboardConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if self.no_stream {
            config.stream_enabled = false;
        }
        if let Some(attempts) = self.reconnect {
            config.reconnect = source::ReconnectPolicy::bounded(attempts);
        }
    }
}

pub async fn run(options: RunOptions) -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quakeview=debug,info")),
        )
        .init();

    let db_path = config::db_path().map_err(AppError::Other)?;
    let db = Arc::new(Database::open(&db_path)?);
    let mut config = config::load_dashboard_config(&db)?;
    options.apply_to(&mut config);
    config.validate()?;

    let state = AppState::new(db, config)?;
    match state.engine.restore_from_db() {
        Ok(Some(count)) => tracing::info!("showing {count} cached events until the first refresh"),
        Ok(None) => {}
        Err(e) => tracing::warn!("could not restore cached events: {e}"),
    }

    if options.once {
        return run_once(&state).await;
    }

    let batcher = EventBatcher::start(state.bus.subscribe(), Arc::new(LogSink));
    let view_logger = tokio::spawn(log_views(
        state.engine.subscribe(),
        state.config.recent_limit,
    ));

    let mut scheduler = Scheduler::new(state.engine.clone(), state.config.poll_interval());
    if state.config.stream_enabled {
        let listener = StreamListener::new(
            state.source.stream_url(),
            state.config.request_timeout(),
            state.config.reconnect,
            state.bus.clone(),
        )?;
        scheduler = scheduler.with_stream(listener);
    }
    let handle = scheduler.start();

    tracing::info!("QuakeView started against {}", state.source.base_url());
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::Other(format!("failed to listen for ctrl-c: {e}")))?;

    tracing::info!("shutting down");
    handle.shutdown().await;
    view_logger.abort();
    batcher.abort();
    Ok(())
}

/// One refresh, then print the projected view. A failed refresh still
/// prints whatever was restored from the cache.
async fn run_once(state: &AppState) -> Result<(), AppError> {
    if let Err(e) = state.engine.refresh(RefreshTrigger::Startup).await {
        tracing::warn!("refresh failed, printing last known view: {e}");
    }
    let snapshot = commands::dashboard::get_dashboard_view(state);
    let rendered = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| AppError::Other(format!("failed to render view: {e}")))?;
    println!("{rendered}");
    Ok(())
}

async fn log_views(mut rx: watch::Receiver<Arc<Collection>>, recent_limit: usize) {
    while rx.changed().await.is_ok() {
        let collection = rx.borrow_and_update().clone();
        let projected = view::project_with_limit(collection.records(), recent_limit);
        let newest = projected
            .recent
            .first()
            .map(|record| format!("M{:.1} {} {}", record.magnitude(), record.location(), record.sort_key()))
            .unwrap_or_else(|| "none".to_string());
        tracing::info!(
            "view v{}: {} recent, {} anomalies, newest {newest}",
            collection.version(),
            projected.recent.len(),
            projected.anomalies.len()
        );
    }
}
