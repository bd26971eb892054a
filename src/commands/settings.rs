use crate::config::{self, DashboardConfig};
use crate::{AppError, AppState};

/// Stored settings with environment overrides applied.
pub fn get_dashboard_config(state: &AppState) -> Result<DashboardConfig, AppError> {
    Ok(config::load_dashboard_config(&state.db)?)
}

/// Persist new settings. They take effect on the next start.
pub fn set_dashboard_config(state: &AppState, config: DashboardConfig) -> Result<(), AppError> {
    config::save_dashboard_config(&state.db, &config)?;
    tracing::info!("dashboard settings saved; restart to apply");
    Ok(())
}
