use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::SourceSchema;
use crate::db::{queries, Database, DbError};
use crate::source::ReconnectPolicy;
use crate::view::RECENT_LIMIT;

pub const DASHBOARD_CONFIG_SETTING_KEY: &str = "dashboard_config";

pub const ENV_BASE_URL: &str = "QUAKEVIEW_BASE_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "QUAKEVIEW_POLL_INTERVAL_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "QUAKEVIEW_REQUEST_TIMEOUT_MS";
pub const ENV_STREAM: &str = "QUAKEVIEW_STREAM";
pub const ENV_SCHEMA: &str = "QUAKEVIEW_SCHEMA";
pub const ENV_DATA_DIR: &str = "QUAKEVIEW_DATA_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid dashboard configuration: {0}")]
    Invalid(String),
    #[error("settings storage failed: {0}")]
    Storage(#[from] DbError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_stream_enabled")]
    pub stream_enabled: bool,
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
    #[serde(default)]
    pub source_schema: SourceSchema,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            stream_enabled: default_stream_enabled(),
            reconnect: ReconnectPolicy::default(),
            source_schema: SourceSchema::default(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Overlay values from `lookup`. Unparseable values are logged and
    /// ignored so a typo in the environment never blocks startup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = read(ENV_BASE_URL) {
            self.base_url = value;
        }
        if let Some(value) = read(ENV_POLL_INTERVAL_MS) {
            match value.parse() {
                Ok(ms) => self.poll_interval_ms = ms,
                Err(_) => tracing::warn!("ignoring {ENV_POLL_INTERVAL_MS}={value}: not a number"),
            }
        }
        if let Some(value) = read(ENV_REQUEST_TIMEOUT_MS) {
            match value.parse() {
                Ok(ms) => self.request_timeout_ms = ms,
                Err(_) => tracing::warn!("ignoring {ENV_REQUEST_TIMEOUT_MS}={value}: not a number"),
            }
        }
        if let Some(value) = read(ENV_STREAM) {
            match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.stream_enabled = true,
                "0" | "false" | "no" | "off" => self.stream_enabled = false,
                _ => tracing::warn!("ignoring {ENV_STREAM}={value}: expected true or false"),
            }
        }
        if let Some(value) = read(ENV_SCHEMA) {
            match value.parse() {
                Ok(schema) => self.source_schema = schema,
                Err(e) => tracing::warn!("ignoring {ENV_SCHEMA}: {e}"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Invalid("base_url is required".to_string()));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https://, got {base_url}"
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.recent_limit == 0 {
            return Err(ConfigError::Invalid(
                "recent_limit must be greater than zero".to_string(),
            ));
        }
        if let ReconnectPolicy::Bounded {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
        } = self.reconnect
        {
            if max_attempts == 0 || base_delay_ms == 0 || max_delay_ms < base_delay_ms {
                return Err(ConfigError::Invalid(
                    "bounded reconnect needs attempts > 0 and 0 < base_delay_ms <= max_delay_ms"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Stored settings first, then environment overrides on top.
pub fn load_dashboard_config(db: &Database) -> Result<DashboardConfig, ConfigError> {
    let mut config = match queries::get_setting(db, DASHBOARD_CONFIG_SETTING_KEY)? {
        Some(raw) => serde_json::from_str::<DashboardConfig>(&raw).map_err(|error| {
            ConfigError::Invalid(format!("stored {DASHBOARD_CONFIG_SETTING_KEY}: {error}"))
        })?,
        None => DashboardConfig::default(),
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

pub fn save_dashboard_config(db: &Database, config: &DashboardConfig) -> Result<(), ConfigError> {
    config.validate()?;
    let value = serde_json::to_string(config)
        .map_err(|error| ConfigError::Invalid(format!("failed to serialize config: {error}")))?;
    queries::upsert_setting(
        db,
        DASHBOARD_CONFIG_SETTING_KEY,
        &value,
        &Utc::now().to_rfc3339(),
    )?;
    Ok(())
}

pub fn data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(ENV_DATA_DIR) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(app_data) = std::env::var("APPDATA") {
            return PathBuf::from(app_data).join("QuakeView");
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".quakeview");
    }

    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".quakeview");
    }

    PathBuf::from(".quakeview")
}

pub fn db_path() -> Result<PathBuf, String> {
    let dir = data_dir();
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("failed to create data directory {}: {e}", dir.display()))?;
    Ok(dir.join("quakeview.db"))
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    300_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_stream_enabled() -> bool {
    true
}

fn default_recent_limit() -> usize {
    RECENT_LIMIT
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_the_dashboard() {
        let config = DashboardConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.poll_interval(), Duration::from_secs(300));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.stream_enabled);
        assert_eq!(config.reconnect, ReconnectPolicy::Disabled);
        assert_eq!(config.recent_limit, 20);
        assert_ok!(config.validate());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: DashboardConfig =
            serde_json::from_str(r#"{"poll_interval_ms": 60000, "source_schema": "feed"}"#).unwrap();
        assert_eq!(config.poll_interval_ms, 60_000);
        assert_eq!(config.source_schema, SourceSchema::Feed);
        assert_eq!(config.base_url, default_base_url());
    }

    #[test]
    fn overrides_apply_and_bad_values_are_ignored() {
        let mut config = DashboardConfig::default();
        config.apply_overrides(lookup(&[
            (ENV_BASE_URL, " http://quakes.local:8000 "),
            (ENV_POLL_INTERVAL_MS, "ten"),
            (ENV_REQUEST_TIMEOUT_MS, "5000"),
            (ENV_STREAM, "off"),
            (ENV_SCHEMA, "fastapi"),
        ]));

        assert_eq!(config.base_url, "http://quakes.local:8000");
        assert_eq!(config.poll_interval_ms, 300_000);
        assert_eq!(config.request_timeout_ms, 5_000);
        assert!(!config.stream_enabled);
        assert_eq!(config.source_schema, SourceSchema::Feed);
    }

    #[test]
    fn validation_rejects_empty_url_and_zero_intervals() {
        let mut config = DashboardConfig {
            base_url: "  ".to_string(),
            ..DashboardConfig::default()
        };
        assert_err!(config.validate());

        config.base_url = "ftp://example.org".to_string();
        assert_err!(config.validate());

        config.base_url = default_base_url();
        config.poll_interval_ms = 0;
        assert_err!(config.validate());

        config.poll_interval_ms = 1_000;
        config.reconnect = ReconnectPolicy::Bounded {
            max_attempts: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 1_000,
        };
        assert_err!(config.validate());
    }

    #[test]
    fn save_then_load_round_trips_through_settings() {
        let db = Database::open_in_memory().unwrap();
        let config = DashboardConfig {
            poll_interval_ms: 45_000,
            reconnect: ReconnectPolicy::bounded(4),
            ..DashboardConfig::default()
        };
        save_dashboard_config(&db, &config).unwrap();

        let raw = queries::get_setting(&db, DASHBOARD_CONFIG_SETTING_KEY)
            .unwrap()
            .unwrap();
        let stored: DashboardConfig = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, config);
    }

    #[test]
    fn saving_an_invalid_config_is_refused() {
        let db = Database::open_in_memory().unwrap();
        let config = DashboardConfig {
            request_timeout_ms: 0,
            ..DashboardConfig::default()
        };
        assert!(save_dashboard_config(&db, &config).is_err());
        assert_eq!(queries::get_setting(&db, DASHBOARD_CONFIG_SETTING_KEY).unwrap(), None);
    }
}
