//! Types shared by the event source clients.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error("config error: {0}")]
    Config(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timeout: {0}")]
    Timeout(String),
    #[error("event source returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            return Self::Timeout(value.to_string());
        }
        Self::Request(value.to_string())
    }
}

/// Precomputed risk for one location, consumed read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub location: String,
    pub risk_score: f64,
    #[serde(default, alias = "mag", skip_serializing_if = "Option::is_none")]
    pub mean_magnitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u64>,
}

/// Reply to a server-side refresh request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshAck {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl RefreshAck {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
