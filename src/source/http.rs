use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::source::traits::EventSource;
use crate::source::types::{Prediction, RefreshAck, SourceError};

pub const EARTHQUAKES_PATH: &str = "/api/earthquakes";
pub const POSSIBLE_EARTHQUAKES_PATH: &str = "/api/possible-earthquakes";
pub const PREDICTIONS_PATH: &str = "/api/predictions";
pub const STREAM_PATH: &str = "/api/stream";
pub const REFRESH_PATH: &str = "/api/refresh";

/// HTTP client for the event source service.
pub struct HttpEventSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpEventSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(SourceError::Config("base url cannot be empty".to_string()));
        }
        if timeout.is_zero() {
            return Err(SourceError::Config(
                "request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            base_url: base_url.to_string(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| SourceError::Config(e.to_string()))?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stream_url(&self) -> String {
        format!("{}{STREAM_PATH}", self.base_url)
    }

    /// Records of the alternate "possible risks" feed.
    pub async fn fetch_possible(&self) -> Result<Vec<Value>, SourceError> {
        self.get_array(POSSIBLE_EARTHQUAKES_PATH).await
    }

    /// Risk scores per location. Entries that do not match the expected
    /// shape are skipped rather than failing the whole response.
    pub async fn fetch_predictions(&self) -> Result<Vec<Prediction>, SourceError> {
        let values = self.get_array(PREDICTIONS_PATH).await?;
        let total = values.len();
        let predictions: Vec<Prediction> = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Prediction>(value) {
                Ok(prediction) => Some(prediction),
                Err(e) => {
                    tracing::debug!("skipping malformed prediction: {e}");
                    None
                }
            })
            .collect();
        if predictions.len() < total {
            tracing::warn!(
                "dropped {} of {total} predictions with unexpected shape",
                total - predictions.len()
            );
        }
        Ok(predictions)
    }

    /// Ask the service to scrape its upstream now. The reply only reports
    /// whether that worked; records still come from the next fetch.
    pub async fn request_refresh(&self) -> Result<RefreshAck, SourceError> {
        let endpoint = format!("{}{REFRESH_PATH}", self.base_url);
        let response = self
            .client
            .post(&endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("POST {endpoint}: status={status}, bytes={}", text.len());

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: truncate(&text, 512),
            });
        }

        let ack: RefreshAck = serde_json::from_str(&text).map_err(|e| {
            SourceError::InvalidPayload(format!("{REFRESH_PATH} returned unexpected JSON: {e}"))
        })?;
        if !ack.is_success() {
            return Err(SourceError::InvalidPayload(format!(
                "{REFRESH_PATH} reported {}: {}",
                ack.status, ack.message
            )));
        }
        Ok(ack)
    }

    async fn get_array(&self, path: &str) -> Result<Vec<Value>, SourceError> {
        let endpoint = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("GET {endpoint}: status={status}, bytes={}", text.len());

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: truncate(&text, 512),
            });
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(other) => Err(SourceError::InvalidPayload(format!(
                "{path} returned {} instead of an array",
                match other {
                    Value::Object(_) => "an object",
                    Value::Null => "null",
                    _ => "a scalar",
                }
            ))),
            Err(e) => Err(SourceError::InvalidPayload(format!(
                "{path} returned invalid JSON: {e}"
            ))),
        }
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn fetch_records(&self) -> Result<Vec<Value>, SourceError> {
        self.get_array(EARTHQUAKES_PATH).await
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_base_url() {
        let result = HttpEventSource::new("  ", Duration::from_secs(1));
        assert!(matches!(result, Err(SourceError::Config(_))));
    }

    #[test]
    fn trims_trailing_slash_for_stream_url() {
        let source = HttpEventSource::new("http://127.0.0.1:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(source.base_url(), "http://127.0.0.1:5000");
        assert_eq!(source.stream_url(), "http://127.0.0.1:5000/api/stream");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("ŞİŞLİ", 2), "Şİ...");
        assert_eq!(truncate("ok", 10), "ok");
    }
}
