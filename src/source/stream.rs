//! Push channel: a Server-Sent Events reader that turns every well-formed
//! message into a freshness signal for the scheduler.
//!
//! Message content is not interpreted beyond "something changed". When the
//! connection fails or ends the channel is closed; polling keeps the
//! collection fresh. Reconnecting is opt-in through [`ReconnectPolicy`].

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::bus::event_types::{
    CATEGORY_STREAM, EVENT_STREAM_CLOSED, EVENT_STREAM_CONNECTED, EVENT_STREAM_SIGNAL,
};
use crate::bus::EventBus;
use crate::source::types::SourceError;

// ---------------------------------------------------------------------------
// Reconnect policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Close on the first error and rely on polling.
    #[default]
    Disabled,
    /// Reconnect with exponential backoff, giving up after `max_attempts`
    /// consecutive failures. A successful connection resets the count.
    Bounded {
        max_attempts: u32,
        base_delay_ms: u64,
        max_delay_ms: u64,
    },
}

impl ReconnectPolicy {
    pub fn bounded(max_attempts: u32) -> Self {
        Self::Bounded {
            max_attempts,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }

    /// Delay before reconnect attempt number `attempt` (0-based), or `None`
    /// when the channel should stay closed.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        match *self {
            Self::Disabled => None,
            Self::Bounded {
                max_attempts,
                base_delay_ms,
                max_delay_ms,
            } => {
                if attempt >= max_attempts {
                    return None;
                }
                let delay_ms = base_delay_ms.saturating_mul(2_u64.pow(attempt.min(16)));
                Some(Duration::from_millis(delay_ms.min(max_delay_ms)))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SSE decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event_type: String,
    pub data: String,
    pub id: Option<String>,
    pub retry: Option<u64>,
}

/// Upper bound on bytes held for one unfinished line plus the data lines
/// of the frame being assembled.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Incremental decoder; frames may be split across any number of chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    event_type: Option<String>,
    data: Vec<String>,
    data_bytes: usize,
    id: Option<String>,
    retry: Option<u64>,
}

impl SseDecoder {
    /// Feed one chunk. Fails once a frame outgrows [`MAX_FRAME_BYTES`].
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, StreamError> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline_idx) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=newline_idx).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }
            self.field(&line);
        }

        let buffered = self.pending.len() + self.data_bytes;
        if buffered > MAX_FRAME_BYTES {
            self.pending.clear();
            self.data.clear();
            self.data_bytes = 0;
            return Err(StreamError::Read(format!(
                "frame exceeds {MAX_FRAME_BYTES} bytes without a terminator"
            )));
        }
        Ok(events)
    }

    fn field(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }
        let (key, value) = match line.split_once(':') {
            Some((key, value)) => (key, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match key {
            "event" => self.event_type = Some(value.to_string()),
            "data" => {
                self.data_bytes += value.len();
                self.data.push(value.to_string());
            }
            "id" => self.id = Some(value.to_string()),
            "retry" => self.retry = value.parse().ok(),
            _ => trace!("unknown SSE field: {key}"),
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event_type = self.event_type.take();
        let retry = self.retry.take();
        if self.data.is_empty() {
            return None;
        }
        self.data_bytes = 0;
        Some(SseEvent {
            event_type: event_type.unwrap_or_else(|| "message".to_string()),
            data: std::mem::take(&mut self.data).join("\n"),
            id: self.id.clone(),
            retry,
        })
    }
}

/// Body of a push message. Both fields are informational only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamSignal {
    #[serde(default)]
    pub new_count: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `None` for anything that is not a JSON object with the expected field
/// types; such messages are discarded.
pub fn parse_signal(data: &str) -> Option<StreamSignal> {
    let value: serde_json::Value = serde_json::from_str(data.trim()).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("failed to connect to push channel: {0}")]
    Connect(String),
    #[error("push channel returned status {0}")]
    Status(u16),
    #[error("push channel read failed: {0}")]
    Read(String),
    #[error("push channel ended")]
    Ended,
}

pub struct StreamListener {
    url: String,
    client: reqwest::Client,
    policy: ReconnectPolicy,
    bus: Arc<EventBus>,
}

impl StreamListener {
    pub fn new(
        url: String,
        connect_timeout: Duration,
        policy: ReconnectPolicy,
        bus: Arc<EventBus>,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| SourceError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            url,
            client,
            policy,
            bus,
        })
    }

    pub fn spawn(
        self,
        signals: mpsc::Sender<StreamSignal>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(signals, shutdown))
    }

    /// Listen until shutdown, until the signal receiver goes away, or until
    /// the reconnect policy gives up.
    pub async fn run(self, signals: mpsc::Sender<StreamSignal>, mut shutdown: watch::Receiver<bool>) {
        let mut attempt: u32 = 0;

        loop {
            let result = tokio::select! {
                result = self.listen_once(&signals, &mut attempt) => result,
                _ = shutdown.changed() => {
                    debug!("push listener shutting down");
                    return;
                }
            };

            let Err(error) = result else {
                debug!("signal receiver dropped; push listener exiting");
                return;
            };

            warn!("push channel closed: {error}");
            self.bus.emit(
                CATEGORY_STREAM,
                EVENT_STREAM_CLOSED,
                serde_json::json!({ "reason": error.to_string(), "attempt": attempt }),
            );

            let Some(delay) = self.policy.delay_for(attempt) else {
                info!("push channel not reopened; polling remains the refresh source");
                return;
            };
            attempt += 1;
            info!("reconnecting push channel in {delay:?} (attempt {attempt})");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => return,
            }
        }
    }

    /// Ok(()) means the consumer is gone; every other exit is an error.
    async fn listen_once(
        &self,
        signals: &mpsc::Sender<StreamSignal>,
        attempt: &mut u32,
    ) -> Result<(), StreamError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StreamError::Status(response.status().as_u16()));
        }

        info!("connected to push channel at {}", self.url);
        *attempt = 0;
        self.bus.emit(
            CATEGORY_STREAM,
            EVENT_STREAM_CONNECTED,
            serde_json::json!({ "url": self.url }),
        );

        let mut decoder = SseDecoder::default();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| StreamError::Read(e.to_string()))?;
            for event in decoder.push(&bytes)? {
                let Some(signal) = parse_signal(&event.data) else {
                    debug!("discarding malformed push payload: {}", event.data);
                    continue;
                };
                self.bus.emit(
                    CATEGORY_STREAM,
                    EVENT_STREAM_SIGNAL,
                    serde_json::json!({ "new_count": signal.new_count }),
                );
                if signals.send(signal).await.is_err() {
                    return Ok(());
                }
            }
        }

        Err(StreamError::Ended)
    }
}
