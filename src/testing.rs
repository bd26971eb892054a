//! In-memory event source for engine and scheduler tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::source::{EventSource, SourceError};

pub(crate) type FetchResult = Result<Vec<Value>, SourceError>;

pub(crate) enum Step {
    Ready(FetchResult),
    /// Blocks the fetch until the paired [`Gate`] is released.
    Gated(oneshot::Receiver<FetchResult>),
}

pub(crate) struct Gate(oneshot::Sender<FetchResult>);

impl Gate {
    pub fn release(self, result: FetchResult) {
        let _ = self.0.send(result);
    }
}

/// Replays scripted responses in call order. Once the script runs out every
/// call gets the fallback, or an error when there is none.
pub(crate) struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    fallback: Option<Vec<Value>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_fallback(mut self, payload: Vec<Value>) -> Self {
        self.fallback = Some(payload);
        self
    }

    pub fn repeating(payload: Vec<Value>) -> Self {
        Self::new(Vec::new()).with_fallback(payload)
    }

    pub fn gate() -> (Gate, Step) {
        let (tx, rx) = oneshot::channel();
        (Gate(tx), Step::Gated(rx))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` fetches have started.
    pub async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.calls() < n {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("timed out waiting for fetch calls");
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_records(&self) -> FetchResult {
        let step = self.steps.lock().expect("script lock").pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);
        match step {
            Some(Step::Ready(result)) => result,
            Some(Step::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(SourceError::Request("gate dropped".to_string()))),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| SourceError::Request("script exhausted".to_string())),
        }
    }
}

/// One raw record in the observatory field layout.
pub(crate) fn raw_event(location: &str, date: &str, time: &str, magnitude: f64, is_anomaly: bool) -> Value {
    json!({
        "date": date,
        "time": time,
        "lat": 38.4,
        "lng": 38.3,
        "depth": 7.0,
        "mag": magnitude,
        "location": location,
        "is_anomaly": is_anomaly
    })
}
