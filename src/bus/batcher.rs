use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::event_types::should_flush_immediately;
use super::BusEvent;

/// Receiver of event batches, typically the bridge to a rendering shell.
pub trait EventSink: Send + Sync + 'static {
    fn deliver(&self, batch: &[BusEvent]) -> Result<(), String>;
}

/// Sink for headless runs: logs every batch.
pub struct LogSink;

impl EventSink for LogSink {
    fn deliver(&self, batch: &[BusEvent]) -> Result<(), String> {
        for event in batch {
            tracing::info!(
                seq = event.seq,
                event_type = event.event_type,
                payload = %event.payload,
                "dashboard event"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub flush_interval: Duration,
    pub max_batch: usize,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_millis(100),
            max_batch: 50,
        }
    }
}

/// Coalesces bursts of bus events so the shell re-renders once per batch.
pub struct EventBatcher {
    sink: Arc<dyn EventSink>,
    policy: BatchPolicy,
    buffer: Vec<BusEvent>,
}

impl EventBatcher {
    /// Spawn a batcher with the default policy (100 ms or 50 events).
    pub fn start(rx: broadcast::Receiver<BusEvent>, sink: Arc<dyn EventSink>) -> JoinHandle<()> {
        Self::start_with(rx, sink, BatchPolicy::default())
    }

    /// Events for which [`should_flush_immediately`] holds go out on their
    /// own, right after whatever was already buffered. The task ends when the
    /// bus is dropped, delivering anything still pending.
    pub fn start_with(
        mut rx: broadcast::Receiver<BusEvent>,
        sink: Arc<dyn EventSink>,
        policy: BatchPolicy,
    ) -> JoinHandle<()> {
        let mut batcher = Self {
            sink,
            policy,
            buffer: Vec::with_capacity(policy.max_batch),
        };

        tokio::spawn(async move {
            let mut ticker = time::interval(policy.flush_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Ok(event) => batcher.accept(event),
                        Err(RecvError::Lagged(missed)) => {
                            tracing::warn!("event batcher fell behind; {missed} events were skipped");
                        }
                        Err(RecvError::Closed) => {
                            batcher.flush();
                            return;
                        }
                    },
                    _ = ticker.tick() => batcher.flush(),
                }
            }
        })
    }

    fn accept(&mut self, event: BusEvent) {
        if should_flush_immediately(&event) {
            self.flush();
            self.deliver(std::slice::from_ref(&event));
            return;
        }
        self.buffer.push(event);
        if self.buffer.len() >= self.policy.max_batch {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.buffer);
        self.deliver(&batch);
    }

    fn deliver(&self, batch: &[BusEvent]) {
        if let Err(e) = self.sink.deliver(batch) {
            tracing::warn!("dropping {} dashboard events: {e}", batch.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::bus::event_types::{
        CATEGORY_SELECTION, CATEGORY_STREAM, EVENT_SELECTION_CHANGED, EVENT_STREAM_SIGNAL,
    };
    use crate::bus::EventBus;

    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<Vec<&'static str>>>,
    }

    impl EventSink for RecordingSink {
        fn deliver(&self, batch: &[BusEvent]) -> Result<(), String> {
            self.batches
                .lock()
                .unwrap()
                .push(batch.iter().map(|e| e.event_type).collect());
            Ok(())
        }
    }

    #[tokio::test]
    async fn selection_change_flushes_pending_signals_first() {
        let bus = EventBus::new();
        let sink = Arc::new(RecordingSink::default());
        let handle = EventBatcher::start_with(
            bus.subscribe(),
            sink.clone(),
            BatchPolicy {
                flush_interval: Duration::from_secs(60),
                max_batch: 50,
            },
        );

        bus.emit(CATEGORY_STREAM, EVENT_STREAM_SIGNAL, serde_json::json!({}));
        bus.emit(CATEGORY_STREAM, EVENT_STREAM_SIGNAL, serde_json::json!({}));
        bus.emit(CATEGORY_SELECTION, EVENT_SELECTION_CHANGED, serde_json::json!({}));
        drop(bus);
        handle.await.unwrap();

        let batches = sink.batches.lock().unwrap().clone();
        assert_eq!(
            batches,
            vec![
                vec![EVENT_STREAM_SIGNAL, EVENT_STREAM_SIGNAL],
                vec![EVENT_SELECTION_CHANGED],
            ]
        );
    }

    #[tokio::test]
    async fn full_buffer_flushes_without_waiting_for_the_tick() {
        let bus = EventBus::new();
        let sink = Arc::new(RecordingSink::default());
        let handle = EventBatcher::start_with(
            bus.subscribe(),
            sink.clone(),
            BatchPolicy {
                flush_interval: Duration::from_secs(60),
                max_batch: 3,
            },
        );

        for _ in 0..7 {
            bus.emit(CATEGORY_STREAM, EVENT_STREAM_SIGNAL, serde_json::Value::Null);
        }
        drop(bus);
        handle.await.unwrap();

        let sizes: Vec<usize> = sink.batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }
}
