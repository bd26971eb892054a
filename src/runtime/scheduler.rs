//! Timer and push triggers, both funnelling into `SyncEngine::refresh`.
//!
//! - The timer refreshes once at startup and then every poll interval. Its
//!   refresh runs inline, so a slow fetch makes later ticks skip instead of
//!   stacking up.
//! - Push signals refresh immediately and leave the timer schedule alone.
//!   Signals that arrive while a push refresh is running collapse into one
//!   follow-up refresh.
//!
//! The two tasks are independent: a push refresh may overlap a timer
//! refresh, in which case the later completion owns the collection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::runtime::sync_engine::{RefreshTrigger, SyncEngine};
use crate::source::{StreamListener, StreamSignal};

const SIGNAL_CAPACITY: usize = 64;

pub struct Scheduler {
    engine: Arc<SyncEngine>,
    poll_interval: Duration,
    listener: Option<StreamListener>,
    signals: Option<mpsc::Receiver<StreamSignal>>,
}

impl Scheduler {
    pub fn new(engine: Arc<SyncEngine>, poll_interval: Duration) -> Self {
        Self {
            engine,
            poll_interval,
            listener: None,
            signals: None,
        }
    }

    /// Drive push refreshes from a live push channel.
    pub fn with_stream(mut self, listener: StreamListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Drive push refreshes from an arbitrary signal source.
    pub fn with_signals(mut self, signals: mpsc::Receiver<StreamSignal>) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = vec![tokio::spawn(run_timer(
            self.engine.clone(),
            self.poll_interval,
            shutdown_rx.clone(),
        ))];

        let signals = match (self.listener, self.signals) {
            (Some(listener), _) => {
                let (tx, rx) = mpsc::channel(SIGNAL_CAPACITY);
                tasks.push(listener.spawn(tx, shutdown_rx.clone()));
                Some(rx)
            }
            (None, signals) => signals,
        };
        if let Some(signals) = signals {
            tasks.push(tokio::spawn(run_push(self.engine, signals, shutdown_rx)));
        }

        info!("scheduler started (poll every {:?})", self.poll_interval);
        SchedulerHandle {
            shutdown: shutdown_tx,
            tasks,
        }
    }
}

/// Dropping the handle also stops the scheduler.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                debug!("scheduler task ended abnormally: {e}");
            }
        }
        info!("scheduler stopped");
    }
}

async fn run_timer(engine: Arc<SyncEngine>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut trigger = RefreshTrigger::Startup;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => return,
        }

        tokio::select! {
            result = engine.refresh(trigger) => {
                if let Err(e) = result {
                    debug!("{trigger} refresh failed; next tick retries: {e}");
                }
            }
            _ = shutdown.changed() => return,
        }
        trigger = RefreshTrigger::Timer;
    }
}

async fn run_push(
    engine: Arc<SyncEngine>,
    mut signals: mpsc::Receiver<StreamSignal>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let signal = tokio::select! {
            signal = signals.recv() => signal,
            _ = shutdown.changed() => return,
        };
        let Some(signal) = signal else {
            debug!("push signals ended; timer keeps running");
            return;
        };
        trace!("push signal: new_count={:?}", signal.new_count);

        loop {
            tokio::select! {
                result = engine.refresh(RefreshTrigger::Push) => {
                    if let Err(e) = result {
                        debug!("push refresh failed: {e}");
                    }
                }
                _ = shutdown.changed() => return,
            }

            let mut pending = 0usize;
            while signals.try_recv().is_ok() {
                pending += 1;
            }
            if pending == 0 {
                break;
            }
            debug!("{pending} push signal(s) arrived during refresh; running one follow-up");
        }
    }
}
