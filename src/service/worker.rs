//! The worker: ingest buffering and the periodic processing tick.
//!
//! Two cooperating loops share one `Worker`:
//!
//! - the **ingest loop** decodes incoming messages and appends to the
//!   measurement buffer, holding its lock only for the push;
//! - the **tick loop** swaps the buffer for an empty one, stable-sorts the
//!   snapshot by timestamp, drives the track manager, publishes a report
//!   when confirmed tracks exist, and records a heartbeat.
//!
//! All manager mutation happens on the tick loop; the health probe only ever
//! reads the running flag and the heartbeat.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};

use super::dto::{MeasurementMsg, TrackReport};
use super::relay::ReportPublisher;
use crate::config::TrackerConfig;
use crate::measurement::Measurement;
use crate::tracking::{TrackManager, TrackSnapshot};

/// Horizon of the per-tick future-trajectory rollout, seconds.
const TRAJECTORY_HORIZON_SECS: f64 = 2.0;
/// Step of the per-tick future-trajectory rollout, seconds.
const TRAJECTORY_STEP_SECS: f64 = 0.5;

/// Resolve once the shutdown signal is (or becomes) true.
///
/// Equivalent to `watch::Receiver::wait_for(|stop| *stop)`, but yields `()`
/// instead of a `Ref` guard so the future stays `Send` across the
/// `tokio::select!` in the loops below.
async fn wait_for_stop(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Drives the tracking pipeline on a fixed-period tick.
pub struct Worker {
    config: TrackerConfig,
    manager: RwLock<TrackManager>,
    buffer: Mutex<Vec<Measurement>>,
    heartbeat: RwLock<DateTime<Utc>>,
    running: AtomicBool,
    /// Latched shutdown signal; `watch` keeps the value, so a loop that
    /// subscribes after `stop` still observes it.
    shutdown: watch::Sender<bool>,
    /// Kept alive so `shutdown`'s receiver count never drops to zero —
    /// `watch::Sender::send` is a no-op with no live receivers, which would
    /// otherwise silently drop a `stop()` issued before either loop has
    /// subscribed.
    _shutdown_rx: watch::Receiver<bool>,
    publisher: Arc<dyn ReportPublisher>,
}

impl Worker {
    /// Create a worker around a fresh track manager.
    pub fn new(config: TrackerConfig, publisher: Arc<dyn ReportPublisher>) -> Self {
        let (shutdown, _shutdown_rx) = watch::channel(false);
        Self {
            manager: RwLock::new(TrackManager::new(config.clone())),
            buffer: Mutex::new(Vec::new()),
            heartbeat: RwLock::new(Utc::now()),
            running: AtomicBool::new(true),
            shutdown,
            _shutdown_rx,
            publisher,
            config,
        }
    }

    /// Decode one raw message and buffer the measurement.
    ///
    /// Malformed messages — bad JSON, a missing `ObserverId`, a mistyped
    /// field — are dropped here and never reach the pipeline.
    pub fn ingest_raw(&self, payload: &str) {
        match serde_json::from_str::<MeasurementMsg>(payload) {
            Ok(msg) => {
                self.buffer.lock().push(msg.into());
            }
            Err(error) => {
                tracing::debug!(%error, "dropping malformed measurement message");
            }
        }
    }

    /// Run one processing tick.
    pub async fn tick(&self) {
        // Swap the buffer under its lock; everything else works on the
        // local snapshot.
        let mut batch = std::mem::take(&mut *self.buffer.lock());
        batch.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let snapshots: Vec<TrackSnapshot> = {
            let mut manager = self.manager.write();
            if let Some(latest) = batch.last() {
                manager.predict_to(latest.timestamp);
            }
            manager.process_measurements(&batch);
            manager.snapshot(TRAJECTORY_HORIZON_SECS, TRAJECTORY_STEP_SECS)
        };

        if !snapshots.is_empty() {
            self.publish_report(&snapshots).await;
        }

        *self.heartbeat.write() = Utc::now();
    }

    async fn publish_report(&self, snapshots: &[TrackSnapshot]) {
        let report = TrackReport::new(Utc::now(), snapshots);
        match serde_json::to_string(&report) {
            Ok(payload) => {
                if let Err(error) = self.publisher.publish(payload).await {
                    tracing::warn!(
                        publisher = self.publisher.name(),
                        %error,
                        "failed to publish track report"
                    );
                }
            }
            Err(error) => {
                tracing::error!(%error, "failed to serialize track report");
            }
        }
    }

    /// Consume raw messages from the transport until shutdown or the channel
    /// closes.
    pub async fn run_ingest(self: Arc<Self>, mut source: mpsc::Receiver<String>) {
        let mut shutdown = self.shutdown.subscribe();
        eprintln!("run_ingest start, borrow={}", *shutdown.borrow());
        loop {
            tokio::select! {
                _ = wait_for_stop(&mut shutdown) => break,
                message = source.recv() => match message {
                    Some(payload) => self.ingest_raw(&payload),
                    None => break,
                },
            }
        }
        tracing::debug!("ingest loop stopped");
    }

    /// Run the periodic tick until shutdown.
    pub async fn run_ticks(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.worker_interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while self.is_running() {
            tokio::select! {
                _ = wait_for_stop(&mut shutdown) => break,
                _ = interval.tick() => self.tick().await,
            }
        }
        tracing::debug!("tick loop stopped");
    }

    /// Signal both loops to stop after their current iteration.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown.send(true);
    }

    /// Whether the worker loops are (meant to be) running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Timestamp of the most recent completed tick.
    pub fn heartbeat(&self) -> DateTime<Utc> {
        *self.heartbeat.read()
    }

    /// Number of measurements waiting for the next tick.
    pub fn buffered_len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Number of live tracks.
    pub fn track_count(&self) -> usize {
        self.manager.read().track_count()
    }

    /// Number of confirmed tracks.
    pub fn confirmed_count(&self) -> usize {
        self.manager.read().confirmed_count()
    }

    /// Timestamp of the most recent batch the manager processed.
    pub fn last_process_time(&self) -> Option<f64> {
        self.manager.read().last_process_time()
    }
}
