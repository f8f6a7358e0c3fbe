//! The service layer around the tracking pipeline: wire formats, the report
//! publishing seam, the worker loops, the health probe, and the lifecycle
//! that ties them together.

pub mod dto;
pub mod health;
pub mod relay;
pub mod worker;

pub use dto::{MeasurementMsg, PositionMsg, TrackMsg, TrackReport};
pub use health::{health_router, HealthReport, HealthState};
pub use relay::{BroadcastPublisher, ReportPublisher};
pub use worker::Worker;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::TrackerConfig;
use crate::{TrackerError, SERVICE_NAME, VERSION};

/// Shutdown must complete within this budget; overruns are logged and the
/// straggling task is aborted, never left mutating state.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the worker, its loops, and the health probe.
pub struct TrackerService {
    config: TrackerConfig,
    worker: Arc<Worker>,
    tasks: Vec<JoinHandle<()>>,
    http_shutdown: watch::Sender<bool>,
    /// Kept alive so `http_shutdown`'s receiver count never drops to zero —
    /// `watch::Sender::send` is a no-op with no live receivers, which would
    /// otherwise silently drop a `stop()` issued before `start()` has
    /// subscribed.
    _http_shutdown_rx: watch::Receiver<bool>,
}

impl TrackerService {
    /// Wire a service together. Nothing runs until [`start`](Self::start).
    pub fn new(config: TrackerConfig, publisher: Arc<dyn ReportPublisher>) -> Self {
        let worker = Arc::new(Worker::new(config.clone(), publisher));
        let (http_shutdown, _http_shutdown_rx) = watch::channel(false);
        Self {
            config,
            worker,
            tasks: Vec::new(),
            http_shutdown,
            _http_shutdown_rx,
        }
    }

    /// The worker, e.g. for probing state in tests.
    pub fn worker(&self) -> &Arc<Worker> {
        &self.worker
    }

    /// Bind the health probe and spawn the ingest, tick, and probe tasks.
    ///
    /// Failing to bind the probe port is fatal: the error is returned and
    /// nothing is left running.
    pub async fn start(&mut self, source: mpsc::Receiver<String>) -> Result<(), TrackerError> {
        let listener =
            tokio::net::TcpListener::bind(("0.0.0.0", self.config.health_port)).await?;
        tracing::info!(port = self.config.health_port, "health probe listening");

        let router = health_router(HealthState {
            service_name: SERVICE_NAME,
            version: VERSION,
            worker: self.worker.clone(),
        });
        let mut http_shutdown = self.http_shutdown.subscribe();
        self.tasks.push(tokio::spawn(async move {
            let shutdown = async move {
                let _ = http_shutdown.wait_for(|stop| *stop).await;
            };
            if let Err(error) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::error!(%error, "health probe server terminated");
            }
        }));

        self.tasks.push(tokio::spawn(self.worker.clone().run_ingest(source)));
        self.tasks.push(tokio::spawn(self.worker.clone().run_ticks()));

        tracing::info!(
            interval_ms = self.config.worker_interval_ms,
            "tracker service started"
        );
        Ok(())
    }

    /// Stop all tasks, draining in-flight work, within the shutdown budget.
    pub async fn stop(&mut self) {
        tracing::info!("stopping tracker service");
        self.worker.stop();
        let _ = self.http_shutdown.send(true);

        let deadline = tokio::time::Instant::now() + SHUTDOWN_TIMEOUT;
        for mut task in self.tasks.drain(..) {
            if tokio::time::timeout_at(deadline, &mut task).await.is_err() {
                tracing::warn!("task exceeded the shutdown deadline; aborting it");
                task.abort();
            }
        }
        tracing::info!("tracker service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_and_bounded_stop() {
        let publisher = Arc::new(BroadcastPublisher::new(8));
        let config = TrackerConfig::builder().health_port(0).build(); // ephemeral port
        let mut service = TrackerService::new(config, publisher);

        let (tx, rx) = mpsc::channel(8);
        service.start(rx).await.unwrap();
        assert!(service.worker().is_running());

        tx.send(
            r#"{"ObserverId":1,"Timestamp":1.0,"Position":{"x":0.0,"y":0.0,"z":0.0}}"#.to_string(),
        )
        .await
        .unwrap();

        tokio::time::timeout(Duration::from_secs(5), service.stop())
            .await
            .expect("stop must finish well inside the shutdown budget");
        assert!(!service.worker().is_running());
    }

    #[tokio::test]
    async fn test_port_collision_is_fatal() {
        let publisher: Arc<dyn ReportPublisher> = Arc::new(BroadcastPublisher::new(8));

        // Occupy a port, then ask the service to bind the same one.
        let blocker = tokio::net::TcpListener::bind(("0.0.0.0", 0)).await.unwrap();
        let port = blocker.local_addr().unwrap().port();

        let config = TrackerConfig::builder().health_port(port).build();
        let mut service = TrackerService::new(config, publisher);
        let (_tx, rx) = mpsc::channel(8);

        assert!(service.start(rx).await.is_err());
    }
}
