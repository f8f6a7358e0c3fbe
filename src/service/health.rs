//! Liveness probe.
//!
//! A GET on any path of the configured port answers with the health JSON.
//! The probe is the single source of truth for liveness: the service is
//! healthy iff the worker is running and its last heartbeat is fresh.

use std::sync::Arc;

use axum::{extract::State, http::header, response::IntoResponse, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::worker::Worker;

/// A heartbeat older than this marks the worker as stalled.
const HEARTBEAT_STALE_SECS: i64 = 30;

/// State handed to the probe handler.
#[derive(Clone)]
pub struct HealthState {
    /// Name reported as `serviceName`.
    pub service_name: &'static str,
    /// Version reported as `version`.
    pub version: &'static str,
    /// The worker whose liveness is probed.
    pub worker: Arc<Worker>,
}

/// Body of the probe response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    service_name: &'static str,
    version: &'static str,
    timestamp: DateTime<Utc>,
    healthy: bool,
    details: HealthDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthDetails {
    worker_thread: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_heartbeat: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secs_since_last_heartbeat: Option<i64>,
}

impl HealthReport {
    /// Capture the current health of the worker.
    pub fn capture(state: &HealthState) -> Self {
        Self::capture_at(state, Utc::now())
    }

    /// Capture health as seen at `now`.
    fn capture_at(state: &HealthState, now: DateTime<Utc>) -> Self {
        let (healthy, details) = if state.worker.is_running() {
            let last_heartbeat = state.worker.heartbeat();
            let age_secs = (now - last_heartbeat).num_seconds();
            let healthy = age_secs < HEARTBEAT_STALE_SECS;
            let worker_thread = if healthy {
                "running and healthy"
            } else {
                "running but stalled (no heartbeat)"
            };
            (
                healthy,
                HealthDetails {
                    worker_thread,
                    last_heartbeat: Some(last_heartbeat),
                    secs_since_last_heartbeat: Some(age_secs),
                },
            )
        } else {
            (
                false,
                HealthDetails {
                    worker_thread: "stopped or unavailable",
                    last_heartbeat: None,
                    secs_since_last_heartbeat: None,
                },
            )
        };

        Self {
            service_name: state.service_name,
            version: state.version,
            timestamp: now,
            healthy,
            details,
        }
    }

    /// Whether the report declares the service healthy.
    pub fn is_healthy(&self) -> bool {
        self.healthy
    }
}

/// Build the probe router. Every path answers the same way.
pub fn health_router(state: HealthState) -> Router {
    Router::new().fallback(health_handler).with_state(state)
}

async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let report = HealthReport::capture(&state);
    ([(header::CONNECTION, "close")], Json(report))
}
