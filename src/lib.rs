//! # trackcast
//!
//! A real-time multi-target tracker. The crate ingests a stream of 3-D
//! position observations, each stamped with a time and an observer id, and
//! maintains a set of tracks — estimated kinematic states of physical
//! targets — that it publishes periodically downstream.
//!
//! ## Pipeline
//!
//! ```text
//! measurement JSON ──▶ Worker (decode + buffer)
//!                         │ tick
//!                         ▼
//!                    TrackManager ──▶ predict to batch time
//!                         │           associate / update / spawn / retire
//!                         ▼
//!                    confirmed tracks ──▶ report JSON ──▶ ReportPublisher
//! ```
//!
//! The estimator is a cubature Kalman filter (third-degree spherical-radial
//! rule) over pluggable motion models: constant velocity (state dimension 6)
//! and constant acceleration (state dimension 9). Data association is gated
//! nearest-neighbour with deterministic ascending-id ordering; residual
//! measurements spawn new tracks after duplicate suppression and clustering.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use trackcast::config::TrackerConfig;
//! use trackcast::service::{BroadcastPublisher, TrackerService};
//!
//! #[tokio::main]
//! async fn main() -> trackcast::Result<()> {
//!     let publisher = Arc::new(BroadcastPublisher::new(64));
//!     let mut reports = publisher.subscribe();
//!
//!     let (measurements, source) = mpsc::channel(1024);
//!     let mut service = TrackerService::new(TrackerConfig::default(), publisher);
//!     service.start(source).await?;
//!
//!     measurements
//!         .send(r#"{"ObserverId":1,"Timestamp":0.1,"Position":{"x":1.0,"y":2.0,"z":0.0}}"#.into())
//!         .await
//!         .ok();
//!     if let Ok(report) = reports.recv().await {
//!         println!("{report}");
//!     }
//!
//!     service.stop().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod measurement;
pub mod models;
pub mod service;
pub mod tracking;

pub use config::{KalmanConfig, ModelKind, TrackerConfig};
pub use measurement::Measurement;
pub use models::{ConstantAccelerationModel, ConstantVelocityModel, MotionModel};
pub use service::{BroadcastPublisher, ReportPublisher, TrackerService, Worker};
pub use tracking::{CubatureFilter, FilterError, Track, TrackManager, TrackSnapshot};

/// Name reported by the health probe.
pub const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

/// Crate version, reported by the health probe.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for service operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Unified error type for the tracking service.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Numeric degeneracy inside the filter.
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// Wire encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The report sink refused a payload.
    #[error("publish error: {0}")]
    Publish(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error, e.g. binding the health probe port.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{KalmanConfig, ModelKind, TrackerConfig};
    pub use crate::measurement::Measurement;
    pub use crate::models::{ConstantAccelerationModel, ConstantVelocityModel, MotionModel};
    pub use crate::service::{
        BroadcastPublisher, MeasurementMsg, ReportPublisher, TrackReport, TrackerService, Worker,
    };
    pub use crate::tracking::{CubatureFilter, FilterError, Track, TrackManager, TrackSnapshot};
    pub use crate::{Result, TrackerError};
}
