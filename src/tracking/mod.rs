//! The tracking pipeline.
//!
//! Three collaborating components:
//!
//! - **[`CubatureFilter`]** — nonlinear predict/update over mean + covariance
//! - **[`Track`]** — per-target state, lifecycle counters, trajectory rollout
//! - **[`TrackManager`]** — data association, births, misses, shared timeline
//!
//! # Example
//!
//! ```rust,no_run
//! use trackcast::config::TrackerConfig;
//! use trackcast::measurement::Measurement;
//! use trackcast::tracking::TrackManager;
//! use nalgebra::Vector3;
//!
//! let mut manager = TrackManager::new(TrackerConfig::default());
//! let batch = vec![Measurement::new(Vector3::new(1.0, 2.0, 0.0), 0.1, 7)];
//! manager.predict_to(0.1);
//! manager.process_measurements(&batch);
//! println!("live tracks: {}", manager.track_count());
//! ```

pub mod cubature;
pub mod manager;
pub mod track;

pub use cubature::{CubatureFilter, FilterError};
pub use manager::{TrackManager, TrackSnapshot};
pub use track::Track;
