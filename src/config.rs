//! Tracker configuration.
//!
//! All tunables carry the documented defaults of the service; the builder
//! exists for call sites that only want to override one or two of them.
//! Loading these values from a file is the deployment layer's job, not the
//! tracker's.

use crate::models::{ConstantAccelerationModel, ConstantVelocityModel, MotionModel};

/// Which motion model newly created tracks are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Position ⊕ velocity, state dimension 6.
    ConstantVelocity,
    /// Position ⊕ velocity ⊕ acceleration, state dimension 9.
    ConstantAcceleration,
}

/// Noise and initial-uncertainty parameters of the cubature filter.
#[derive(Debug, Clone)]
pub struct KalmanConfig {
    /// σ of the white acceleration noise driving the CV model (default: 0.1)
    pub cv_process_noise_std: f64,
    /// σ of the white jerk noise driving the CA model (default: 1.0)
    pub ca_process_noise_std: f64,
    /// σ of the position observation noise, R = σ²·I₃ (default: 2.0)
    pub measurement_noise_std: f64,
    /// Initial position variance per axis (default: 10.0)
    pub initial_position_uncertainty: f64,
    /// Initial velocity variance per axis (default: 100.0)
    pub initial_velocity_uncertainty: f64,
    /// Initial acceleration variance per axis, CA model only (default: 10.0)
    pub initial_acceleration_uncertainty: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            cv_process_noise_std: 0.1,
            ca_process_noise_std: 1.0,
            measurement_noise_std: 2.0,
            initial_position_uncertainty: 10.0,
            initial_velocity_uncertainty: 100.0,
            initial_acceleration_uncertainty: 10.0,
        }
    }
}

/// Configuration for the whole tracking service.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Worker tick period in milliseconds (default: 100)
    pub worker_interval_ms: u64,
    /// TCP port of the health probe (default: 8899)
    pub health_port: u16,
    /// Filter noise parameters
    pub kalman: KalmanConfig,
    /// Strict upper bound for track↔measurement association, metres (default: 10.0)
    pub association_gate_distance: f64,
    /// Duplicate-suppression and clustering radius for births, metres (default: 5.0)
    pub new_track_gate_distance: f64,
    /// Hits required before a track is confirmed and published (default: 3)
    pub confirmation_hits: u32,
    /// Exclusive miss threshold; `misses > this` retires the track (default: 5)
    pub max_misses_to_delete: u32,
    /// Motion model for newly spawned tracks (default: constant acceleration)
    pub new_track_model: ModelKind,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            worker_interval_ms: 100,
            health_port: 8899,
            kalman: KalmanConfig::default(),
            association_gate_distance: 10.0,
            new_track_gate_distance: 5.0,
            confirmation_hits: 3,
            max_misses_to_delete: 5,
            new_track_model: ModelKind::ConstantAcceleration,
        }
    }
}

impl TrackerConfig {
    /// Create a configuration builder.
    pub fn builder() -> TrackerConfigBuilder {
        TrackerConfigBuilder::default()
    }

    /// Instantiate the configured motion model for a new track.
    pub fn make_model(&self) -> Box<dyn MotionModel> {
        match self.new_track_model {
            ModelKind::ConstantVelocity => Box::new(ConstantVelocityModel::new(&self.kalman)),
            ModelKind::ConstantAcceleration => {
                Box::new(ConstantAccelerationModel::new(&self.kalman))
            }
        }
    }
}

/// Builder for [`TrackerConfig`].
#[derive(Debug, Default)]
pub struct TrackerConfigBuilder {
    config: TrackerConfig,
}

impl TrackerConfigBuilder {
    /// Set the worker tick period in milliseconds (floored at 1).
    pub fn worker_interval_ms(mut self, interval: u64) -> Self {
        self.config.worker_interval_ms = interval.max(1);
        self
    }

    /// Set the health probe port.
    pub fn health_port(mut self, port: u16) -> Self {
        self.config.health_port = port;
        self
    }

    /// Replace the filter noise parameters.
    pub fn kalman(mut self, kalman: KalmanConfig) -> Self {
        self.config.kalman = kalman;
        self
    }

    /// Set the association gate distance in metres.
    pub fn association_gate_distance(mut self, metres: f64) -> Self {
        self.config.association_gate_distance = metres.max(0.0);
        self
    }

    /// Set the new-track gate distance in metres.
    pub fn new_track_gate_distance(mut self, metres: f64) -> Self {
        self.config.new_track_gate_distance = metres.max(0.0);
        self
    }

    /// Set the confirmation hit count (floored at 1).
    pub fn confirmation_hits(mut self, hits: u32) -> Self {
        self.config.confirmation_hits = hits.max(1);
        self
    }

    /// Set the exclusive miss threshold for track deletion.
    pub fn max_misses_to_delete(mut self, misses: u32) -> Self {
        self.config.max_misses_to_delete = misses;
        self
    }

    /// Set the motion model used for new tracks.
    pub fn new_track_model(mut self, kind: ModelKind) -> Self {
        self.config.new_track_model = kind;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TrackerConfig {
        self.config
    }
}
