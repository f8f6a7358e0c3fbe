//! A single tracked target: state estimate, covariance, lifecycle counters.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

use super::cubature::{CubatureFilter, FilterError};
use crate::config::TrackerConfig;
use crate::measurement::Measurement;
use crate::models::MotionModel;

/// Kinematic state and bookkeeping for one target.
///
/// A track is created from a residual measurement by the manager, mutated
/// only by the manager (predict / update / miss), and retired by the manager
/// once its consecutive miss count exceeds the configured threshold.
pub struct Track {
    id: u64,
    model: Box<dyn MotionModel>,
    /// State estimate; the leading three components are always position.
    x: DVector<f64>,
    /// State covariance, symmetric positive-definite.
    p: DMatrix<f64>,
    /// Measurement-noise covariance, fixed at creation.
    r: Matrix3<f64>,
    last_update_time: f64,
    age: u32,
    hits: u32,
    misses: u32,
    confirmation_hits: u32,
    max_misses_to_delete: u32,
}

impl Track {
    /// Initialize a track from its first measurement.
    ///
    /// Position comes from the measurement, the remaining state components
    /// start at zero, and the covariance is the model's P₀. The creating
    /// observation counts as the first hit.
    pub fn new(
        measurement: &Measurement,
        id: u64,
        model: Box<dyn MotionModel>,
        config: &TrackerConfig,
    ) -> Self {
        let n = model.state_dim();
        let mut x = DVector::zeros(n);
        for i in 0..3 {
            x[i] = measurement.position[i];
        }
        let p = model.initial_covariance();

        let noise_std = config.kalman.measurement_noise_std;
        let r = Matrix3::identity() * noise_std * noise_std;

        tracing::debug!(track_id = id, "track created");

        Self {
            id,
            model,
            x,
            p,
            r,
            last_update_time: measurement.timestamp,
            age: 0,
            hits: 1,
            misses: 0,
            confirmation_hits: config.confirmation_hits,
            max_misses_to_delete: config.max_misses_to_delete,
        }
    }

    /// Propagate the track forward by `dt` seconds. A non-positive `dt` is a
    /// no-op.
    pub fn predict(&mut self, dt: f64) -> Result<(), FilterError> {
        if dt <= 0.0 {
            return Ok(());
        }
        CubatureFilter::predict(&mut self.x, &mut self.p, self.model.as_ref(), dt)?;
        self.age += 1;
        Ok(())
    }

    /// Fold a measurement into the track and refresh its lifecycle counters.
    pub fn update(&mut self, measurement: &Measurement) -> Result<(), FilterError> {
        CubatureFilter::update(
            &mut self.x,
            &mut self.p,
            self.model.as_ref(),
            &measurement.position,
            &self.r,
        )?;
        self.hits += 1;
        self.misses = 0;
        self.last_update_time = measurement.timestamp;
        Ok(())
    }

    /// Roll the deterministic transition forward on a copy of the state and
    /// emit the observed position after each step.
    ///
    /// Returns `floor(horizon / step)` samples; empty when either argument is
    /// non-positive. The track itself is not mutated.
    pub fn predict_future_trajectory(&self, horizon: f64, step: f64) -> Vec<Vector3<f64>> {
        if horizon <= 0.0 || step <= 0.0 {
            return Vec::new();
        }

        let steps = (horizon / step + 1e-9).floor() as usize;
        let mut trajectory = Vec::with_capacity(steps);
        let mut future = self.x.clone();
        for _ in 0..steps {
            future = self.model.predict(&future, step);
            trajectory.push(self.model.observe(&future));
        }
        trajectory
    }

    /// Register one unmatched association cycle.
    pub fn increment_misses(&mut self) {
        self.misses += 1;
        tracing::debug!(track_id = self.id, misses = self.misses, "track missed");
    }

    /// A track is confirmed once its hit count reaches the configured
    /// threshold; only confirmed tracks are published.
    pub fn is_confirmed(&self) -> bool {
        self.hits >= self.confirmation_hits
    }

    /// A track is lost once its consecutive miss count exceeds the configured
    /// threshold.
    pub fn is_lost(&self) -> bool {
        self.misses > self.max_misses_to_delete
    }

    /// Track identifier, unique across the manager's lifetime.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current state estimate.
    pub fn state(&self) -> &DVector<f64> {
        &self.x
    }

    /// Current state covariance.
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.p
    }

    /// Estimated position (state components 0..3).
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x[0], self.x[1], self.x[2])
    }

    /// Estimated velocity (state components 3..6, valid for both models).
    pub fn velocity(&self) -> Vector3<f64> {
        Vector3::new(self.x[3], self.x[4], self.x[5])
    }

    /// Count of successful updates, including the creating observation.
    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// Count of consecutive unmatched association cycles.
    pub fn misses(&self) -> u32 {
        self.misses
    }

    /// Count of predict steps applied.
    pub fn age(&self) -> u32 {
        self.age
    }

    /// Timestamp of the most recent update, or of creation.
    pub fn last_update_time(&self) -> f64 {
        self.last_update_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_track(id: u64) -> Track {
        let config = TrackerConfig::default();
        let measurement = Measurement::new(Vector3::new(10.0, 20.0, 0.0), 1.0, 1);
        Track::new(&measurement, id, config.make_model(), &config)
    }

    #[test]
    fn test_initial_state() {
        let track = make_track(3);

        assert_eq!(track.id(), 3);
        assert_eq!(track.hits(), 1);
        assert_eq!(track.misses(), 0);
        assert_eq!(track.age(), 0);
        assert_eq!(track.state().len(), 9);
        assert_eq!(track.position(), Vector3::new(10.0, 20.0, 0.0));
        assert!(track.velocity().norm() < 1e-12);
        assert!((track.last_update_time() - 1.0).abs() < 1e-12);
        assert!(!track.is_confirmed());
        assert!(!track.is_lost());
    }

    #[test]
    fn test_predict_ignores_non_positive_dt() {
        let mut track = make_track(0);
        let before = track.state().clone();

        track.predict(0.0).unwrap();
        track.predict(-0.5).unwrap();

        assert_eq!(track.state(), &before);
        assert_eq!(track.age(), 0);
    }

    #[test]
    fn test_update_refreshes_counters() {
        let mut track = make_track(0);
        let m = Measurement::new(Vector3::new(10.5, 20.0, 0.0), 2.0, 1);

        track.increment_misses();
        track.update(&m).unwrap();

        assert_eq!(track.hits(), 2);
        assert_eq!(track.misses(), 0);
        assert!((track.last_update_time() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_confirmation_threshold() {
        let mut track = make_track(0);
        // Default confirmation_hits = 3; creation counts as the first hit.
        let m = Measurement::new(Vector3::new(10.0, 20.0, 0.0), 2.0, 1);
        track.update(&m).unwrap();
        assert!(!track.is_confirmed());
        track.update(&m).unwrap();
        assert!(track.is_confirmed());
    }

    #[test]
    fn test_lost_threshold_is_exclusive() {
        let mut track = make_track(0);
        // Default max_misses_to_delete = 5.
        for _ in 0..5 {
            track.increment_misses();
        }
        assert!(!track.is_lost());
        track.increment_misses();
        assert!(track.is_lost());
    }

    #[test]
    fn test_future_trajectory_sample_count() {
        let track = make_track(0);

        assert_eq!(track.predict_future_trajectory(2.0, 0.5).len(), 4);
        assert_eq!(track.predict_future_trajectory(1.0, 0.3).len(), 3);
        assert!(track.predict_future_trajectory(0.0, 0.5).is_empty());
        assert!(track.predict_future_trajectory(2.0, 0.0).is_empty());
        assert!(track.predict_future_trajectory(-1.0, 0.5).is_empty());
    }

    #[test]
    fn test_future_trajectory_does_not_mutate_track() {
        let mut track = make_track(0);
        // Give the track some velocity so the rollout actually moves.
        let m = Measurement::new(Vector3::new(12.0, 20.0, 0.0), 2.0, 1);
        track.predict(1.0).unwrap();
        track.update(&m).unwrap();

        let before = track.state().clone();
        let trajectory = track.predict_future_trajectory(2.0, 0.5);

        assert_eq!(track.state(), &before);
        assert_eq!(trajectory.len(), 4);
        // A moving track's rollout must move away from the current position.
        assert!((trajectory[3] - track.position()).norm() > 0.0);
    }
}
