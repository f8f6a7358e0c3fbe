//! Constant-velocity motion model.
//!
//! State layout: `[px, py, pz, vx, vy, vz]`.
//!
//! Transition: `p' = p + v·dt`, `v' = v`.
//!
//! Process noise comes from a discrete white-noise-acceleration model,
//! `Q(dt) = G·Gᵀ·σ²` with
//!
//! ```text
//!     ┌ ½·dt²·I₃ ┐
//! G = │          │
//!     └   dt·I₃  ┘
//! ```

use nalgebra::{DMatrix, DVector, Vector3};

use super::MotionModel;
use crate::config::KalmanConfig;

const STATE_DIM: usize = 6;

/// Constant-velocity model in 3-D space.
#[derive(Debug, Clone)]
pub struct ConstantVelocityModel {
    process_noise_std: f64,
    initial_position_uncertainty: f64,
    initial_velocity_uncertainty: f64,
}

impl ConstantVelocityModel {
    /// Build the model from filter configuration.
    pub fn new(config: &KalmanConfig) -> Self {
        Self {
            process_noise_std: config.cv_process_noise_std,
            initial_position_uncertainty: config.initial_position_uncertainty,
            initial_velocity_uncertainty: config.initial_velocity_uncertainty,
        }
    }
}

impl MotionModel for ConstantVelocityModel {
    fn state_dim(&self) -> usize {
        STATE_DIM
    }

    fn predict(&self, x: &DVector<f64>, dt: f64) -> DVector<f64> {
        let mut next = x.clone();
        for i in 0..3 {
            next[i] += x[i + 3] * dt;
        }
        next
    }

    fn observe(&self, x: &DVector<f64>) -> Vector3<f64> {
        Vector3::new(x[0], x[1], x[2])
    }

    fn process_noise(&self, dt: f64) -> DMatrix<f64> {
        let q = self.process_noise_std * self.process_noise_std;

        let mut g = DMatrix::zeros(STATE_DIM, 3);
        for i in 0..3 {
            g[(i, i)] = 0.5 * dt * dt;
            g[(i + 3, i)] = dt;
        }

        &g * g.transpose() * q
    }

    fn initial_covariance(&self) -> DMatrix<f64> {
        let mut p = DMatrix::identity(STATE_DIM, STATE_DIM);
        for i in 0..3 {
            p[(i, i)] *= self.initial_position_uncertainty;
            p[(i + 3, i + 3)] *= self.initial_velocity_uncertainty;
        }
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ConstantVelocityModel {
        ConstantVelocityModel::new(&KalmanConfig::default())
    }

    #[test]
    fn test_zero_dt_is_identity() {
        let model = model();
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let next = model.predict(&x, 0.0);
        assert_eq!(next, x);
    }

    #[test]
    fn test_observation_commutes_with_transition() {
        // observe(predict(x, dt)) = observe(x) + v·dt
        let model = model();
        let x = DVector::from_vec(vec![10.0, -5.0, 2.0, 1.0, 2.0, -0.5]);
        let dt = 0.7;

        let observed = model.observe(&model.predict(&x, dt));
        let expected = model.observe(&x) + Vector3::new(x[3], x[4], x[5]) * dt;

        assert!((observed - expected).norm() < 1e-12);
    }

    #[test]
    fn test_velocity_is_preserved() {
        let model = model();
        let x = DVector::from_vec(vec![0.0, 0.0, 0.0, 3.0, -1.0, 0.25]);
        let next = model.predict(&x, 1.3);
        for i in 3..6 {
            assert!((next[i] - x[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_process_noise_scales_with_dt() {
        let model = model();
        let q_small = model.process_noise(0.1);
        let q_large = model.process_noise(1.0);
        // Velocity block grows as dt².
        assert!(q_large[(3, 3)] > q_small[(3, 3)]);
        assert!((q_large[(3, 3)] / q_small[(3, 3)] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_initial_covariance_blocks() {
        let model = model();
        let p0 = model.initial_covariance();
        assert!((p0[(0, 0)] - 10.0).abs() < 1e-12);
        assert!((p0[(3, 3)] - 100.0).abs() < 1e-12);
        assert!(p0[(0, 3)].abs() < 1e-12);
    }
}
