//! Motion models: deterministic state transition plus the noise statistics
//! the filter needs around it.
//!
//! A model is a stateless descriptor. The filter owns the state vector and
//! covariance; the model only says how they evolve and what part of them an
//! observer sees. All current variants observe the leading three state
//! components (position).

mod constant_acceleration;
mod constant_velocity;

pub use constant_acceleration::ConstantAccelerationModel;
pub use constant_velocity::ConstantVelocityModel;

use nalgebra::{DMatrix, DVector, Vector3};

/// Capability set of a motion model.
///
/// Implementations must keep `predict` purely deterministic (process noise
/// enters through `process_noise`, never through the transition itself) and
/// must return a symmetric `process_noise` matrix.
pub trait MotionModel: Send + Sync {
    /// Dimension of the state vector.
    fn state_dim(&self) -> usize;

    /// Dimension of the measurement vector. Fixed at 3 for all current
    /// variants.
    fn measurement_dim(&self) -> usize {
        3
    }

    /// Propagate a state vector forward by `dt` seconds.
    fn predict(&self, x: &DVector<f64>, dt: f64) -> DVector<f64>;

    /// Extract the observed quantity (position) from a state vector.
    fn observe(&self, x: &DVector<f64>) -> Vector3<f64>;

    /// Process-noise covariance Q(dt), symmetric positive-semidefinite,
    /// `state_dim × state_dim`.
    fn process_noise(&self, dt: f64) -> DMatrix<f64>;

    /// Initial state covariance P₀, symmetric positive-definite,
    /// `state_dim × state_dim`.
    fn initial_covariance(&self) -> DMatrix<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KalmanConfig;

    fn symmetry_error(m: &DMatrix<f64>) -> f64 {
        (m - m.transpose()).abs().max()
    }

    #[test]
    fn test_process_noise_symmetry() {
        let config = KalmanConfig::default();
        let models: Vec<Box<dyn MotionModel>> = vec![
            Box::new(ConstantVelocityModel::new(&config)),
            Box::new(ConstantAccelerationModel::new(&config)),
        ];

        for model in &models {
            for &dt in &[0.05, 0.1, 0.5, 2.0] {
                let q = model.process_noise(dt);
                assert_eq!(q.nrows(), model.state_dim());
                assert_eq!(q.ncols(), model.state_dim());
                assert!(
                    symmetry_error(&q) < 1e-12,
                    "Q must be symmetric for dt={}",
                    dt
                );
            }
        }
    }

    #[test]
    fn test_initial_covariance_is_positive_definite() {
        let config = KalmanConfig::default();
        let models: Vec<Box<dyn MotionModel>> = vec![
            Box::new(ConstantVelocityModel::new(&config)),
            Box::new(ConstantAccelerationModel::new(&config)),
        ];

        for model in &models {
            let p0 = model.initial_covariance();
            assert!(
                p0.clone().cholesky().is_some(),
                "P0 must be positive-definite"
            );
        }
    }
}
