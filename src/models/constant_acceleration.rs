//! Constant-acceleration motion model.
//!
//! State layout: `[p, v, a]`, each a 3-vector.
//!
//! Transition: `p' = p + v·dt + ½·a·dt²`, `v' = v + a·dt`, `a' = a`.
//!
//! Process noise is the continuous white-noise-jerk Q built block-wise in dt
//! (dt⁵/20 on positions, dt⁴/8 on position–velocity, dt³/3 on velocities,
//! dt³/6 on position–acceleration, dt²/2 on velocity–acceleration, dt on
//! accelerations), scaled by σ²_jerk.

use nalgebra::{DMatrix, DVector, Vector3};

use super::MotionModel;
use crate::config::KalmanConfig;

const STATE_DIM: usize = 9;

/// Constant-acceleration model in 3-D space.
#[derive(Debug, Clone)]
pub struct ConstantAccelerationModel {
    process_noise_std: f64,
    initial_position_uncertainty: f64,
    initial_velocity_uncertainty: f64,
    initial_acceleration_uncertainty: f64,
}

impl ConstantAccelerationModel {
    /// Build the model from filter configuration.
    pub fn new(config: &KalmanConfig) -> Self {
        Self {
            process_noise_std: config.ca_process_noise_std,
            initial_position_uncertainty: config.initial_position_uncertainty,
            initial_velocity_uncertainty: config.initial_velocity_uncertainty,
            initial_acceleration_uncertainty: config.initial_acceleration_uncertainty,
        }
    }
}

impl MotionModel for ConstantAccelerationModel {
    fn state_dim(&self) -> usize {
        STATE_DIM
    }

    fn predict(&self, x: &DVector<f64>, dt: f64) -> DVector<f64> {
        let mut next = x.clone();
        let half_dt2 = 0.5 * dt * dt;
        for i in 0..3 {
            next[i] += x[i + 3] * dt + x[i + 6] * half_dt2;
            next[i + 3] += x[i + 6] * dt;
        }
        next
    }

    fn observe(&self, x: &DVector<f64>) -> Vector3<f64> {
        Vector3::new(x[0], x[1], x[2])
    }

    fn process_noise(&self, dt: f64) -> DMatrix<f64> {
        let q = self.process_noise_std * self.process_noise_std;

        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;
        let dt5 = dt4 * dt;

        let q_pp = dt5 / 20.0;
        let q_pv = dt4 / 8.0;
        let q_pa = dt3 / 6.0;
        let q_vv = dt3 / 3.0;
        let q_va = dt2 / 2.0;
        let q_aa = dt;

        let mut out = DMatrix::zeros(STATE_DIM, STATE_DIM);
        for i in 0..3 {
            out[(i, i)] = q_pp;
            out[(i + 3, i + 3)] = q_vv;
            out[(i + 6, i + 6)] = q_aa;

            out[(i, i + 3)] = q_pv;
            out[(i + 3, i)] = q_pv;
            out[(i, i + 6)] = q_pa;
            out[(i + 6, i)] = q_pa;
            out[(i + 3, i + 6)] = q_va;
            out[(i + 6, i + 3)] = q_va;
        }

        out * q
    }

    fn initial_covariance(&self) -> DMatrix<f64> {
        let mut p = DMatrix::identity(STATE_DIM, STATE_DIM);
        for i in 0..3 {
            p[(i, i)] *= self.initial_position_uncertainty;
            p[(i + 3, i + 3)] *= self.initial_velocity_uncertainty;
            p[(i + 6, i + 6)] *= self.initial_acceleration_uncertainty;
        }
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ConstantAccelerationModel {
        ConstantAccelerationModel::new(&KalmanConfig::default())
    }

    #[test]
    fn test_transition_kinematics() {
        let model = model();
        // p = 0, v = (1, 0, 0), a = (2, 0, 0)
        let mut state = vec![0.0; 9];
        state[3] = 1.0;
        state[6] = 2.0;
        let x = DVector::from_vec(state);

        let next = model.predict(&x, 2.0);

        // p' = 0 + 1·2 + ½·2·4 = 6, v' = 1 + 2·2 = 5, a' = 2
        assert!((next[0] - 6.0).abs() < 1e-12);
        assert!((next[3] - 5.0).abs() < 1e-12);
        assert!((next[6] - 2.0).abs() < 1e-12);
        // Other axes untouched.
        assert!(next[1].abs() < 1e-12);
        assert!(next[4].abs() < 1e-12);
    }

    #[test]
    fn test_observation_is_position() {
        let model = model();
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0]);
        assert_eq!(model.observe(&x), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_process_noise_block_ratios() {
        let model = model();
        let dt = 0.5;
        let q = model.process_noise(dt);
        let sigma_sq = 1.0; // default ca_process_noise_std = 1.0

        assert!((q[(0, 0)] - dt.powi(5) / 20.0 * sigma_sq).abs() < 1e-12);
        assert!((q[(0, 3)] - dt.powi(4) / 8.0 * sigma_sq).abs() < 1e-12);
        assert!((q[(3, 6)] - dt.powi(2) / 2.0 * sigma_sq).abs() < 1e-12);
        assert!((q[(6, 6)] - dt * sigma_sq).abs() < 1e-12);
    }

    #[test]
    fn test_initial_covariance_blocks() {
        let model = model();
        let p0 = model.initial_covariance();
        assert!((p0[(0, 0)] - 10.0).abs() < 1e-12);
        assert!((p0[(3, 3)] - 100.0).abs() < 1e-12);
        assert!((p0[(6, 6)] - 10.0).abs() < 1e-12);
    }
}
