//! Cubature Kalman filter core.
//!
//! Implements the third-degree spherical-radial cubature rule: 2n
//! deterministic points drawn from the Gaussian (x, P) are pushed through the
//! nonlinear transition / observation functions, and mean and covariance are
//! recovered from the transformed set with uniform 1/2n weights.
//!
//! The filter is stateless; callers own x and P and pass them in by mutable
//! reference, the way each [`crate::tracking::Track`] does.

use nalgebra::{DMatrix, DVector, Dyn, Matrix3, OMatrix, Vector3, U3};
use thiserror::Error;

use crate::models::MotionModel;

/// Diagonal jitter added when repairing a covariance that lost
/// positive-definiteness to roundoff.
const COVARIANCE_JITTER: f64 = 1e-9;

/// Numeric degeneracy inside the filter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    /// The state covariance is not positive-definite even after
    /// re-symmetrization and jitter. The owning track must be retired.
    #[error("state covariance lost positive-definiteness")]
    CovarianceNotPositiveDefinite,

    /// The innovation covariance could not be factorized. With R ≻ 0 this is
    /// unreachable in practice; treated like covariance degeneracy.
    #[error("innovation covariance is singular")]
    SingularInnovation,
}

/// The cubature predict / update steps.
///
/// Both operations mutate x and P in place and report numeric degeneracy
/// instead of propagating a broken covariance.
pub struct CubatureFilter;

impl CubatureFilter {
    /// Time update: propagate (x, P) forward by `dt` seconds through the
    /// model's deterministic transition, then add process noise.
    pub fn predict(
        x: &mut DVector<f64>,
        p: &mut DMatrix<f64>,
        model: &dyn MotionModel,
        dt: f64,
    ) -> Result<(), FilterError> {
        let n = model.state_dim();
        let factor = cholesky_repair(p)?;

        let mut points = cubature_points(x, &factor);
        for point in points.iter_mut() {
            *point = model.predict(point, dt);
        }

        let weight = 1.0 / (2 * n) as f64;
        let mut mean = DVector::zeros(n);
        for point in &points {
            mean += point;
        }
        mean *= weight;

        let mut cov = model.process_noise(dt);
        for point in &points {
            let diff = point - &mean;
            cov += (&diff * diff.transpose()) * weight;
        }

        *x = mean;
        *p = cov;
        Ok(())
    }

    /// Measurement update: fold the 3-vector observation `z` with noise
    /// covariance `r` into (x, P).
    ///
    /// The Kalman gain is obtained from a Cholesky solve of the innovation
    /// covariance; the inverse is never materialized.
    pub fn update(
        x: &mut DVector<f64>,
        p: &mut DMatrix<f64>,
        model: &dyn MotionModel,
        z: &Vector3<f64>,
        r: &Matrix3<f64>,
    ) -> Result<(), FilterError> {
        let n = model.state_dim();
        let factor = cholesky_repair(p)?;

        let points = cubature_points(x, &factor);
        let z_points: Vec<Vector3<f64>> = points.iter().map(|pt| model.observe(pt)).collect();

        let weight = 1.0 / (2 * n) as f64;
        let mut z_pred = Vector3::zeros();
        for z_point in &z_points {
            z_pred += z_point;
        }
        z_pred *= weight;

        let mut pzz: Matrix3<f64> = *r;
        let mut pxz = OMatrix::<f64, Dyn, U3>::zeros(n);
        for (point, z_point) in points.iter().zip(&z_points) {
            let z_diff = z_point - z_pred;
            let x_diff = point - &*x;
            pzz += z_diff * z_diff.transpose() * weight;
            pxz += x_diff * z_diff.transpose() * weight;
        }

        // K = Pxz·Pzz⁻¹, via the solve Pzz·Kᵀ = Pxzᵀ.
        let chol = pzz.cholesky().ok_or(FilterError::SingularInnovation)?;
        let gain = chol.solve(&pxz.transpose()).transpose();

        *x += &gain * (z - z_pred);
        *p -= &gain * pzz * gain.transpose();
        Ok(())
    }
}

/// Lower-triangular Cholesky factor of P.
///
/// On failure, P is re-symmetrized as ½(P + Pᵀ), a small diagonal jitter is
/// added, and the factorization is retried once; the repaired matrix is
/// written back so the caller keeps a consistent covariance.
fn cholesky_repair(p: &mut DMatrix<f64>) -> Result<DMatrix<f64>, FilterError> {
    if let Some(chol) = p.clone().cholesky() {
        return Ok(chol.l());
    }

    let n = p.nrows();
    let mut repaired = (p.clone() + p.transpose()) * 0.5;
    for i in 0..n {
        repaired[(i, i)] += COVARIANCE_JITTER;
    }

    match repaired.clone().cholesky() {
        Some(chol) => {
            *p = repaired;
            Ok(chol.l())
        }
        None => Err(FilterError::CovarianceNotPositiveDefinite),
    }
}

/// The 2n cubature points of the Gaussian (x, L·Lᵀ):
/// xᵢ = x ± √n·L·eᵢ.
fn cubature_points(x: &DVector<f64>, factor: &DMatrix<f64>) -> Vec<DVector<f64>> {
    let n = x.len();
    let scale = (n as f64).sqrt();

    let mut points = Vec::with_capacity(2 * n);
    for i in 0..n {
        points.push(x + factor.column(i) * scale);
    }
    for i in 0..n {
        points.push(x - factor.column(i) * scale);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KalmanConfig;
    use crate::models::{ConstantVelocityModel, MotionModel};

    fn cv_model() -> ConstantVelocityModel {
        ConstantVelocityModel::new(&KalmanConfig::default())
    }

    fn test_covariance(n: usize) -> DMatrix<f64> {
        // Diagonally dominant symmetric matrix, comfortably PD.
        let mut p = DMatrix::identity(n, n) * 4.0;
        for i in 0..n - 1 {
            p[(i, i + 1)] = 0.5;
            p[(i + 1, i)] = 0.5;
        }
        p
    }

    #[test]
    fn test_cubature_points_reconstruct_moments() {
        let n = 6;
        let x = DVector::from_vec(vec![1.0, -2.0, 3.0, 0.5, 0.0, -1.5]);
        let mut p = test_covariance(n);
        let expected_p = p.clone();

        let factor = cholesky_repair(&mut p).unwrap();
        let points = cubature_points(&x, &factor);
        assert_eq!(points.len(), 2 * n);

        let weight = 1.0 / (2 * n) as f64;
        let mut mean = DVector::zeros(n);
        for point in &points {
            mean += point;
        }
        mean *= weight;
        assert!((&mean - &x).norm() < 1e-10, "sample mean must equal x");

        let mut cov = DMatrix::zeros(n, n);
        for point in &points {
            let diff = point - &mean;
            cov += (&diff * diff.transpose()) * weight;
        }
        assert!(
            (&cov - &expected_p).abs().max() < 1e-10,
            "sample covariance must equal P"
        );
    }

    #[test]
    fn test_predict_is_exact_for_linear_model() {
        let model = cv_model();
        let mut x = DVector::from_vec(vec![0.0, 0.0, 0.0, 2.0, -1.0, 0.5]);
        let mut p = test_covariance(6);
        let dt = 0.4;

        let expected = model.predict(&x, dt);
        CubatureFilter::predict(&mut x, &mut p, &model, dt).unwrap();

        assert!((&x - &expected).norm() < 1e-9);
        // Covariance stays symmetric.
        assert!((&p - p.transpose()).abs().max() < 1e-9);
    }

    #[test]
    fn test_update_with_vanishing_noise_pins_position() {
        let model = cv_model();
        let mut x = DVector::from_vec(vec![5.0, -3.0, 1.0, 0.2, 0.0, 0.0]);
        let mut p = test_covariance(6);

        let z = model.observe(&x);
        let r = Matrix3::identity() * 1e-12;
        CubatureFilter::update(&mut x, &mut p, &model, &z, &r).unwrap();

        // Measurement on the observation manifold: posterior position equals
        // it and the position covariance collapses.
        assert!((model.observe(&x) - z).norm() < 1e-6);
        for i in 0..3 {
            assert!(p[(i, i)].abs() < 1e-6, "position variance must collapse");
        }
    }

    #[test]
    fn test_update_pulls_state_toward_measurement() {
        let model = cv_model();
        let mut x = DVector::from_vec(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let mut p = test_covariance(6);
        let z = Vector3::new(4.0, 0.0, 0.0);
        let r = Matrix3::identity() * 4.0;

        CubatureFilter::update(&mut x, &mut p, &model, &z, &r).unwrap();

        assert!(x[0] > 0.0 && x[0] < 4.0, "posterior lies between prior and z");
    }

    #[test]
    fn test_repair_recovers_from_roundoff() {
        let mut p = DMatrix::identity(6, 6);
        p[(0, 0)] = -1e-12; // roundoff-scale loss of definiteness

        let factor = cholesky_repair(&mut p);
        assert!(factor.is_ok());
        // The repaired covariance was written back and is now factorizable.
        assert!(p.clone().cholesky().is_some());
    }

    #[test]
    fn test_repair_gives_up_on_indefinite_covariance() {
        let mut p = DMatrix::identity(6, 6);
        p[(0, 0)] = -1.0;

        assert_eq!(
            cholesky_repair(&mut p).unwrap_err(),
            FilterError::CovarianceNotPositiveDefinite
        );
    }
}
