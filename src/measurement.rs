//! Position observations as consumed by the tracking pipeline.

use nalgebra::Vector3;

/// A single position observation from one observer.
///
/// Immutable once constructed; the manager consumes it during one processing
/// cycle and discards it.
#[derive(Debug, Clone)]
pub struct Measurement {
    /// Observed position in metres.
    pub position: Vector3<f64>,
    /// Observation time in seconds.
    pub timestamp: f64,
    /// Identifier of the reporting observer.
    pub observer_id: i32,
}

impl Measurement {
    /// Create a new measurement.
    pub fn new(position: Vector3<f64>, timestamp: f64, observer_id: i32) -> Self {
        Self {
            position,
            timestamp,
            observer_id,
        }
    }

    /// Euclidean distance from this observation to a point.
    pub fn distance_to(&self, point: &Vector3<f64>) -> f64 {
        (self.position - point).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let m = Measurement::new(Vector3::new(3.0, 4.0, 0.0), 1.0, 7);
        let d = m.distance_to(&Vector3::zeros());
        assert!((d - 5.0).abs() < 1e-12);
    }
}
