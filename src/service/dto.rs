//! Wire types for the measurement ingest and the published track report.
//!
//! Kept separate from the domain types: the wire casing (`ObserverId`,
//! `Timestamp`, `Position`) belongs to the transport contract, not to the
//! tracker.

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::measurement::Measurement;
use crate::tracking::TrackSnapshot;

/// A 3-D point on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionMsg {
    /// X component in metres.
    pub x: f64,
    /// Y component in metres.
    pub y: f64,
    /// Z component in metres.
    pub z: f64,
}

impl From<Vector3<f64>> for PositionMsg {
    fn from(v: Vector3<f64>) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// Inbound measurement message.
///
/// `ObserverId` is required; a message without it fails deserialization and
/// is dropped at the ingest boundary. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementMsg {
    /// Identifier of the reporting observer.
    #[serde(rename = "ObserverId")]
    pub observer_id: i32,
    /// Observation time in seconds.
    #[serde(rename = "Timestamp")]
    pub timestamp: f64,
    /// Observed position.
    #[serde(rename = "Position")]
    pub position: PositionMsg,
}

impl From<MeasurementMsg> for Measurement {
    fn from(msg: MeasurementMsg) -> Self {
        Measurement::new(
            Vector3::new(msg.position.x, msg.position.y, msg.position.z),
            msg.timestamp,
            msg.observer_id,
        )
    }
}

/// One confirmed track inside a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackMsg {
    /// Track identifier.
    pub id: u64,
    /// Update count.
    pub hits: u32,
    /// Estimated position.
    pub position: PositionMsg,
    /// Estimated velocity (state components 3..6 for every model).
    pub velocity: PositionMsg,
    /// Predicted future observed positions.
    pub future_trajectory: Vec<PositionMsg>,
}

impl From<&TrackSnapshot> for TrackMsg {
    fn from(snapshot: &TrackSnapshot) -> Self {
        Self {
            id: snapshot.id,
            hits: snapshot.hits,
            position: snapshot.position.into(),
            velocity: snapshot.velocity.into(),
            future_trajectory: snapshot
                .future_trajectory
                .iter()
                .map(|p| PositionMsg::from(*p))
                .collect(),
        }
    }
}

/// Outbound track report, published once per tick when at least one
/// confirmed track exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackReport {
    /// Report time, ISO-8601 UTC.
    pub timestamp: DateTime<Utc>,
    /// All confirmed tracks.
    pub tracks: Vec<TrackMsg>,
}

impl TrackReport {
    /// Assemble a report from confirmed-track snapshots.
    pub fn new(timestamp: DateTime<Utc>, snapshots: &[TrackSnapshot]) -> Self {
        Self {
            timestamp,
            tracks: snapshots.iter().map(TrackMsg::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_round_trips_bit_equal() {
        let raw = r#"{"ObserverId":4,"Timestamp":12.375,"Position":{"x":1.5,"y":-2.25,"z":0.0}}"#;
        let msg: MeasurementMsg = serde_json::from_str(raw).unwrap();
        let encoded = serde_json::to_string(&msg).unwrap();
        let again: MeasurementMsg = serde_json::from_str(&encoded).unwrap();

        assert_eq!(msg, again);
        assert_eq!(msg.timestamp.to_bits(), again.timestamp.to_bits());
        assert_eq!(msg.position.x.to_bits(), again.position.x.to_bits());
    }

    #[test]
    fn test_missing_observer_id_is_rejected() {
        let raw = r#"{"Timestamp":1.0,"Position":{"x":0.0,"y":0.0,"z":0.0}}"#;
        assert!(serde_json::from_str::<MeasurementMsg>(raw).is_err());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let raw = r#"{"ObserverId":1,"Timestamp":1.0,"Position":{"x":0.0,"y":0.0,"z":0.0},"Quality":0.9}"#;
        let msg: MeasurementMsg = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.observer_id, 1);
    }

    #[test]
    fn test_wrong_field_type_is_rejected() {
        let raw = r#"{"ObserverId":"four","Timestamp":1.0,"Position":{"x":0.0,"y":0.0,"z":0.0}}"#;
        assert!(serde_json::from_str::<MeasurementMsg>(raw).is_err());
    }

    #[test]
    fn test_report_shape() {
        let snapshot = TrackSnapshot {
            id: 2,
            hits: 5,
            position: Vector3::new(1.0, 2.0, 3.0),
            velocity: Vector3::new(0.1, 0.2, 0.3),
            future_trajectory: vec![Vector3::new(1.05, 2.1, 3.15)],
        };
        let report = TrackReport::new(Utc::now(), &[snapshot]);
        let value = serde_json::to_value(&report).unwrap();

        assert!(value["timestamp"].is_string());
        assert_eq!(value["tracks"][0]["id"], 2);
        assert_eq!(value["tracks"][0]["hits"], 5);
        assert_eq!(value["tracks"][0]["position"]["x"], 1.0);
        assert_eq!(value["tracks"][0]["velocity"]["z"], 0.3);
        assert_eq!(value["tracks"][0]["future_trajectory"][0]["y"], 2.1);
    }
}
