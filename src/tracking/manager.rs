//! Multi-target bookkeeping.
//!
//! One processing cycle runs: gated nearest-neighbour association →
//! measurement updates → birth of new tracks from residual measurements
//! (with duplicate suppression and clustering) → miss management. Tracks are
//! always visited in ascending id order, so the externally observable output
//! is byte-identical across runs for identical input.

use std::collections::BTreeMap;

use nalgebra::Vector3;

use super::track::Track;
use crate::config::TrackerConfig;
use crate::measurement::Measurement;

/// Disjoint outcome sets of one association pass.
#[derive(Debug, Default)]
struct Association {
    /// (track id, measurement index) pairs committed inside the gate.
    matches: Vec<(u64, usize)>,
    /// Tracks that claimed nothing this cycle.
    unmatched_tracks: Vec<u64>,
    /// Measurement indices no track consumed.
    unmatched_measurements: Vec<usize>,
}

/// Published view of a confirmed track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    /// Track identifier.
    pub id: u64,
    /// Update count at snapshot time.
    pub hits: u32,
    /// Estimated position.
    pub position: Vector3<f64>,
    /// Estimated velocity.
    pub velocity: Vector3<f64>,
    /// Future observed positions from the deterministic rollout.
    pub future_trajectory: Vec<Vector3<f64>>,
}

/// Owner of all live tracks and of the shared processing timeline.
pub struct TrackManager {
    /// Live tracks, keyed and iterated by ascending id.
    tracks: BTreeMap<u64, Track>,
    /// Next id to assign; never reused, strictly increasing.
    next_track_id: u64,
    /// Timestamp of the most recent batch processed.
    last_process_time: Option<f64>,
    config: TrackerConfig,
}

impl TrackManager {
    /// Create an empty manager.
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: BTreeMap::new(),
            next_track_id: 0,
            last_process_time: None,
            config,
        }
    }

    /// Run one full processing cycle over a batch of measurements.
    ///
    /// The batch is expected in non-decreasing timestamp order (the worker
    /// stable-sorts before calling). An empty batch is a pure miss cycle:
    /// every track is unmatched and the timeline does not advance.
    pub fn process_measurements(&mut self, measurements: &[Measurement]) {
        if measurements.is_empty() {
            let all: Vec<u64> = self.tracks.keys().copied().collect();
            self.retire_unmatched(&all);
            return;
        }

        let association = self.associate(measurements);
        let updated_positions = self.update_matched(&association.matches, measurements);
        self.spawn_tracks(
            &association.unmatched_measurements,
            &updated_positions,
            measurements,
        );
        self.retire_unmatched(&association.unmatched_tracks);

        let latest = measurements
            .iter()
            .map(|m| m.timestamp)
            .fold(f64::NEG_INFINITY, f64::max);
        if self.last_process_time.map_or(true, |t| latest > t) {
            self.last_process_time = Some(latest);
        }

        tracing::debug!(
            matches = association.matches.len(),
            unmatched_tracks = association.unmatched_tracks.len(),
            unmatched_measurements = association.unmatched_measurements.len(),
            live_tracks = self.tracks.len(),
            "processing cycle complete"
        );
    }

    /// Predict every track forward to `timestamp` on the shared timeline.
    ///
    /// The first invocation only records the timestamp. A timestamp not
    /// ahead of the timeline is a no-op, so late arrivals never predict
    /// backwards and a repeated call with the same timestamp does nothing.
    pub fn predict_to(&mut self, timestamp: f64) {
        let Some(last) = self.last_process_time else {
            self.last_process_time = Some(timestamp);
            return;
        };

        let dt = timestamp - last;
        if dt <= 0.0 {
            return;
        }

        let mut degenerate = Vec::new();
        for (&id, track) in self.tracks.iter_mut() {
            if let Err(error) = track.predict(dt) {
                tracing::warn!(track_id = id, %error, "retiring track after filter degeneracy");
                degenerate.push(id);
            }
        }
        for id in degenerate {
            self.tracks.remove(&id);
        }

        self.last_process_time = Some(timestamp);
    }

    /// Views of all confirmed tracks, in ascending id order, each with a
    /// future-trajectory rollout over the given horizon.
    pub fn snapshot(&self, horizon: f64, step: f64) -> Vec<TrackSnapshot> {
        self.tracks
            .values()
            .filter(|track| track.is_confirmed())
            .map(|track| TrackSnapshot {
                id: track.id(),
                hits: track.hits(),
                position: track.position(),
                velocity: track.velocity(),
                future_trajectory: track.predict_future_trajectory(horizon, step),
            })
            .collect()
    }

    /// Number of live tracks, confirmed or not.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Number of confirmed tracks.
    pub fn confirmed_count(&self) -> usize {
        self.tracks.values().filter(|t| t.is_confirmed()).count()
    }

    /// Look up a live track by id.
    pub fn get_track(&self, id: u64) -> Option<&Track> {
        self.tracks.get(&id)
    }

    /// Iterate over all live tracks in ascending id order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Timestamp of the most recent batch processed, if any.
    pub fn last_process_time(&self) -> Option<f64> {
        self.last_process_time
    }

    // ------------------------------------------------------------------
    // Cycle phases
    // ------------------------------------------------------------------

    /// Gated nearest-neighbour association.
    ///
    /// Tracks claim measurements in ascending id order; each track's nearest
    /// unconsumed measurement is committed iff strictly inside the gate.
    /// Ties on distance resolve to the lower batch index because only a
    /// strictly smaller distance displaces the current candidate.
    fn associate(&self, measurements: &[Measurement]) -> Association {
        let mut association = Association::default();
        let mut consumed = vec![false; measurements.len()];

        for (&id, track) in &self.tracks {
            let predicted = track.position();

            let mut best: Option<(usize, f64)> = None;
            for (index, measurement) in measurements.iter().enumerate() {
                if consumed[index] {
                    continue;
                }
                let distance = measurement.distance_to(&predicted);
                if best.map_or(true, |(_, d)| distance < d) {
                    best = Some((index, distance));
                }
            }

            match best {
                Some((index, distance))
                    if distance < self.config.association_gate_distance =>
                {
                    consumed[index] = true;
                    association.matches.push((id, index));
                }
                _ => association.unmatched_tracks.push(id),
            }
        }

        association.unmatched_measurements =
            (0..measurements.len()).filter(|&i| !consumed[i]).collect();
        association
    }

    /// Update every matched track and collect the post-update positions used
    /// for duplicate suppression. Tracks whose filter degenerates are
    /// retired on the spot.
    fn update_matched(
        &mut self,
        matches: &[(u64, usize)],
        measurements: &[Measurement],
    ) -> Vec<Vector3<f64>> {
        let mut updated_positions = Vec::with_capacity(matches.len());

        for &(id, index) in matches {
            let Some(track) = self.tracks.get_mut(&id) else {
                continue;
            };
            match track.update(&measurements[index]) {
                Ok(()) => updated_positions.push(track.position()),
                Err(error) => {
                    tracing::warn!(track_id = id, %error, "retiring track after filter degeneracy");
                    self.tracks.remove(&id);
                }
            }
        }

        updated_positions
    }

    /// Create new tracks from residual measurements.
    ///
    /// A residual inside the new-track gate of a just-updated track is a
    /// duplicate detection of that target and is dropped. The remaining
    /// residuals are clustered in batch order against cluster seeds; exactly
    /// one track is created per cluster, from its seed.
    fn spawn_tracks(
        &mut self,
        unmatched_measurements: &[usize],
        updated_positions: &[Vector3<f64>],
        measurements: &[Measurement],
    ) {
        if unmatched_measurements.is_empty() {
            return;
        }
        let gate = self.config.new_track_gate_distance;

        let mut seeds: Vec<usize> = Vec::new();
        'candidates: for &index in unmatched_measurements {
            let position = measurements[index].position;

            for updated in updated_positions {
                if (position - updated).norm() < gate {
                    tracing::debug!(
                        measurement = index,
                        "suppressing duplicate of an updated track"
                    );
                    continue 'candidates;
                }
            }

            for &seed in &seeds {
                if (position - measurements[seed].position).norm() < gate {
                    continue 'candidates;
                }
            }
            seeds.push(index);
        }

        for &seed in &seeds {
            let id = self.next_track_id;
            self.next_track_id += 1;
            let track = Track::new(
                &measurements[seed],
                id,
                self.config.make_model(),
                &self.config,
            );
            self.tracks.insert(id, track);
        }
    }

    /// Increment misses on every unmatched track and retire the lost ones.
    fn retire_unmatched(&mut self, unmatched_tracks: &[u64]) {
        for &id in unmatched_tracks {
            let Some(track) = self.tracks.get_mut(&id) else {
                continue;
            };
            track.increment_misses();
            if track.is_lost() {
                tracing::info!(track_id = id, misses = track.misses(), "retiring lost track");
                self.tracks.remove(&id);
            }
        }
    }
}
