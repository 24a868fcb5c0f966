//! Fixation records from labelled samples.
//!
//! Overview
//! - Maximal runs of fixation labels become [`FixationRecord`]s carrying the
//!   centroid of each track, timing, dispersion and kinematic peaks.
//! - Every record after the first also carries the saccade leading into it,
//!   measured between consecutive centroids ([`saccade`]).
//! - [`layout`] serializes records in the fixed 29-column layout and reads
//!   fixation lists back.
//!
//! Notes
//! - A label sequence with fewer than 5 fixation samples, or with fewer than
//!   two saccade samples, is degenerate: the result is an empty
//!   [`FeatureSet`] flagged `degenerate`, never an error.
//! - A run's end timestamp is the timestamp of the first sample after it (or
//!   of the last sample), so durations include the final inter-sample gap.
pub mod layout;
pub mod saccade;

use crate::error::{GazeError, Result};
use crate::sphere::{mean_angle_to, normalized_lon_lat, normalized_mean};
use crate::types::{FixationRecord, GazeSample, Track, TrackPosition};
use log::{debug, warn};
use nalgebra::Vector3;

pub use layout::{read_fixation_list, write_fixation_csv, FixationCsvOptions, RECORD_COLUMNS};

/// Minimum number of fixation samples for a usable segmentation.
pub const MIN_FIXATION_SAMPLES: usize = 5;

/// Result of feature extraction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureSet {
    pub records: Vec<FixationRecord>,
    /// `true` when the labels were degenerate and extraction was skipped.
    pub degenerate: bool,
}

impl FeatureSet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Maximal runs of `true` as `(start, end)` with `end` exclusive.
pub fn fixation_runs(labels: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &label) in labels.iter().enumerate() {
        match (label, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, labels.len()));
    }
    runs
}

fn nan_max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NAN, f64::max)
}

fn track_position(samples: &[GazeSample], track: Track) -> TrackPosition {
    match normalized_mean(samples.iter().map(|s| s.direction(track))) {
        Some(direction) => {
            let (lon, lat) = normalized_lon_lat(&direction);
            TrackPosition { direction, lon, lat }
        }
        None => TrackPosition {
            direction: Vector3::repeat(f64::NAN),
            lon: f64::NAN,
            lat: f64::NAN,
        },
    }
}

/// Aggregates fixation runs into records.
///
/// `velocity`, when given, must be parallel to `samples`; without it the
/// kinematic features are zero.
pub fn extract_features(samples: &[GazeSample], labels: &[bool], velocity: Option<&[f64]>) -> Result<FeatureSet> {
    let n = samples.len();
    if labels.len() != n {
        return Err(GazeError::DimensionMismatch {
            expected: format!("{n} labels"),
            actual: labels.len().to_string(),
        });
    }
    if let Some(v) = velocity {
        if v.len() != n {
            return Err(GazeError::DimensionMismatch {
                expected: format!("{n} velocity samples"),
                actual: v.len().to_string(),
            });
        }
    }

    let fixation_samples = labels.iter().filter(|l| **l).count();
    if fixation_samples < MIN_FIXATION_SAMPLES || fixation_samples + 2 > n {
        warn!(
            "Zero saccades were identified ({} fixation samples out of {}); check the segmentation parameters",
            fixation_samples, n
        );
        return Ok(FeatureSet {
            records: Vec::new(),
            degenerate: true,
        });
    }

    let zeros;
    let velocity = match velocity {
        Some(v) => v,
        None => {
            zeros = vec![0.0; n];
            &zeros[..]
        }
    };
    let timestamps: Vec<f64> = samples.iter().map(|s| s.timestamp_ms).collect();
    let acceleration: Vec<f64> = (0..n.saturating_sub(1))
        .map(|i| (velocity[i + 1] - velocity[i]) / (timestamps[i + 1] - timestamps[i]))
        .collect();
    let acc_slice = |a: usize, b: usize| &acceleration[a.min(acceleration.len())..b.min(acceleration.len())];

    let runs = fixation_runs(labels);
    let mut records: Vec<FixationRecord> = Vec::with_capacity(runs.len());
    for (index, &(start, end)) in runs.iter().enumerate() {
        let members = &samples[start..end];
        let gaze = track_position(members, Track::Gaze);
        let eye = track_position(members, Track::Eye);
        let head = track_position(members, Track::Head);
        let gaze_dirs: Vec<Vector3<f64>> = members.iter().map(|s| s.gaze).collect();

        let start_ms = timestamps[start];
        let end_ms = timestamps[end.min(n - 1)];

        let (saccade_peak_velocity, saccade_peak_acceleration) = match records.last() {
            Some(prev) => {
                let from = prev.end_index;
                (
                    Some(nan_max(&velocity[from..start])),
                    Some(nan_max(acc_slice(from, start))),
                )
            }
            None => (None, None),
        };

        records.push(FixationRecord {
            dispersion: mean_angle_to(&gaze_dirs, &gaze.direction),
            gaze,
            eye,
            head,
            index,
            start_index: start,
            end_index: end - 1,
            start_ms,
            end_ms,
            duration_ms: end_ms - start_ms,
            peak_velocity: nan_max(&velocity[start..end]),
            peak_acceleration: nan_max(acc_slice(start, end)),
            saccade_peak_velocity,
            saccade_peak_acceleration,
            saccade_gaze: None,
            saccade_eye: None,
            saccade_head: None,
        });
    }

    for track in Track::ALL {
        let positions: Vec<TrackPosition> = records.iter().map(|r| *r.position(track)).collect();
        for (record, features) in records.iter_mut().zip(saccade::saccade_sequence(&positions)) {
            match track {
                Track::Gaze => record.saccade_gaze = features,
                Track::Eye => record.saccade_eye = features,
                Track::Head => record.saccade_head = features,
            }
        }
    }

    debug!("extracted {} fixations from {} samples", records.len(), n);
    Ok(FeatureSet {
        records,
        degenerate: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphere::normalized_to_unit;
    use nalgebra::UnitQuaternion;

    fn sample_at(t: f64, u: f64, v: f64) -> GazeSample {
        let d = normalized_to_unit(u, v);
        GazeSample {
            timestamp_ms: t,
            head_rotation: UnitQuaternion::identity(),
            gaze: d,
            eye: d,
            head: d,
        }
    }

    fn labels_from(s: &str) -> Vec<bool> {
        s.chars().map(|c| c == '1').collect()
    }

    #[test]
    fn runs_cover_every_fixation_sample() {
        let labels = labels_from("1100111010111");
        let runs = fixation_runs(&labels);
        assert_eq!(runs, vec![(0, 2), (4, 7), (8, 9), (10, 13)]);
        let total: usize = runs.iter().map(|(s, e)| e - s).sum();
        assert_eq!(total, labels.iter().filter(|l| **l).count());
    }

    #[test]
    fn degenerate_labels_give_empty_set() {
        let samples: Vec<_> = (0..10).map(|i| sample_at(i as f64, 0.5, 0.5)).collect();
        let all_saccade = vec![false; 10];
        let out = extract_features(&samples, &all_saccade, None).unwrap();
        assert!(out.degenerate && out.is_empty());
        let all_fix = vec![true; 10];
        assert!(extract_features(&samples, &all_fix, None).unwrap().degenerate);
    }

    #[test]
    fn records_carry_positions_timing_and_saccades() {
        let mut samples = Vec::new();
        let labels = labels_from("11111001111100111110");
        for (i, _) in labels.iter().enumerate() {
            let u = match i {
                0..=6 => 0.40,
                7..=13 => 0.45,
                _ => 0.50,
            };
            samples.push(sample_at(i as f64 * 10.0, u, 0.5));
        }
        let velocity: Vec<f64> = (0..labels.len()).map(|i| i as f64 * 0.001).collect();
        let set = extract_features(&samples, &labels, Some(&velocity)).unwrap();
        assert_eq!(set.len(), 3);

        let r0 = &set.records[0];
        assert_eq!((r0.start_index, r0.end_index), (0, 4));
        assert_eq!((r0.start_ms, r0.end_ms, r0.duration_ms), (0.0, 50.0, 50.0));
        assert!((r0.gaze.lon - 0.40).abs() < 1e-9);
        assert!(r0.dispersion.abs() < 1e-6);
        assert!((r0.peak_velocity - 0.004).abs() < 1e-12);
        assert!(r0.saccade_gaze.is_none());

        let r1 = &set.records[1];
        assert_eq!(r1.index, 1);
        assert_eq!((r1.start_index, r1.end_index), (7, 11));
        assert!((r1.saccade_peak_velocity.unwrap() - 0.006).abs() < 1e-12);
        let s1 = r1.saccade_gaze.unwrap();
        assert!((s1.amplitude - 0.05 * std::f64::consts::TAU).abs() < 1e-9);
        assert!(s1.rel_angle.is_none());

        let r2 = &set.records[2];
        assert_eq!(r2.end_index, 18);
        assert!(r2.saccade_gaze.unwrap().rel_angle.unwrap().abs() < 1e-9);
        let lengths: usize = set.records.iter().map(|r| r.sample_count()).sum();
        assert_eq!(lengths, labels.iter().filter(|l| **l).count());
    }
}
