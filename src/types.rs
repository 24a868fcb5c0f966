use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Per-sample fixation labels, `true` = fixation, parallel to the samples.
pub type LabelSequence = Vec<bool>;

/// The three direction signals carried by every sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    /// Eye-in-space: eye ray rotated by the head orientation.
    #[default]
    Gaze,
    /// Eye-in-head ray.
    Eye,
    /// Head forward direction.
    Head,
}

impl Track {
    pub const ALL: [Track; 3] = [Track::Gaze, Track::Eye, Track::Head];

    pub fn label(self) -> &'static str {
        match self {
            Track::Gaze => "Gaze",
            Track::Eye => "Eye",
            Track::Head => "Head",
        }
    }
}

/// One preprocessed sample placed on the unit sphere.
#[derive(Clone, Debug, PartialEq)]
pub struct GazeSample {
    /// Milliseconds since the first retained sample.
    pub timestamp_ms: f64,
    pub head_rotation: UnitQuaternion<f64>,
    pub gaze: Vector3<f64>,
    pub eye: Vector3<f64>,
    pub head: Vector3<f64>,
}

impl GazeSample {
    #[inline]
    pub fn direction(&self, track: Track) -> &Vector3<f64> {
        match track {
            Track::Gaze => &self.gaze,
            Track::Eye => &self.eye,
            Track::Head => &self.head,
        }
    }
}

/// Mean direction of a fixation on one track.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrackPosition {
    pub direction: Vector3<f64>,
    /// Normalized longitude in `[0, 1)`.
    pub lon: f64,
    /// Normalized latitude in `[0, 1)`, 0 at the north pole.
    pub lat: f64,
}

/// Saccade leading into a fixation, measured between consecutive centroids.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SaccadeFeatures {
    /// Great-circle amplitude (rad).
    pub amplitude: f64,
    /// Signed angle to the horizontal axis in Mercator space (rad).
    pub abs_angle: f64,
    /// Signed angle to the previous saccade (rad); absent for the first saccade.
    pub rel_angle: Option<f64>,
}

/// Aggregated description of one maximal fixation run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FixationRecord {
    pub gaze: TrackPosition,
    pub eye: TrackPosition,
    pub head: TrackPosition,
    /// Fixation index, 0-based and contiguous.
    pub index: usize,
    /// First sample of the run.
    pub start_index: usize,
    /// Last sample of the run (inclusive).
    pub end_index: usize,
    pub start_ms: f64,
    pub end_ms: f64,
    pub duration_ms: f64,
    /// Mean angular distance of the gaze samples to the centroid (rad).
    pub dispersion: f64,
    /// Peak angular velocity inside the run (rad/ms).
    pub peak_velocity: f64,
    /// Peak angular acceleration inside the run (rad/ms²).
    pub peak_acceleration: f64,
    pub saccade_peak_velocity: Option<f64>,
    pub saccade_peak_acceleration: Option<f64>,
    pub saccade_gaze: Option<SaccadeFeatures>,
    pub saccade_eye: Option<SaccadeFeatures>,
    pub saccade_head: Option<SaccadeFeatures>,
}

impl FixationRecord {
    pub fn position(&self, track: Track) -> &TrackPosition {
        match track {
            Track::Gaze => &self.gaze,
            Track::Eye => &self.eye,
            Track::Head => &self.head,
        }
    }

    pub fn saccade(&self, track: Track) -> Option<&SaccadeFeatures> {
        match track {
            Track::Gaze => self.saccade_gaze.as_ref(),
            Track::Eye => self.saccade_eye.as_ref(),
            Track::Head => self.saccade_head.as_ref(),
        }
    }

    /// Number of samples in the run.
    pub fn sample_count(&self) -> usize {
        self.end_index + 1 - self.start_index
    }
}

/// A position to splat into saliency or fixation maps.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixationPoint {
    pub direction: Vector3<f64>,
    /// Normalized longitude in `[0, 1)`.
    pub lon: f64,
    /// Normalized latitude in `[0, 1)`.
    pub lat: f64,
    pub index: usize,
    pub start_ms: f64,
    pub duration_ms: f64,
}

impl FixationPoint {
    /// Position of `record` on one track.
    pub fn from_record(record: &FixationRecord, track: Track) -> Self {
        let pos = record.position(track);
        Self {
            direction: pos.direction,
            lon: pos.lon,
            lat: pos.lat,
            index: record.index,
            start_ms: record.start_ms,
            duration_ms: record.duration_ms,
        }
    }

    /// A raw sample treated as a zero-duration fixation.
    pub fn from_sample(sample: &GazeSample, index: usize, track: Track) -> Self {
        let direction = *sample.direction(track);
        let (lon, lat) = crate::sphere::normalized_lon_lat(&direction);
        Self {
            direction,
            lon,
            lat,
            index,
            start_ms: sample.timestamp_ms,
            duration_ms: 0.0,
        }
    }

    /// Builds a point from normalized coordinates.
    pub fn from_lon_lat(lon: f64, lat: f64, index: usize) -> Self {
        Self {
            direction: crate::sphere::normalized_to_unit(lon, lat),
            lon,
            lat,
            index,
            start_ms: 0.0,
            duration_ms: 0.0,
        }
    }

    pub fn end_ms(&self) -> f64 {
        self.start_ms + self.duration_ms
    }
}
