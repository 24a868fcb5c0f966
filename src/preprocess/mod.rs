//! Raw head/eye samples to unit-sphere gaze samples.
//!
//! Overview
//! - [`raw`] reads delimited recordings and resolves channels by header name.
//! - [`euler`] converts Euler head channels to quaternions.
//! - [`preprocess`] rebases timestamps, drops invalid rows, optionally
//!   resamples onto a uniform grid ([`interpolate`]) and places the head, eye
//!   and combined gaze directions on the sphere.
//! - [`velocity`] derives the angular speed used by the segmenters and removes
//!   outlier samples; [`head`] provides the head-only trajectory labels.
//!
//! Notes
//! - Timestamps are expected in milliseconds. Recordings in micro- or
//!   nanoseconds are detected from the mean sample spacing and rescaled.
//! - Every output direction is renormalized.
pub mod euler;
pub mod head;
pub mod interpolate;
pub mod raw;
pub mod velocity;

use crate::error::{GazeError, Result};
use crate::progress::{Progress, Throttle};
use crate::sphere::renormalize;
use crate::types::GazeSample;
use log::{debug, warn};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

pub use raw::{load_raw_recording, read_raw_recording, HeadFormat, RawRecording, RawSample};
pub use velocity::VelocityFilter;

/// Which gaze ray(s) to read from a recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EyeSelector {
    #[serde(rename = "L")]
    Left,
    #[default]
    #[serde(rename = "R")]
    Right,
    /// Binocular ray, or the average of both eyes.
    #[serde(rename = "B")]
    Binocular,
    /// No eye channels; the viewer is assumed to look straight ahead.
    #[serde(rename = "H")]
    HeadOnly,
}

/// Whether fixations come from eye movements or from the head trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TrackingMode {
    #[default]
    #[serde(rename = "HE")]
    HeadEye,
    #[serde(rename = "H")]
    Head,
}

/// Parameters of the preprocessing stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessOptions {
    pub eye: EyeSelector,
    /// Target rate in Hz; `0` keeps the recorded samples.
    pub resample_hz: f64,
    pub tracking: TrackingMode,
    /// Velocity outlier threshold in standard deviations; `None` keeps all finite samples.
    pub outlier_sigma: Option<f64>,
    pub filter: VelocityFilter,
    /// Window of the head-only trajectory (ms).
    pub head_window_ms: f64,
    /// Restrict processing to rows `[start, end)` of the recording.
    pub range: Option<[usize; 2]>,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            eye: EyeSelector::Right,
            resample_hz: 0.0,
            tracking: TrackingMode::HeadEye,
            outlier_sigma: Some(5.0),
            filter: VelocityFilter::None,
            head_window_ms: 100.0,
            range: None,
        }
    }
}

/// Rotation between the recorder's frame (y up) and the sphere frame (z up).
fn frame_rotation() -> UnitQuaternion<f64> {
    UnitQuaternion::from_quaternion(Quaternion::new(1.0, 1.0, 0.0, 0.0))
}

/// Rebases timestamps to zero and rescales them to milliseconds.
///
/// The unit is inferred from `log10` of the mean sample spacing rounded down
/// to a multiple of three.
pub fn normalize_timestamps(timestamps: &mut [f64]) {
    let Some(&t0) = timestamps.first() else {
        return;
    };
    timestamps.iter_mut().for_each(|t| *t -= t0);

    let diffs: Vec<f64> = timestamps
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| d.is_finite())
        .collect();
    if diffs.is_empty() {
        return;
    }
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    if mean <= 0.0 {
        return;
    }
    let exponent = 3 * (mean.log10() / 3.0).floor() as i32;
    if exponent != 0 {
        let scale = 10f64.powi(exponent);
        timestamps.iter_mut().for_each(|t| *t /= scale);
        warn!("Timestamps were divided by 1e{} to be in milliseconds", exponent);
    }
}

fn is_sentinel(ray: &[f64; 3]) -> bool {
    let sum: f64 = ray.iter().sum();
    sum == -3.0 || sum == 0.0
}

fn row_is_valid(sample: &RawSample, head: &UnitQuaternion<f64>) -> bool {
    let finite = |v: &[f64]| v.iter().all(|x| !x.is_nan());
    finite(head.coords.as_slice())
        && finite(&sample.eye)
        && !is_sentinel(&sample.eye)
        && sample
            .eye_secondary
            .map_or(true, |e| finite(&e) && !is_sentinel(&e))
}

fn combined_eye(sample: &RawSample) -> [f64; 3] {
    match sample.eye_secondary {
        Some(other) => {
            let mean = (Vector3::from(sample.eye) + Vector3::from(other)) / 2.0;
            renormalize(mean).into()
        }
        None => sample.eye,
    }
}

/// A row that survived validation, in head coordinates.
struct HeadEyeRow {
    timestamp: f64,
    rotation: UnitQuaternion<f64>,
    eye: Vector3<f64>,
}

/// Marks rows that differ from their successor; the last row always qualifies.
fn non_repeated<T, F>(items: &[T], mut differs: F) -> Vec<bool>
where
    F: FnMut(&T, &T) -> bool,
{
    let mut out: Vec<bool> = items.windows(2).map(|w| differs(&w[0], &w[1])).collect();
    if !items.is_empty() {
        out.push(true);
    }
    out
}

/// Keeps candidates whose timestamp exceeds the last kept one, so knot times
/// strictly increase.
fn strictly_increasing(timestamps: &[f64], candidates: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::new();
    for i in candidates {
        if kept.last().map_or(true, |&j| timestamps[i] > timestamps[j]) {
            kept.push(i);
        }
    }
    kept
}

fn resample_rows(
    timestamps: &[f64],
    rotations: &[UnitQuaternion<f64>],
    eyes: &[[f64; 3]],
    validity: &[bool],
    rate_hz: f64,
) -> Result<Vec<HeadEyeRow>> {
    let t_last = timestamps.last().copied().unwrap_or(0.0);
    let n = (t_last / 1e3 * rate_hz).floor().max(0.0) as usize;
    let grid = interpolate::linspace(0.0, t_last, n);

    let eye_moves = non_repeated(eyes, |a, b| a != b);
    let head_moves = non_repeated(rotations, |a, b| a.coords != b.coords);

    // Repeated rows carry no new information, unless nothing else is left.
    let knots = |moves: &[bool]| -> Vec<usize> {
        let moving = strictly_increasing(timestamps, (0..timestamps.len()).filter(|&i| validity[i] && moves[i]));
        if moving.len() >= 2 {
            moving
        } else {
            strictly_increasing(timestamps, (0..timestamps.len()).filter(|&i| validity[i]))
        }
    };
    let (eye_t, eye_v): (Vec<f64>, Vec<[f64; 3]>) = knots(&eye_moves).into_iter().map(|i| (timestamps[i], eyes[i])).unzip();
    let (head_t, head_q): (Vec<f64>, Vec<UnitQuaternion<f64>>) = knots(&head_moves)
        .into_iter()
        .map(|i| (timestamps[i], rotations[i]))
        .unzip();

    let too_few = || GazeError::InvalidParameter(format!("fewer than two usable samples to resample at {rate_hz} Hz"));
    let eye_grid = interpolate::cubic_resample(&eye_t, &eye_v, &grid).ok_or_else(too_few)?;
    if head_q.len() < 2 {
        return Err(too_few());
    }
    let head_grid = interpolate::squad_resample(&head_t, &head_q, &grid);
    debug!(
        "resampled {} rows onto {} samples at {} Hz",
        timestamps.len(),
        grid.len(),
        rate_hz
    );

    Ok(grid
        .into_iter()
        .zip(head_grid)
        .zip(eye_grid)
        .map(|((timestamp, rotation), eye)| HeadEyeRow {
            timestamp,
            rotation,
            eye: renormalize(Vector3::from(eye)),
        })
        .collect())
}

/// Places a recording on the unit sphere.
///
/// Fails with [`GazeError::Cancelled`] when `progress` refuses to continue.
pub fn preprocess(
    recording: &RawRecording,
    options: &PreprocessOptions,
    progress: &mut dyn Progress,
) -> Result<Vec<GazeSample>> {
    let euler_input = recording.head_format == HeadFormat::Euler;
    let all_rotations: Vec<UnitQuaternion<f64>> = if euler_input {
        let angles: Vec<[f64; 3]> = recording.samples.iter().map(|s| [s.head[0], s.head[1], s.head[2]]).collect();
        euler::convert_euler_series(&angles)
    } else {
        recording
            .samples
            .iter()
            .map(|s| UnitQuaternion::new_unchecked(Quaternion::new(s.head[0], s.head[1], s.head[2], s.head[3])))
            .collect()
    };

    let total = recording.samples.len();
    let [start, end] = options.range.unwrap_or([0, total]);
    let start = if start >= total { 0 } else { start };
    let end = if end == 0 || end > total { total } else { end };
    if start >= end {
        return Err(GazeError::InvalidParameter(format!(
            "empty sample range [{start}, {end}) for {}",
            recording.name
        )));
    }
    let rows = &recording.samples[start..end];
    let rotations: Vec<UnitQuaternion<f64>> = all_rotations[start..end]
        .iter()
        .map(|q| UnitQuaternion::new_normalize(q.into_inner()))
        .collect();

    let mut timestamps: Vec<f64> = rows.iter().map(|s| s.timestamp).collect();
    normalize_timestamps(&mut timestamps);

    let validity: Vec<bool> = if options.eye == EyeSelector::HeadOnly {
        vec![true; rows.len()]
    } else {
        rows.iter()
            .zip(all_rotations[start..end].iter())
            .zip(timestamps.iter())
            .map(|((s, q), t)| !t.is_nan() && row_is_valid(s, q))
            .collect()
    };
    let dropped = validity.iter().filter(|v| !**v).count();
    if dropped > 0 {
        debug!("{}: {} of {} rows flagged invalid", recording.name, dropped, rows.len());
    }
    if !progress.update(0.1) {
        return Err(GazeError::Cancelled);
    }

    let eyes: Vec<[f64; 3]> = rows.iter().map(combined_eye).collect();
    let head_eye: Vec<HeadEyeRow> = if options.resample_hz > 0.0 {
        resample_rows(&timestamps, &rotations, &eyes, &validity, options.resample_hz)?
    } else {
        (0..rows.len())
            .filter(|&i| validity[i])
            .map(|i| HeadEyeRow {
                timestamp: timestamps[i],
                rotation: rotations[i],
                eye: Vector3::from(eyes[i]),
            })
            .collect()
    };

    let frame = frame_rotation();
    let forward = Vector3::z();
    let throttle = Throttle::new(head_eye.len(), 25);
    let mut samples = Vec::with_capacity(head_eye.len());
    for (i, row) in head_eye.into_iter().enumerate() {
        throttle.tick(i, progress)?;
        let head = frame * (row.rotation * forward);
        let mut gaze = frame * (row.rotation * row.eye);
        if euler_input {
            gaze.z = -gaze.z;
        }
        let eye = Vector3::new(row.eye.x, row.eye.z, row.eye.y);
        samples.push(GazeSample {
            timestamp_ms: row.timestamp,
            head_rotation: row.rotation,
            gaze: renormalize(gaze),
            eye: renormalize(eye),
            head: renormalize(head),
        });
    }
    debug!("{}: {} samples placed on sphere", recording.name, samples.len());
    Ok(samples)
}

/// Output of [`velocity_signal`]: retained samples with their angular speed.
#[derive(Clone, Debug)]
pub struct VelocitySignal {
    pub samples: Vec<GazeSample>,
    /// Angular speed of the gaze track (rad/ms), parallel to `samples`.
    pub velocity: Vec<f64>,
}

/// Computes gaze velocity, drops outlier samples and smooths the result.
pub fn velocity_signal(samples: Vec<GazeSample>, options: &PreprocessOptions) -> VelocitySignal {
    let directions: Vec<Vector3<f64>> = samples.iter().map(|s| s.gaze).collect();
    let timestamps: Vec<f64> = samples.iter().map(|s| s.timestamp_ms).collect();
    let velocity = velocity::angular_velocity(&directions, &timestamps);

    let keep = match options.outlier_sigma {
        Some(sigma) => velocity::outlier_mask(&velocity, sigma),
        None => velocity.iter().map(|v| v.is_finite()).collect(),
    };
    let (samples, velocity): (Vec<GazeSample>, Vec<f64>) = samples
        .into_iter()
        .zip(velocity)
        .zip(keep)
        .filter_map(|(pair, k)| k.then_some(pair))
        .unzip();

    let velocity = options.filter.apply(&velocity);
    VelocitySignal { samples, velocity }
}
