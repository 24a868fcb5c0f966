//! Saliency comparison over temporal windows of a video.
//!
//! Frames are pooled into consecutive windows of `window_ms`. Within a
//! window the saliency frames are summed and normalized to unit mass, and
//! every fixation adds one hit per frame of overlap to the pooled fixation
//! map. A window where any of the four pooled maps is empty scores `NaN` on
//! every metric. Windows are independent and evaluated in parallel with the
//! `parallel` feature; the summary is the NaN-aware mean per metric.
use super::{compare_saliency, nan_mean, MapPair, MetricKind, MetricOptions, Plane, Scores};
use crate::error::{GazeError, Result};
use crate::saliency::video::{FrameTiming, SaliencyVideo};
use crate::saliency::FixationMap;
use crate::types::FixationPoint;
use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicOptions {
    pub window_ms: f64,
    /// Stimulus length used to turn `window_ms` into a frame count.
    pub stimulus_duration_s: f64,
}

impl Default for DynamicOptions {
    fn default() -> Self {
        Self {
            window_ms: 1000.0,
            stimulus_duration_s: 20.0,
        }
    }
}

/// Consecutive frame windows; trailing frames that do not fill a window are
/// left out.
pub fn pooling_windows(frame_count: usize, opts: &DynamicOptions) -> Vec<Range<usize>> {
    let frames_per_s = frame_count as f64 / opts.stimulus_duration_s;
    let size = ((frames_per_s * opts.window_ms / 1000.0).round() as usize).max(1);
    (0..frame_count / size).map(|i| i * size..(i + 1) * size).collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindowScores {
    pub frames: Range<usize>,
    pub scores: Scores,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DynamicComparison {
    pub windows: Vec<WindowScores>,
    /// NaN-aware mean over windows.
    pub mean: Scores,
}

/// Pooled saliency of `frames`, normalized to unit mass when non-empty.
pub fn pooled_saliency(video: &SaliencyVideo, frames: Range<usize>) -> Plane {
    let mut plane = Plane::from(&video.pooled(frames));
    let total = plane.sum();
    if total != 0.0 {
        plane.data.iter_mut().for_each(|v| *v /= total);
    }
    plane
}

/// Hits of every fixation, once per frame of `frames` it overlaps.
pub fn pooled_fixations(points: &[FixationPoint], timing: &FrameTiming, frames: &Range<usize>, w: usize, h: usize) -> FixationMap {
    let mut map = FixationMap::new(w, h);
    for p in points {
        let span = timing.span(p.start_ms, p.end_ms());
        let overlap = span.end.min(frames.end).saturating_sub(span.start.max(frames.start));
        if overlap > 0 {
            map.add(p, overlap as u32);
        }
    }
    map
}

fn score_window(
    frames: Range<usize>,
    videos: [&SaliencyVideo; 2],
    points: [&[FixationPoint]; 2],
    timing: &FrameTiming,
    baseline: Option<&Plane>,
    metrics: &MetricOptions,
) -> WindowScores {
    let (w, h) = (videos[0].w, videos[0].h);
    let s1 = pooled_saliency(videos[0], frames.clone());
    let s2 = pooled_saliency(videos[1], frames.clone());
    let f1 = Plane::from(&pooled_fixations(points[0], timing, &frames, w, h));
    let f2 = Plane::from(&pooled_fixations(points[1], timing, &frames, w, h));

    let empty = [&s1, &s2, &f1, &f2].iter().any(|p| p.sum() < 1e-12);
    let scores = if empty {
        metrics
            .metrics
            .iter()
            .filter(|k| baseline.is_some() || **k != MetricKind::InfoGain)
            .map(|&k| (k, f64::NAN))
            .collect()
    } else {
        compare_saliency(
            &MapPair {
                saliency: [&s1, &s2],
                fixations: Some([&f1, &f2]),
                baseline,
            },
            metrics,
        )
    };
    WindowScores { frames, scores }
}

/// Compares two saliency videos window by window.
pub fn compare_dynamic(
    videos: [&SaliencyVideo; 2],
    points: [&[FixationPoint]; 2],
    timing: &FrameTiming,
    baseline: Option<&Plane>,
    opts: &DynamicOptions,
    metrics: &MetricOptions,
) -> Result<DynamicComparison> {
    let [v1, v2] = videos;
    if (v1.w, v1.h) != (v2.w, v2.h) {
        return Err(GazeError::DimensionMismatch {
            expected: format!("{}x{} frames", v1.w, v1.h),
            actual: format!("{}x{}", v2.w, v2.h),
        });
    }
    if !(opts.window_ms > 0.0 && opts.stimulus_duration_s > 0.0) {
        return Err(GazeError::InvalidParameter(format!(
            "window_ms and stimulus_duration_s must be positive, got {} and {}",
            opts.window_ms, opts.stimulus_duration_s
        )));
    }
    let frame_count = v1.frame_count().min(v2.frame_count());
    let windows = pooling_windows(frame_count, opts);

    #[cfg(feature = "parallel")]
    let scored: Vec<WindowScores> = windows
        .into_par_iter()
        .map(|frames| score_window(frames, videos, points, timing, baseline, metrics))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let scored: Vec<WindowScores> = windows
        .into_iter()
        .map(|frames| score_window(frames, videos, points, timing, baseline, metrics))
        .collect();

    let mut mean = Scores::new();
    for &kind in &metrics.metrics {
        if scored.iter().any(|w| w.scores.contains_key(&kind)) {
            mean.insert(kind, nan_mean(scored.iter().filter_map(|w| w.scores.get(&kind).copied())));
        }
    }
    debug!("dynamic comparison over {} windows of {} frames", scored.len(), frame_count);
    Ok(DynamicComparison { windows: scored, mean })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::saliency::video::build_saliency_video;
    use crate::saliency::SaliencyOptions;

    fn timing() -> FrameTiming {
        FrameTiming {
            frame_count: 40,
            fps: 20.0,
        }
    }

    fn fixation(u: f64, start_ms: f64, duration_ms: f64) -> FixationPoint {
        let mut p = FixationPoint::from_lon_lat(u, 0.5, 0);
        p.start_ms = start_ms;
        p.duration_ms = duration_ms;
        p
    }

    #[test]
    fn windows_follow_stimulus_length() {
        let opts = DynamicOptions {
            window_ms: 500.0,
            stimulus_duration_s: 2.0,
        };
        // 40 frames over 2 s, 10 frames per window
        let w = pooling_windows(40, &opts);
        assert_eq!(w, vec![0..10, 10..20, 20..30, 30..40]);
        let w = pooling_windows(45, &opts);
        assert_eq!(w.len(), 4);
    }

    #[test]
    fn fixation_pooling_counts_overlapping_frames() {
        let p = fixation(0.5, 250.0, 200.0);
        // frames 5..=9 at 20 fps
        let map = pooled_fixations(&[p], &timing(), &(0..8), 10, 10);
        assert_eq!(map.total(), 3);
        let map = pooled_fixations(&[p], &timing(), &(10..20), 10, 10);
        assert!(map.is_empty());
    }

    #[test]
    fn identical_videos_match_and_empty_windows_are_nan() {
        let opts = SaliencyOptions {
            width: 40,
            height: 20,
            sigma_deg: 8.0,
            ..Default::default()
        };
        let points = vec![fixation(0.3, 0.0, 900.0), fixation(0.6, 1000.0, 300.0)];
        let video = build_saliency_video(&points, &opts, &timing(), &mut NoProgress).unwrap();
        let dyn_opts = DynamicOptions {
            window_ms: 500.0,
            stimulus_duration_s: 2.0,
        };
        let metrics = MetricOptions {
            metrics: vec![MetricKind::Cc, MetricKind::Kld],
            ..Default::default()
        };
        let out = compare_dynamic(
            [&video, &video],
            [&points[..], &points[..]],
            &timing(),
            None,
            &dyn_opts,
            &metrics,
        )
        .unwrap();
        assert_eq!(out.windows.len(), 4);
        // the last window has no fixation
        assert!(out.windows[3].scores[&MetricKind::Cc].is_nan());
        assert!((out.windows[0].scores[&MetricKind::Cc] - 1.0).abs() < 1e-9);
        assert!((out.mean[&MetricKind::Cc] - 1.0).abs() < 1e-9);
        assert!(out.mean[&MetricKind::Kld].abs() < 1e-9);
    }

    #[test]
    fn mismatched_frame_sizes_are_rejected() {
        let a = SaliencyVideo::new(4, 2, 3);
        let b = SaliencyVideo::new(5, 2, 3);
        let out = compare_dynamic(
            [&a, &b],
            [&[], &[]],
            &timing(),
            None,
            &DynamicOptions::default(),
            &MetricOptions::default(),
        );
        assert!(matches!(out, Err(GazeError::DimensionMismatch { .. })));
    }
}
