//! Scanpath comparison over sliding frame windows of a video.
//!
//! Each window compares the fixations lying entirely inside it. Windows where
//! either scanpath has no such fixation are skipped, and the result is the
//! NaN-aware mean over the compared windows.
use super::multimatch::{multimatch, MultiMatchResult, MultiMatchWeights};
use super::vector::ScanpathVector;
use crate::error::Result;
use crate::metrics::nan_mean;
use crate::saliency::video::FrameTiming;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanpathWindowOptions {
    pub window_frames: usize,
}

impl Default for ScanpathWindowOptions {
    fn default() -> Self {
        Self { window_frames: 20 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DynamicScanpathResult {
    pub result: MultiMatchResult,
    pub windows_compared: usize,
}

fn frame_of(ms: f64, timing: &FrameTiming) -> usize {
    (ms.max(0.0) * timing.fps / 1000.0).floor() as usize
}

fn inside(sp: &[ScanpathVector], timing: &FrameTiming, lower: usize, upper: usize) -> Vec<ScanpathVector> {
    sp.iter()
        .filter(|v| frame_of(v.start_ms, timing) >= lower && frame_of(v.end_ms, timing) <= upper)
        .copied()
        .collect()
}

pub fn compare_scanpaths_dynamic(
    s1: &[ScanpathVector],
    s2: &[ScanpathVector],
    timing: &FrameTiming,
    weights: &MultiMatchWeights,
    opts: &ScanpathWindowOptions,
) -> Result<DynamicScanpathResult> {
    let nan = MultiMatchResult {
        score: f64::NAN,
        position: f64::NAN,
        duration: f64::NAN,
        length: f64::NAN,
        shape: f64::NAN,
        direction: f64::NAN,
    };
    let (Some(first1), Some(first2), Some(last1), Some(last2)) = (s1.first(), s2.first(), s1.last(), s2.last()) else {
        return Ok(DynamicScanpathResult {
            result: nan,
            windows_compared: 0,
        });
    };
    let step = opts.window_frames.max(1);
    let min_frame = frame_of(first1.start_ms, timing).min(frame_of(first2.start_ms, timing));
    let max_frame = frame_of(last1.end_ms, timing).min(frame_of(last2.end_ms, timing));

    let mut results = Vec::new();
    for lower in (min_frame..max_frame).step_by(step) {
        let upper = lower + step;
        let a = inside(s1, timing, lower, upper);
        let b = inside(s2, timing, lower, upper);
        if a.is_empty() || b.is_empty() {
            continue;
        }
        results.push(multimatch(&a, &b, weights)?.result);
    }
    debug!("dynamic MultiMatch compared {} windows", results.len());
    if results.is_empty() {
        return Ok(DynamicScanpathResult {
            result: nan,
            windows_compared: 0,
        });
    }
    let score = nan_mean(results.iter().map(|r| r.score));
    let dims: [f64; 5] = std::array::from_fn(|d| nan_mean(results.iter().map(|r| r.dimensions()[d])));
    Ok(DynamicScanpathResult {
        result: MultiMatchResult {
            score,
            position: dims[0],
            duration: dims[1],
            length: dims[2],
            shape: dims[3],
            direction: dims[4],
        },
        windows_compared: results.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanpath::vector::scanpath_from_points;
    use crate::types::FixationPoint;

    fn scanpath(n: usize) -> Vec<ScanpathVector> {
        let points: Vec<FixationPoint> = (0..n)
            .map(|k| {
                let mut p = FixationPoint::from_lon_lat(0.3 + 0.02 * k as f64, 0.5 + 0.01 * (k % 3) as f64, k);
                p.start_ms = k as f64 * 250.0;
                p.duration_ms = 200.0;
                p
            })
            .collect();
        scanpath_from_points(&points)
    }

    #[test]
    fn identical_scanpaths_match_in_every_window() {
        let sp = scanpath(12);
        let timing = FrameTiming {
            frame_count: 100,
            fps: 20.0,
        };
        let out = compare_scanpaths_dynamic(&sp, &sp, &timing, &MultiMatchWeights::default(), &ScanpathWindowOptions::default()).unwrap();
        assert!(out.windows_compared >= 2);
        assert!((out.result.score - 1.0).abs() < 1e-12);
        assert!((out.result.position - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_scanpath_gives_nan() {
        let sp = scanpath(3);
        let out = compare_scanpaths_dynamic(&sp, &[], &FrameTiming::default(), &MultiMatchWeights::default(), &ScanpathWindowOptions::default()).unwrap();
        assert_eq!(out.windows_compared, 0);
        assert!(out.result.score.is_nan());
    }
}
