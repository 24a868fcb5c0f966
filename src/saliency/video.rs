//! Saliency video: one map per frame.
//!
//! A fixation contributes to every frame its time span overlaps. The kernel
//! is evaluated once per fixation and added to each of those frames.
use super::grid::{kernel_cells, SphereGrid};
use super::SaliencyOptions;
use crate::error::{GazeError, Result};
use crate::image::ImageF32;
use crate::progress::{Progress, Throttle};
use crate::types::FixationPoint;
use log::debug;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Frame layout of a video stimulus.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameTiming {
    pub frame_count: usize,
    pub fps: f64,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self {
            frame_count: 0,
            fps: 30.0,
        }
    }
}

impl FrameTiming {
    /// Frames overlapped by `[start_ms, end_ms]`, clamped to the video.
    pub fn span(&self, start_ms: f64, end_ms: f64) -> Range<usize> {
        let to_frame = |ms: f64| (ms.max(0.0) * self.fps / 1000.0).floor() as usize;
        let first = to_frame(start_ms).min(self.frame_count);
        let last = (to_frame(end_ms) + 1).min(self.frame_count);
        first..last.max(first)
    }

    pub fn frame_start_ms(&self, frame: usize) -> f64 {
        frame as f64 * 1000.0 / self.fps
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SaliencyVideo {
    pub w: usize,
    pub h: usize,
    pub frames: Vec<ImageF32>,
}

impl SaliencyVideo {
    pub fn new(w: usize, h: usize, frame_count: usize) -> Self {
        Self {
            w,
            h,
            frames: (0..frame_count).map(|_| ImageF32::new(w, h)).collect(),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frames stacked frame-major, the layout of the binary format.
    pub fn to_flat(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.w * self.h * self.frames.len());
        for f in &self.frames {
            out.extend_from_slice(&f.data);
        }
        out
    }

    /// Sum of frames `range`, clamped to the video.
    pub fn pooled(&self, range: Range<usize>) -> ImageF32 {
        let mut out = ImageF32::new(self.w, self.h);
        let end = range.end.min(self.frames.len());
        for f in &self.frames[range.start.min(end)..end] {
            out.accumulate(f);
        }
        out
    }
}

/// Builds a video where each point is splatted onto the frames of its span.
pub fn build_saliency_video(
    points: &[FixationPoint],
    opts: &SaliencyOptions,
    timing: &FrameTiming,
    progress: &mut dyn Progress,
) -> Result<SaliencyVideo> {
    let spans: Vec<Range<usize>> = points.iter().map(|p| timing.span(p.start_ms, p.end_ms())).collect();
    build_saliency_video_with_spans(points, &spans, opts, timing.frame_count, progress)
}

/// Same as [`build_saliency_video`] with explicit frame spans per point.
pub fn build_saliency_video_with_spans(
    points: &[FixationPoint],
    spans: &[Range<usize>],
    opts: &SaliencyOptions,
    frame_count: usize,
    progress: &mut dyn Progress,
) -> Result<SaliencyVideo> {
    opts.validate()?;
    if spans.len() != points.len() {
        return Err(GazeError::DimensionMismatch {
            expected: format!("{} frame spans", points.len()),
            actual: spans.len().to_string(),
        });
    }
    let grid = SphereGrid::new(opts.width, opts.height);
    let sigma = opts.sigma_rad();
    let mut video = SaliencyVideo::new(opts.width, opts.height, frame_count);
    let throttle = Throttle::new(points.len(), 50);
    for (i, (p, span)) in points.iter().zip(spans).enumerate() {
        let end = span.end.min(frame_count);
        if span.start < end {
            let cells = kernel_cells(&grid, &p.direction, p.lon, p.lat, sigma, opts.kernel);
            for frame in &mut video.frames[span.start..end] {
                for &(idx, w) in &cells {
                    frame.data[idx] += w;
                }
            }
        }
        throttle.tick(i, progress)?;
    }
    debug!(
        "saliency video: {} points over {} frames of {}x{}",
        points.len(),
        frame_count,
        opts.width,
        opts.height
    );
    Ok(video)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::saliency::build_saliency;

    fn opts() -> SaliencyOptions {
        SaliencyOptions {
            width: 60,
            height: 30,
            sigma_deg: 6.0,
            ..Default::default()
        }
    }

    #[test]
    fn span_covers_overlapped_frames() {
        let t = FrameTiming {
            frame_count: 10,
            fps: 10.0,
        };
        assert_eq!(t.span(0.0, 99.0), 0..1);
        assert_eq!(t.span(150.0, 320.0), 1..4);
        assert_eq!(t.span(850.0, 5000.0), 8..10);
        assert_eq!(t.span(2000.0, 3000.0), 10..10);
    }

    #[test]
    fn fixation_only_reaches_its_frames() {
        let mut p = FixationPoint::from_lon_lat(0.5, 0.5, 0);
        p.start_ms = 100.0;
        p.duration_ms = 150.0;
        let timing = FrameTiming {
            frame_count: 5,
            fps: 10.0,
        };
        let video = build_saliency_video(&[p], &opts(), &timing, &mut NoProgress).unwrap();
        let still = build_saliency(&[p], &opts(), &mut NoProgress).unwrap();
        assert!(video.frames[0].is_all_zero());
        assert_eq!(video.frames[1], still);
        assert_eq!(video.frames[2], still);
        assert!(video.frames[3].is_all_zero());
        assert_eq!(video.to_flat().len(), 5 * 60 * 30);
        assert!((video.pooled(0..5).sum() - 2.0 * still.sum()).abs() < 1e-3);
    }

    #[test]
    fn span_count_must_match() {
        let p = FixationPoint::from_lon_lat(0.5, 0.5, 0);
        let out = build_saliency_video_with_spans(&[p], &[], &opts(), 3, &mut NoProgress);
        assert!(matches!(out, Err(GazeError::DimensionMismatch { .. })));
    }
}
