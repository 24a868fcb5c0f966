//! Pairwise comparison of two loaded inputs into table rows.
//!
//! Saliency metrics run on static maps, or window by window on videos when
//! the configuration carries a frame layout. MultiMatch runs on the two
//! scanpaths, whole or per frame window for videos. Sides that lack what a
//! comparison needs (a binary map has no scanpath) are skipped with a warning.
use super::input::LoadedInput;
use crate::config::CompareConfig;
use crate::error::{GazeError, Result};
use crate::image::ImageF32;
use crate::metrics::dynamic::compare_dynamic;
use crate::metrics::table::ComparisonRow;
use crate::metrics::{compare_saliency, MapPair, Plane, Scores};
use crate::progress::Progress;
use crate::saliency::video::{build_saliency_video, FrameTiming};
use crate::saliency::{build_saliency, FixationMap, SaliencyVideo};
use crate::scanpath::dynamic::compare_scanpaths_dynamic;
use crate::scanpath::multimatch::DIMENSIONS;
use crate::scanpath::{multimatch, MultiMatchResult};
use log::{debug, warn};
use std::borrow::Cow;

/// Metric label of the weighted MultiMatch score.
pub const MULTIMATCH_SCORE: &str = "multimatch.wavg";

/// Static saliency of `input`, synthesized from its points when absent.
pub fn saliency_of<'a>(input: &'a LoadedInput, cfg: &CompareConfig, progress: &mut dyn Progress) -> Result<Cow<'a, ImageF32>> {
    match &input.saliency {
        Some(map) => Ok(Cow::Borrowed(map)),
        None if input.has_points() => Ok(Cow::Owned(build_saliency(&input.points, &cfg.pipeline.saliency, progress)?)),
        None => Err(GazeError::InvalidParameter(format!(
            "{} carries neither a saliency map nor fixations",
            input.name
        ))),
    }
}

fn fixations_of(input: &LoadedInput, w: usize, h: usize) -> Option<FixationMap> {
    match &input.fixation_map {
        Some(map) => Some(map.clone()),
        None if input.has_points() => Some(FixationMap::from_points(&input.points, w, h)),
        None => None,
    }
}

/// Frame count implied by the inputs when the layout leaves it at zero.
pub fn resolve_timing(timing: &FrameTiming, inputs: [&LoadedInput; 2]) -> FrameTiming {
    if timing.frame_count > 0 {
        return *timing;
    }
    let from_points = inputs
        .iter()
        .flat_map(|i| i.points.iter())
        .map(|p| (p.end_ms() * timing.fps / 1000.0).ceil() as usize + 1)
        .max()
        .unwrap_or(0);
    let from_videos = inputs
        .iter()
        .filter_map(|i| i.video.as_ref().map(SaliencyVideo::frame_count))
        .max()
        .unwrap_or(0);
    FrameTiming {
        frame_count: from_points.max(from_videos),
        fps: timing.fps,
    }
}

fn video_of(input: &LoadedInput, cfg: &CompareConfig, timing: &FrameTiming, progress: &mut dyn Progress) -> Result<SaliencyVideo> {
    match &input.video {
        Some(video) => Ok(video.clone()),
        None => build_saliency_video(&input.points, &cfg.pipeline.saliency, timing, progress),
    }
}

fn score_rows(a: &LoadedInput, b: &LoadedInput, scores: &Scores) -> Vec<ComparisonRow> {
    scores
        .iter()
        .map(|(kind, value)| ComparisonRow::new(&a.name, &b.name, kind.name(), *value))
        .collect()
}

fn multimatch_rows(a: &LoadedInput, b: &LoadedInput, result: &MultiMatchResult) -> Vec<ComparisonRow> {
    let mut rows = vec![ComparisonRow::new(&a.name, &b.name, MULTIMATCH_SCORE, result.score)];
    for (dim, value) in DIMENSIONS.iter().zip(result.dimensions()) {
        rows.push(ComparisonRow::new(&a.name, &b.name, format!("multimatch.{dim}"), value));
    }
    rows
}

/// Saliency metrics between `a` and `b`.
pub fn compare_maps(
    a: &LoadedInput,
    b: &LoadedInput,
    baseline: Option<&Plane>,
    cfg: &CompareConfig,
    progress: &mut dyn Progress,
) -> Result<Vec<ComparisonRow>> {
    if let Some(timing) = &cfg.pipeline.video {
        let timing = resolve_timing(timing, [a, b]);
        let v1 = video_of(a, cfg, &timing, progress)?;
        let v2 = video_of(b, cfg, &timing, progress)?;
        let dynamic = compare_dynamic([&v1, &v2], [&a.points[..], &b.points[..]], &timing, baseline, &cfg.dynamic, &cfg.metrics)?;
        debug!("{} vs {}: {} pooling windows", a.name, b.name, dynamic.windows.len());
        return Ok(score_rows(a, b, &dynamic.mean));
    }

    let s1 = Plane::from(saliency_of(a, cfg, progress)?.as_ref());
    let s2 = Plane::from(saliency_of(b, cfg, progress)?.as_ref());
    let f1 = fixations_of(a, s1.w, s1.h).map(|m| Plane::from(&m));
    let f2 = fixations_of(b, s2.w, s2.h).map(|m| Plane::from(&m));
    let fixations = match (&f1, &f2) {
        (Some(f1), Some(f2)) => Some([f1, f2]),
        _ => {
            warn!("{} vs {}: no fixations on one side, comparing against saliency", a.name, b.name);
            None
        }
    };
    let pair = MapPair {
        saliency: [&s1, &s2],
        fixations,
        baseline,
    };
    Ok(score_rows(a, b, &compare_saliency(&pair, &cfg.metrics)))
}

/// MultiMatch between the scanpaths of `a` and `b`; `None` when either has none.
pub fn compare_scanpaths(a: &LoadedInput, b: &LoadedInput, cfg: &CompareConfig) -> Result<Option<Vec<ComparisonRow>>> {
    if a.scanpath.is_empty() || b.scanpath.is_empty() {
        warn!("{} vs {}: scanpath comparison needs fixations on both sides", a.name, b.name);
        return Ok(None);
    }
    let result = match &cfg.pipeline.video {
        Some(timing) => {
            let timing = resolve_timing(timing, [a, b]);
            let out = compare_scanpaths_dynamic(&a.scanpath, &b.scanpath, &timing, &cfg.weights, &cfg.scanpath_window)?;
            debug!("{} vs {}: {} scanpath windows", a.name, b.name, out.windows_compared);
            out.result
        }
        None => multimatch(&a.scanpath, &b.scanpath, &cfg.weights)?.result,
    };
    Ok(Some(multimatch_rows(a, b, &result)))
}

/// Every enabled comparison, in table order.
pub fn compare_inputs(
    a: &LoadedInput,
    b: &LoadedInput,
    baseline: Option<&Plane>,
    cfg: &CompareConfig,
    progress: &mut dyn Progress,
) -> Result<Vec<ComparisonRow>> {
    let mut rows = Vec::new();
    if cfg.saliency {
        rows.extend(compare_maps(a, b, baseline, cfg, progress)?);
    }
    if cfg.scanpath {
        if let Some(mm) = compare_scanpaths(a, b, cfg)? {
            rows.extend(mm);
        }
    }
    Ok(rows)
}
