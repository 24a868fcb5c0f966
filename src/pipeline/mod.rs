//! Recording-level orchestration.
//!
//! Overview
//! - [`GazeProcessor`] runs one raw recording through preprocessing,
//!   segmentation and feature extraction and times every stage.
//! - [`process_batch`] fans independent recordings out over a thread pool
//!   (feature `parallel`) and keeps one `Result` per file.
//! - [`input`] classifies comparison inputs (raw recordings, fixation lists,
//!   binary maps) and loads them into a common shape; [`compare`] turns
//!   two loaded inputs into comparison table rows.
//!
//! Notes
//! - Head-only tracking skips the segmenters: the head trajectory is
//!   downsampled into one-sample fixations instead.
//! - The segmenter name is resolved before any work so an unknown strategy
//!   fails fast with [`GazeError::InvalidParameter`].
pub mod compare;
pub mod input;

use crate::diagnostics::{InputDescriptor, ProcessReport, StageTiming, TimingBreakdown};
use crate::error::{GazeError, Result};
use crate::features::{extract_features, FeatureSet};
use crate::preprocess::{self, head, load_raw_recording, velocity_signal, PreprocessOptions, RawRecording, TrackingMode};
use crate::progress::{NoProgress, Progress};
use crate::saliency::{points_from_records, points_from_samples};
use crate::scanpath::{scanpath_from_records, ScanpathVector};
use crate::segment::{SegmentationSignal, Segmenter, SegmenterConfig, SegmenterRegistry};
use crate::types::{FixationPoint, GazeSample, LabelSequence, Track};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub use compare::compare_inputs;
pub use input::{detect_input, load_input, InputKind, LoadedInput};

/// Label recorded in reports for head-only tracking.
pub const HEAD_TRAJECTORY: &str = "head";

/// Everything produced for one recording.
#[derive(Clone, Debug)]
pub struct ProcessOutput {
    pub samples: Vec<GazeSample>,
    /// Angular speed parallel to `samples` (rad/ms).
    pub velocity: Vec<f64>,
    pub labels: LabelSequence,
    pub features: FeatureSet,
    pub report: ProcessReport,
}

impl ProcessOutput {
    pub fn name(&self) -> &str {
        &self.report.name
    }

    /// Fixation centroids on `track`.
    pub fn fixation_points(&self, track: Track) -> Vec<FixationPoint> {
        points_from_records(&self.features.records, track)
    }

    /// Every retained sample as a zero-duration point.
    pub fn sample_points(&self, track: Track) -> Vec<FixationPoint> {
        points_from_samples(&self.samples, track)
    }

    pub fn scanpath(&self, track: Track) -> Vec<ScanpathVector> {
        scanpath_from_records(&self.features.records, track)
    }
}

/// Preprocessing, segmentation and feature extraction with fixed parameters.
#[derive(Debug)]
pub struct GazeProcessor {
    preprocess: PreprocessOptions,
    segmenter: SegmenterConfig,
    registry: SegmenterRegistry,
}

impl GazeProcessor {
    /// Processor with the built-in strategies configured from `segmenter`.
    pub fn new(preprocess: PreprocessOptions, segmenter: SegmenterConfig) -> Self {
        let registry = SegmenterRegistry::from_config(&segmenter);
        Self {
            preprocess,
            segmenter,
            registry,
        }
    }

    pub fn preprocess_options(&self) -> &PreprocessOptions {
        &self.preprocess
    }

    pub fn segmenter_config(&self) -> &SegmenterConfig {
        &self.segmenter
    }

    /// Registry used to resolve `segmenter.name`; register custom strategies here.
    pub fn registry_mut(&mut self) -> &mut SegmenterRegistry {
        &mut self.registry
    }

    fn resolve_segmenter(&self) -> Result<&dyn Segmenter> {
        self.registry.get(&self.segmenter.name).ok_or_else(|| {
            let known: Vec<&str> = self.registry.names().collect();
            GazeError::InvalidParameter(format!(
                "unknown segmentation strategy '{}' (available: {})",
                self.segmenter.name,
                known.join(", ")
            ))
        })
    }

    /// Loads and processes the recording at `path`.
    pub fn process_path(&self, path: &Path, progress: &mut dyn Progress) -> Result<ProcessOutput> {
        let start = Instant::now();
        let recording = load_raw_recording(path, self.preprocess.eye)?;
        let load_ms = start.elapsed().as_secs_f64() * 1000.0;
        let mut out = self.process_recording(&recording, progress)?;
        out.report.timings.stages.insert(0, StageTiming::new("load", load_ms));
        out.report.timings.total_ms += load_ms;
        Ok(out)
    }

    /// Processes an already loaded recording.
    pub fn process_recording(&self, recording: &RawRecording, progress: &mut dyn Progress) -> Result<ProcessOutput> {
        let total_start = Instant::now();
        let mut timings = TimingBreakdown::default();
        let head_only = self.preprocess.tracking == TrackingMode::Head;
        let segmenter = if head_only {
            None
        } else {
            Some(self.resolve_segmenter()?)
        };

        let samples = timings.measure("preprocess", || preprocess::preprocess(recording, &self.preprocess, &mut *progress))?;

        let (signal, labels) = match segmenter {
            None => {
                let mut samples = samples;
                head::head_as_gaze(&mut samples);
                let signal = timings.measure("velocity", || velocity_signal(samples, &self.preprocess));
                let timestamps: Vec<f64> = signal.samples.iter().map(|s| s.timestamp_ms).collect();
                let labels = timings.measure("segment", || head::downsample_labels(&timestamps, self.preprocess.head_window_ms));
                (signal, labels)
            }
            Some(segmenter) => {
                let signal = timings.measure("velocity", || velocity_signal(samples, &self.preprocess));
                let input = SegmentationSignal::from_velocity_signal(&signal);
                let labels = timings.measure("segment", || segmenter.segment(&input, &mut *progress))?;
                (signal, labels)
            }
        };

        let features = timings.measure("features", || extract_features(&signal.samples, &labels, Some(&signal.velocity)))?;
        timings.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;

        let duration_ms = match (signal.samples.first(), signal.samples.last()) {
            (Some(first), Some(last)) => last.timestamp_ms - first.timestamp_ms,
            _ => 0.0,
        };
        let report = ProcessReport {
            name: recording.name.clone(),
            input: InputDescriptor {
                raw_samples: recording.samples.len(),
                kept_samples: signal.samples.len(),
                duration_ms,
            },
            segmenter: segmenter.map_or(HEAD_TRAJECTORY, |s| s.name()).to_string(),
            fixation_samples: labels.iter().filter(|l| **l).count(),
            fixations: features.len(),
            degenerate: features.degenerate,
            timings,
        };
        info!("{}", report.summary());

        Ok(ProcessOutput {
            samples: signal.samples,
            velocity: signal.velocity,
            labels,
            features,
            report,
        })
    }
}

fn process_one(processor: &GazeProcessor, path: &Path) -> (PathBuf, Result<ProcessOutput>) {
    let result = processor.process_path(path, &mut NoProgress);
    if let Err(err) = &result {
        warn!("skipping {}: {err}", path.display());
    }
    (path.to_path_buf(), result)
}

/// Processes every path independently, in input order.
pub fn process_batch(paths: &[PathBuf], processor: &GazeProcessor) -> Vec<(PathBuf, Result<ProcessOutput>)> {
    #[cfg(feature = "parallel")]
    {
        paths.par_iter().map(|p| process_one(processor, p)).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        paths.iter().map(|p| process_one(processor, p)).collect()
    }
}
