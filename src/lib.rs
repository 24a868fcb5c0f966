#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod progress;
pub mod types;

// Stage modules, usable on their own.
pub mod features;
pub mod metrics;
pub mod preprocess;
pub mod saliency;
pub mod scanpath;
pub mod segment;
pub mod sphere;

// --- High-level re-exports -------------------------------------------------

// Main entry points: recording processor and its output.
pub use crate::error::{GazeError, Result};
pub use crate::pipeline::{process_batch, GazeProcessor, ProcessOutput};
pub use crate::types::{FixationPoint, FixationRecord, GazeSample, LabelSequence, Track};

// Run reports.
pub use crate::diagnostics::{ProcessReport, TimingBreakdown};

// Maps, metrics and scanpaths.
pub use crate::metrics::{compare_saliency, MetricKind, MetricOptions, Plane};
pub use crate::saliency::{build_saliency, SaliencyOptions};
pub use crate::scanpath::{multimatch, MultiMatchWeights};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use gaze360::prelude::*;
/// use std::path::Path;
///
/// # fn main() -> gaze360::Result<()> {
/// let processor = GazeProcessor::new(PreprocessOptions::default(), SegmenterConfig::default());
/// let out = processor.process_path(Path::new("viewer.csv"), &mut NoProgress)?;
/// let points = out.fixation_points(Track::Gaze);
/// let map = build_saliency(&points, &SaliencyOptions::default(), &mut NoProgress)?;
/// println!("{} fixations, saliency mass {:.3}", points.len(), map.sum());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::image::ImageF32;
    pub use crate::preprocess::PreprocessOptions;
    pub use crate::progress::{NoProgress, Progress};
    pub use crate::segment::SegmenterConfig;
    pub use crate::{build_saliency, GazeProcessor, ProcessOutput, SaliencyOptions, Track};
}
