use crate::diagnostics::TimingBreakdown;
use serde::Serialize;

/// Summary of one recording run through [`GazeProcessor`](crate::pipeline::GazeProcessor).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessReport {
    pub name: String,
    pub input: InputDescriptor,
    /// Strategy used, or `"head"` for head-only tracking.
    pub segmenter: String,
    pub fixation_samples: usize,
    pub fixations: usize,
    pub degenerate: bool,
    pub timings: TimingBreakdown,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    /// Rows read from the recording.
    pub raw_samples: usize,
    /// Samples left after validity checks, resampling and outlier removal.
    pub kept_samples: usize,
    pub duration_ms: f64,
}

impl ProcessReport {
    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} fixations from {}/{} samples ({:.1} s, {}) in {:.3} ms{}",
            self.name,
            self.fixations,
            self.input.kept_samples,
            self.input.raw_samples,
            self.input.duration_ms / 1000.0,
            self.segmenter,
            self.timings.total_ms,
            if self.degenerate { " [degenerate]" } else { "" }
        )
    }
}
