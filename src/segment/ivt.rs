//! Velocity-threshold identification (I-VT).
//!
//! Samples at or below the angular speed threshold are fixations. After the
//! shared cleanup, fixation runs shorter than the minimum duration are
//! relabelled as saccade, repeating until no short run remains.
use super::cleanup::remove_isolated;
use super::{SegmentationSignal, Segmenter};
use crate::error::Result;
use crate::progress::Progress;
use crate::types::LabelSequence;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const NAME: &str = "I-VT";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IvtParams {
    /// Saccade threshold (deg/s).
    pub threshold: f64,
    /// Minimum fixation duration (ms).
    pub min_fixation_ms: f64,
    /// Upper bound on merge passes over the label sequence.
    pub max_iterations: usize,
}

impl Default for IvtParams {
    fn default() -> Self {
        Self {
            threshold: 120.0,
            min_fixation_ms: 80.0,
            max_iterations: 1000,
        }
    }
}

impl IvtParams {
    /// Threshold converted to rad/ms.
    pub fn threshold_rad_per_ms(&self) -> f64 {
        self.threshold.to_radians() / 1000.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct VelocityThresholdSegmenter {
    params: IvtParams,
}

impl VelocityThresholdSegmenter {
    pub fn new(params: IvtParams) -> Self {
        Self { params }
    }
}

/// One sweep relabelling short fixation runs. A run is measured from the
/// last saccade sample before it to its last sample.
fn drop_short_fixations(labels: &mut [bool], timestamps: &[f64], min_ms: f64) -> bool {
    let n = labels.len();
    let mut changed = false;
    let mut i = 1usize;
    while i + 1 < n {
        if !labels[i] && labels[i + 1] {
            let start = i;
            while i + 1 < n && labels[i + 1] {
                i += 1;
            }
            if timestamps[i] - timestamps[start] < min_ms {
                labels[start..=i].iter_mut().for_each(|l| *l = false);
                changed = true;
            }
        } else {
            i += 1;
        }
    }
    changed
}

/// Labels samples from `velocity` and enforces the minimum fixation duration.
pub fn label_by_velocity(timestamps: &[f64], velocity: &[f64], params: &IvtParams) -> LabelSequence {
    let threshold = params.threshold_rad_per_ms();
    let mut labels: LabelSequence = velocity.iter().map(|&v| v <= threshold).collect();
    remove_isolated(&mut labels);

    let mut passes = 0usize;
    loop {
        if !drop_short_fixations(&mut labels, timestamps, params.min_fixation_ms) {
            break;
        }
        passes += 1;
        if passes >= params.max_iterations {
            warn!(
                "I-VT short-fixation removal stopped after {} passes without settling",
                params.max_iterations
            );
            break;
        }
    }
    debug!(
        "I-VT labelled {} of {} samples as fixation ({} merge passes)",
        labels.iter().filter(|l| **l).count(),
        labels.len(),
        passes
    );
    labels
}

impl Segmenter for VelocityThresholdSegmenter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn segment(&self, signal: &SegmentationSignal, progress: &mut dyn Progress) -> Result<LabelSequence> {
        let labels = label_by_velocity(&signal.timestamps, &signal.velocity, &self.params);
        if !progress.update(1.0) {
            return Err(crate::error::GazeError::Cancelled);
        }
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deg_per_s(v: f64) -> f64 {
        v.to_radians() / 1000.0
    }

    #[test]
    fn threshold_splits_slow_and_fast_samples() {
        let ts: Vec<f64> = (0..60).map(|i| i as f64 * 10.0).collect();
        let mut vel = vec![deg_per_s(20.0); 60];
        for v in &mut vel[20..25] {
            *v = deg_per_s(300.0);
        }
        let labels = label_by_velocity(&ts, &vel, &IvtParams::default());
        assert!(labels[..20].iter().all(|l| *l));
        assert!(labels[20..25].iter().all(|l| !*l));
        assert!(labels[25..].iter().all(|l| *l));
    }

    #[test]
    fn short_fixations_become_saccades() {
        let ts: Vec<f64> = (0..40).map(|i| i as f64 * 10.0).collect();
        let mut vel = vec![deg_per_s(300.0); 40];
        // 50 ms of slow samples between two fast stretches.
        for v in &mut vel[10..15] {
            *v = deg_per_s(10.0);
        }
        // 150 ms stretch survives.
        for v in &mut vel[25..40] {
            *v = deg_per_s(10.0);
        }
        let labels = label_by_velocity(&ts, &vel, &IvtParams::default());
        assert!(labels[..25].iter().all(|l| !*l));
        assert!(labels[25..].iter().all(|l| *l));
    }

    #[test]
    fn iteration_cap_is_respected() {
        let ts: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let vel: Vec<f64> = (0..20).map(|i| if i % 4 < 2 { 0.0 } else { 1.0 }).collect();
        let params = IvtParams {
            max_iterations: 1,
            ..Default::default()
        };
        let labels = label_by_velocity(&ts, &vel, &params);
        assert_eq!(labels.len(), 20);
    }
}
