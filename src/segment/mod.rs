//! Fixation/saccade segmentation.
//!
//! Overview
//! - [`Segmenter`] labels every sample of a [`SegmentationSignal`] as fixation
//!   (`true`) or saccade (`false`).
//! - Strategies: velocity threshold ([`ivt`]), Gaussian hidden Markov model
//!   ([`ihmm`]) and density clustering ([`ict`]). All finish with the shared
//!   [`cleanup`] pass.
//! - [`SegmenterRegistry`] resolves strategies by name ("I-VT", "I-HMM",
//!   "I-CT"). Names without an implementation are absent; callers check the
//!   returned `Option`.
pub mod cleanup;
pub mod ict;
pub mod ihmm;
pub mod ivt;

use crate::error::Result;
use crate::preprocess::VelocitySignal;
use crate::progress::Progress;
use crate::types::LabelSequence;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use ict::{ClusterSegmenter, IctParams};
pub use ihmm::{HmmParams, HmmSegmenter};
pub use ivt::{IvtParams, VelocityThresholdSegmenter};

/// Input shared by all strategies. The three vectors are parallel.
#[derive(Clone, Debug, Default)]
pub struct SegmentationSignal {
    pub timestamps: Vec<f64>,
    /// Gaze direction per sample.
    pub directions: Vec<Vector3<f64>>,
    /// Angular speed per sample (rad/ms).
    pub velocity: Vec<f64>,
}

impl SegmentationSignal {
    pub fn from_velocity_signal(signal: &VelocitySignal) -> Self {
        Self {
            timestamps: signal.samples.iter().map(|s| s.timestamp_ms).collect(),
            directions: signal.samples.iter().map(|s| s.gaze).collect(),
            velocity: signal.velocity.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// A fixation/saccade labelling strategy.
pub trait Segmenter: Send + Sync {
    /// Registry key, e.g. `"I-VT"`.
    fn name(&self) -> &'static str;

    /// Labels every sample; `true` marks fixation samples.
    fn segment(&self, signal: &SegmentationSignal, progress: &mut dyn Progress) -> Result<LabelSequence>;
}

/// Which strategy to use and the parameters of every strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub name: String,
    pub ivt: IvtParams,
    pub hmm: HmmParams,
    pub ict: IctParams,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            name: ivt::NAME.to_string(),
            ivt: IvtParams::default(),
            hmm: HmmParams::default(),
            ict: IctParams::default(),
        }
    }
}

/// Name-keyed collection of available strategies.
#[derive(Default)]
pub struct SegmenterRegistry {
    entries: BTreeMap<&'static str, Box<dyn Segmenter>>,
}

impl SegmenterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in strategies configured from `config`.
    pub fn from_config(config: &SegmenterConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(VelocityThresholdSegmenter::new(config.ivt.clone())));
        registry.register(Box::new(HmmSegmenter::new(config.hmm.clone())));
        registry.register(Box::new(ClusterSegmenter::new(config.ict.clone())));
        registry
    }

    /// Adds or replaces a strategy under its own name.
    pub fn register(&mut self, segmenter: Box<dyn Segmenter>) {
        self.entries.insert(segmenter.name(), segmenter);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Segmenter> {
        self.entries.get(name).map(|s| s.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

impl std::fmt::Debug for SegmenterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}
