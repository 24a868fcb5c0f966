//! Pairwise saliency and fixation-map comparison.
//!
//! Overview
//! - [`MetricKind`] is the fixed registry of comparators. Each declares
//!   whether both argument orderings are averaged and whether its second
//!   argument is a saliency or a fixation map.
//! - [`compare_saliency`] evaluates the selected metrics on two maps and
//!   their fixation maps.
//! - [`dynamic`] pools video frames into temporal windows and compares each
//!   window. [`table`] appends results to a CSV table.
//!
//! Notes
//! - Maps of different sizes are resampled bicubically onto the grid of the
//!   second argument before comparison.
//! - Degenerate inputs produce `NaN`, never an error.
pub mod auc;
pub mod distribution;
pub mod dynamic;
pub mod table;
pub mod weight;

use crate::image::{resize_bicubic, ImageF32};
use crate::saliency::FixationMap;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Dense f64 grid, the working precision of every metric.
#[derive(Clone, Debug, PartialEq)]
pub struct Plane {
    pub w: usize,
    pub h: usize,
    pub data: Vec<f64>,
}

impl Plane {
    pub fn zeros(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0.0; w * h],
        }
    }

    /// Copy of `self` resampled to the shape of `target`.
    pub fn resized_like(&self, target: &Plane) -> Plane {
        if (self.w, self.h) == (target.w, target.h) {
            return self.clone();
        }
        Plane {
            w: target.w,
            h: target.h,
            data: resize_bicubic(&self.data, self.w, self.h, target.w, target.h),
        }
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }
}

impl From<&ImageF32> for Plane {
    fn from(map: &ImageF32) -> Self {
        Self {
            w: map.w,
            h: map.h,
            data: map.to_f64(),
        }
    }
}

impl From<&FixationMap> for Plane {
    fn from(map: &FixationMap) -> Self {
        Self {
            w: map.w,
            h: map.h,
            data: map.to_f64(),
        }
    }
}

/// Kind of map a metric expects as its second argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecondArg {
    Saliency,
    Fixation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    #[serde(rename = "AUC_Judd")]
    AucJudd,
    #[serde(rename = "AUC_Borji")]
    AucBorji,
    #[serde(rename = "NSS")]
    Nss,
    #[serde(rename = "CC")]
    Cc,
    #[serde(rename = "SIM")]
    Sim,
    #[serde(rename = "KLD")]
    Kld,
    #[serde(rename = "InfoGain")]
    InfoGain,
}

impl MetricKind {
    pub const ALL: [MetricKind; 7] = [
        MetricKind::AucJudd,
        MetricKind::AucBorji,
        MetricKind::Nss,
        MetricKind::Cc,
        MetricKind::Sim,
        MetricKind::Kld,
        MetricKind::InfoGain,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricKind::AucJudd => "AUC_Judd",
            MetricKind::AucBorji => "AUC_Borji",
            MetricKind::Nss => "NSS",
            MetricKind::Cc => "CC",
            MetricKind::Sim => "SIM",
            MetricKind::Kld => "KLD",
            MetricKind::InfoGain => "InfoGain",
        }
    }

    /// `true` when the metric is averaged over `(a, b)` and `(b, a)`.
    pub fn both_orderings(self) -> bool {
        !matches!(self, MetricKind::Kld)
    }

    pub fn second_arg(self) -> SecondArg {
        match self {
            MetricKind::AucJudd | MetricKind::AucBorji | MetricKind::Nss | MetricKind::InfoGain => SecondArg::Fixation,
            MetricKind::Cc | MetricKind::Sim | MetricKind::Kld => SecondArg::Saliency,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricOptions {
    /// Metrics to evaluate, in registry order by default.
    pub metrics: Vec<MetricKind>,
    /// Seed of the AUC-Borji negative sampler.
    pub seed: u64,
    pub borji_repetitions: usize,
    pub borji_step: f64,
}

impl Default for MetricOptions {
    fn default() -> Self {
        Self {
            metrics: MetricKind::ALL.to_vec(),
            seed: 0,
            borji_repetitions: 100,
            borji_step: 0.1,
        }
    }
}

pub type Scores = BTreeMap<MetricKind, f64>;

/// The two maps under comparison and their optional ground truth.
#[derive(Clone, Copy, Debug)]
pub struct MapPair<'a> {
    pub saliency: [&'a Plane; 2],
    /// Fixation maps matching `saliency`. Without them the other saliency
    /// map stands in as ground truth, thresholded at 0.5.
    pub fixations: Option<[&'a Plane; 2]>,
    /// Reference map for InfoGain, which is skipped without one.
    pub baseline: Option<&'a Plane>,
}

fn evaluate(kind: MetricKind, map: &Plane, other: &Plane, baseline: Option<&Plane>, opts: &MetricOptions, rng: &mut StdRng) -> f64 {
    match kind {
        MetricKind::AucJudd => auc::auc_judd(map, other),
        MetricKind::AucBorji => auc::auc_borji(map, other, opts.borji_repetitions, opts.borji_step, rng),
        MetricKind::Nss => distribution::nss(map, other),
        MetricKind::Cc => distribution::cc(map, other),
        MetricKind::Sim => distribution::sim(map, other),
        MetricKind::Kld => distribution::kld(map, other),
        MetricKind::InfoGain => match baseline {
            Some(b) => distribution::info_gain(map, other, b),
            None => f64::NAN,
        },
    }
}

/// Evaluates `opts.metrics` on `pair`.
pub fn compare_saliency(pair: &MapPair<'_>, opts: &MetricOptions) -> Scores {
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let [s1, s2] = pair.saliency;
    let mut scores = Scores::new();
    for &kind in &opts.metrics {
        if kind == MetricKind::InfoGain && pair.baseline.is_none() {
            continue;
        }
        let (o1, o2) = match (kind.second_arg(), pair.fixations) {
            (SecondArg::Fixation, Some([f1, f2])) => (f2, f1),
            _ => (s2, s1),
        };
        let value = if kind.both_orderings() {
            let ab = evaluate(kind, s1, o1, pair.baseline, opts, &mut rng);
            let ba = evaluate(kind, s2, o2, pair.baseline, opts, &mut rng);
            (ab + ba) / 2.0
        } else {
            evaluate(kind, s1, o1, pair.baseline, opts, &mut rng)
        };
        debug!("{kind}: {value:.5e}");
        scores.insert(kind, value);
    }
    scores
}

/// Mean ignoring `NaN` entries; `NaN` when nothing remains.
pub fn nan_mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (sum, n) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}
