//! Hidden Markov model identification (I-HMM).
//!
//! A Gaussian-emission HMM with `n_states` hidden states is fitted to the
//! velocity signal with Baum–Welch, then the most likely state path is decoded
//! with Viterbi. The state with the lowest emission mean models fixations.
//!
//! Notes
//! - Emission means start at equally sized quantile chunks of the sorted
//!   signal, so the fit is deterministic.
//! - Forward/backward passes are scaled per sample; Viterbi runs in log space.
use super::cleanup::remove_isolated;
use super::{SegmentationSignal, Segmenter};
use crate::error::{GazeError, Result};
use crate::progress::Progress;
use crate::types::LabelSequence;
use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const NAME: &str = "I-HMM";

const MIN_PROB: f64 = 1e-300;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmmParams {
    pub n_states: usize,
    pub max_iterations: usize,
    /// Stop when the log-likelihood improves by less than this.
    pub tolerance: f64,
}

impl Default for HmmParams {
    fn default() -> Self {
        Self {
            n_states: 2,
            max_iterations: 50,
            tolerance: 1e-6,
        }
    }
}

/// Fitted model parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianHmm {
    pub start: Vec<f64>,
    /// Row-major `k × k` transition matrix.
    pub transition: Vec<f64>,
    pub means: Vec<f64>,
    pub variances: Vec<f64>,
}

impl GaussianHmm {
    fn n_states(&self) -> usize {
        self.means.len()
    }

    fn emission(&self, state: usize, x: f64) -> f64 {
        let var = self.variances[state];
        let d = x - self.means[state];
        ((-0.5 * d * d / var).exp() / (2.0 * PI * var).sqrt()).max(MIN_PROB)
    }

    /// Quantile initialisation: sorted data cut into `k` equal chunks.
    fn initial(data: &[f64], k: usize, var_floor: f64) -> Self {
        let mut sorted = data.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let chunk = (sorted.len() / k).max(1);
        let mut means = Vec::with_capacity(k);
        let mut variances = Vec::with_capacity(k);
        for s in 0..k {
            let lo = (s * chunk).min(sorted.len() - 1);
            let hi = if s + 1 == k { sorted.len() } else { ((s + 1) * chunk).min(sorted.len()) };
            let part = &sorted[lo..hi.max(lo + 1)];
            let mean = part.iter().sum::<f64>() / part.len() as f64;
            let var = part.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / part.len() as f64;
            means.push(mean);
            variances.push(var.max(var_floor));
        }
        let stay = 0.9;
        let leave = if k > 1 { (1.0 - stay) / (k - 1) as f64 } else { 0.0 };
        let transition = (0..k * k)
            .map(|idx| if idx / k == idx % k { stay } else { leave })
            .collect();
        Self {
            start: vec![1.0 / k as f64; k],
            transition,
            means,
            variances,
        }
    }

    /// Scaled forward-backward; returns `(gamma, xi_sum, log_likelihood)`.
    fn expectations(&self, data: &[f64]) -> (Vec<f64>, Vec<f64>, f64) {
        let k = self.n_states();
        let t_len = data.len();
        let mut alpha = vec![0.0; t_len * k];
        let mut scale = vec![0.0; t_len];

        for s in 0..k {
            alpha[s] = self.start[s] * self.emission(s, data[0]);
        }
        scale[0] = alpha[..k].iter().sum::<f64>().max(MIN_PROB);
        alpha[..k].iter_mut().for_each(|a| *a /= scale[0]);

        for t in 1..t_len {
            for s in 0..k {
                let incoming: f64 = (0..k).map(|p| alpha[(t - 1) * k + p] * self.transition[p * k + s]).sum();
                alpha[t * k + s] = incoming * self.emission(s, data[t]);
            }
            scale[t] = alpha[t * k..(t + 1) * k].iter().sum::<f64>().max(MIN_PROB);
            alpha[t * k..(t + 1) * k].iter_mut().for_each(|a| *a /= scale[t]);
        }

        let mut beta = vec![0.0; t_len * k];
        beta[(t_len - 1) * k..].iter_mut().for_each(|b| *b = 1.0);
        for t in (0..t_len - 1).rev() {
            for s in 0..k {
                let outgoing: f64 = (0..k)
                    .map(|n| self.transition[s * k + n] * self.emission(n, data[t + 1]) * beta[(t + 1) * k + n])
                    .sum();
                beta[t * k + s] = outgoing / scale[t + 1];
            }
        }

        let mut gamma = vec![0.0; t_len * k];
        for t in 0..t_len {
            let row: Vec<f64> = (0..k).map(|s| alpha[t * k + s] * beta[t * k + s]).collect();
            let norm = row.iter().sum::<f64>().max(MIN_PROB);
            for s in 0..k {
                gamma[t * k + s] = row[s] / norm;
            }
        }

        let mut xi_sum = vec![0.0; k * k];
        for t in 0..t_len - 1 {
            let mut local = vec![0.0; k * k];
            for p in 0..k {
                for n in 0..k {
                    local[p * k + n] = alpha[t * k + p]
                        * self.transition[p * k + n]
                        * self.emission(n, data[t + 1])
                        * beta[(t + 1) * k + n];
                }
            }
            let norm = local.iter().sum::<f64>().max(MIN_PROB);
            for (acc, v) in xi_sum.iter_mut().zip(local) {
                *acc += v / norm;
            }
        }

        let log_likelihood = scale.iter().map(|c| c.ln()).sum();
        (gamma, xi_sum, log_likelihood)
    }

    fn maximize(&mut self, data: &[f64], gamma: &[f64], xi_sum: &[f64], var_floor: f64) {
        let k = self.n_states();
        for s in 0..k {
            self.start[s] = gamma[s];
        }
        for p in 0..k {
            let row_total: f64 = (0..k).map(|n| xi_sum[p * k + n]).sum();
            if row_total > MIN_PROB {
                for n in 0..k {
                    self.transition[p * k + n] = xi_sum[p * k + n] / row_total;
                }
            }
        }
        for s in 0..k {
            let weight: f64 = (0..data.len()).map(|t| gamma[t * k + s]).sum();
            if weight <= MIN_PROB {
                continue;
            }
            let mean = (0..data.len()).map(|t| gamma[t * k + s] * data[t]).sum::<f64>() / weight;
            let var = (0..data.len())
                .map(|t| gamma[t * k + s] * (data[t] - mean).powi(2))
                .sum::<f64>()
                / weight;
            self.means[s] = mean;
            self.variances[s] = var.max(var_floor);
        }
    }

    /// Fits a model with `k` states to `data`.
    pub fn fit(data: &[f64], params: &HmmParams, progress: &mut dyn Progress) -> Result<Self> {
        let k = params.n_states;
        if k < 2 {
            return Err(GazeError::InvalidParameter(format!(
                "I-HMM needs at least 2 states, got {k}"
            )));
        }
        if data.len() < k {
            return Err(GazeError::InvalidParameter(format!(
                "I-HMM needs at least {k} samples, got {}",
                data.len()
            )));
        }
        let mean = data.iter().sum::<f64>() / data.len() as f64;
        let spread = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / data.len() as f64;
        let var_floor = (spread * 1e-6).max(1e-18);

        let mut model = Self::initial(data, k, var_floor);
        let mut previous = f64::NEG_INFINITY;
        for iteration in 0..params.max_iterations {
            let (gamma, xi_sum, log_likelihood) = model.expectations(data);
            model.maximize(data, &gamma, &xi_sum, var_floor);
            if !progress.update(0.8 * (iteration + 1) as f64 / params.max_iterations as f64) {
                return Err(GazeError::Cancelled);
            }
            if (log_likelihood - previous).abs() < params.tolerance {
                debug!("I-HMM converged after {} iterations", iteration + 1);
                break;
            }
            previous = log_likelihood;
        }
        Ok(model)
    }

    /// Most likely state sequence.
    pub fn viterbi(&self, data: &[f64]) -> Vec<usize> {
        let k = self.n_states();
        let t_len = data.len();
        if t_len == 0 {
            return Vec::new();
        }
        let ln = |p: f64| p.max(MIN_PROB).ln();
        let mut score: Vec<f64> = (0..k).map(|s| ln(self.start[s]) + ln(self.emission(s, data[0]))).collect();
        let mut back = vec![0usize; t_len * k];
        for t in 1..t_len {
            let mut next = vec![f64::NEG_INFINITY; k];
            for s in 0..k {
                let (best_prev, best) = (0..k)
                    .map(|p| (p, score[p] + ln(self.transition[p * k + s])))
                    .fold((0, f64::NEG_INFINITY), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
                next[s] = best + ln(self.emission(s, data[t]));
                back[t * k + s] = best_prev;
            }
            score = next;
        }
        let mut state = (0..k)
            .max_by(|&a, &b| score[a].total_cmp(&score[b]))
            .unwrap_or(0);
        let mut path = vec![0usize; t_len];
        for t in (0..t_len).rev() {
            path[t] = state;
            state = back[t * k + state];
        }
        path
    }

    /// Index of the state with the lowest emission mean.
    pub fn fixation_state(&self) -> usize {
        (0..self.n_states())
            .min_by(|&a, &b| self.means[a].total_cmp(&self.means[b]))
            .unwrap_or(0)
    }
}

#[derive(Clone, Debug, Default)]
pub struct HmmSegmenter {
    params: HmmParams,
}

impl HmmSegmenter {
    pub fn new(params: HmmParams) -> Self {
        Self { params }
    }
}

impl Segmenter for HmmSegmenter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn segment(&self, signal: &SegmentationSignal, progress: &mut dyn Progress) -> Result<LabelSequence> {
        let model = GaussianHmm::fit(&signal.velocity, &self.params, progress)?;
        let fixation = model.fixation_state();
        let mut labels: LabelSequence = model
            .viterbi(&signal.velocity)
            .into_iter()
            .map(|s| s == fixation)
            .collect();
        remove_isolated(&mut labels);
        debug!(
            "I-HMM means={:?} fixation state={} ({} fixation samples)",
            model.means,
            fixation,
            labels.iter().filter(|l| **l).count()
        );
        if !progress.update(1.0) {
            return Err(GazeError::Cancelled);
        }
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;

    fn two_regime_signal() -> Vec<f64> {
        // Slow stretches of 40 samples separated by fast bursts of 8 samples.
        let mut data = Vec::new();
        for block in 0..6 {
            for i in 0..40 {
                data.push(0.0005 + 0.00005 * ((i + block) % 5) as f64);
            }
            for i in 0..8 {
                data.push(0.01 + 0.001 * (i % 3) as f64);
            }
        }
        data
    }

    #[test]
    fn fit_separates_slow_and_fast_regimes() {
        let data = two_regime_signal();
        let model = GaussianHmm::fit(&data, &HmmParams::default(), &mut NoProgress).unwrap();
        let slow = model.fixation_state();
        assert!(model.means[slow] < 0.002);
        let path = model.viterbi(&data);
        assert!(path[..40].iter().all(|&s| s == slow));
        assert!(path[40..48].iter().all(|&s| s != slow));
    }

    #[test]
    fn segmenter_marks_slow_samples_as_fixation() {
        let velocity = two_regime_signal();
        let signal = SegmentationSignal {
            timestamps: (0..velocity.len()).map(|i| i as f64 * 8.0).collect(),
            directions: Vec::new(),
            velocity,
        };
        let labels = HmmSegmenter::default().segment(&signal, &mut NoProgress).unwrap();
        assert_eq!(labels.iter().filter(|l| **l).count(), 240);
    }

    #[test]
    fn single_state_is_rejected() {
        let params = HmmParams {
            n_states: 1,
            ..Default::default()
        };
        let err = GaussianHmm::fit(&[0.1, 0.2], &params, &mut NoProgress).unwrap_err();
        assert!(matches!(err, GazeError::InvalidParameter(_)));
    }
}
