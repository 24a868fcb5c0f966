//! Angular velocity, outlier rejection and velocity smoothing.
//!
//! Velocities are in rad/ms. The last sample has no successor, so it repeats
//! the first velocity to keep the signal parallel to the samples.
use crate::sphere::angle_between;
use log::{debug, warn};
use nalgebra::{DMatrix, Vector3};
use serde::{Deserialize, Serialize};

/// Optional smoothing applied to the velocity signal before segmentation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum VelocityFilter {
    #[default]
    None,
    /// Gaussian smoothing with standard deviation `sigma` in samples.
    Gauss {
        #[serde(default = "default_sigma")]
        sigma: f64,
    },
    /// Savitzky–Golay smoothing.
    Savgol {
        #[serde(default = "default_window")]
        window: usize,
        #[serde(default = "default_poly")]
        poly: usize,
    },
}

fn default_sigma() -> f64 {
    4.0
}

fn default_window() -> usize {
    9
}

fn default_poly() -> usize {
    2
}

impl VelocityFilter {
    pub fn gauss() -> Self {
        VelocityFilter::Gauss { sigma: default_sigma() }
    }

    pub fn savgol() -> Self {
        VelocityFilter::Savgol {
            window: default_window(),
            poly: default_poly(),
        }
    }

    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        match *self {
            VelocityFilter::None => signal.to_vec(),
            VelocityFilter::Gauss { sigma } => gaussian_filter(signal, sigma),
            VelocityFilter::Savgol { window, poly } => savgol_filter(signal, window, poly),
        }
    }
}

/// Angular distance between consecutive samples divided by their time step.
pub fn angular_velocity(directions: &[Vector3<f64>], timestamps: &[f64]) -> Vec<f64> {
    let n = directions.len().min(timestamps.len());
    if n < 2 {
        return vec![0.0; n];
    }
    let mut velocity: Vec<f64> = (1..n)
        .map(|i| angle_between(&directions[i], &directions[i - 1]) / (timestamps[i] - timestamps[i - 1]))
        .collect();
    velocity.push(velocity[0]);
    velocity
}

/// Samples to keep: finite and within `sigma` standard deviations of the mean.
///
/// Mean and standard deviation ignore non-finite values. A signal without
/// spread keeps every finite sample.
pub fn outlier_mask(velocity: &[f64], sigma: f64) -> Vec<bool> {
    let finite: Vec<f64> = velocity.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return vec![false; velocity.len()];
    }
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    let var = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / finite.len() as f64;
    let std = var.sqrt();

    let keep: Vec<bool> = velocity
        .iter()
        .map(|&v| v.is_finite() && (std <= f64::EPSILON * mean.abs().max(1.0) || ((v - mean) / std).abs() < sigma))
        .collect();
    let removed = keep.iter().filter(|k| !**k).count();
    debug!("Removed {} samples more than {} sigmas away from the mean", removed, sigma);
    keep
}

/// Mirror-reflects an out-of-range index (`d c b a | a b c d`).
fn reflect_index(idx: isize, len: usize) -> usize {
    let len = len as isize;
    let period = 2 * len;
    let mut i = idx.rem_euclid(period);
    if i >= len {
        i = period - 1 - i;
    }
    i as usize
}

/// 1D Gaussian smoothing truncated at four standard deviations with
/// reflective borders.
pub fn gaussian_filter(signal: &[f64], sigma: f64) -> Vec<f64> {
    if signal.is_empty() || sigma <= 0.0 {
        return signal.to_vec();
    }
    let radius = (4.0 * sigma + 0.5) as isize;
    let mut taps: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let norm: f64 = taps.iter().sum();
    taps.iter_mut().for_each(|t| *t /= norm);

    (0..signal.len() as isize)
        .map(|i| {
            taps.iter()
                .enumerate()
                .map(|(k, &tap)| tap * signal[reflect_index(i + k as isize - radius, signal.len())])
                .sum()
        })
        .collect()
}

/// Hat matrix of a least-squares polynomial fit over `window` equally spaced
/// points; row `k` evaluates the fit at the `k`-th point.
fn savgol_projection(window: usize, poly: usize) -> Option<DMatrix<f64>> {
    let half = (window / 2) as f64;
    let a = DMatrix::from_fn(window, poly + 1, |i, j| (i as f64 - half).powi(j as i32));
    let ata_inv = (a.transpose() * &a).try_inverse()?;
    Some(&a * ata_inv * a.transpose())
}

/// Savitzky–Golay smoothing. Edges are handled by fitting a polynomial to the
/// first and last windows and evaluating it at the edge samples.
pub fn savgol_filter(signal: &[f64], window: usize, poly: usize) -> Vec<f64> {
    if window % 2 == 0 || poly >= window {
        warn!("Savitzky-Golay window {window} must be odd and larger than poly {poly}; signal left unfiltered");
        return signal.to_vec();
    }
    if signal.len() < window {
        warn!(
            "Savitzky-Golay window {} longer than signal ({} samples); signal left unfiltered",
            window,
            signal.len()
        );
        return signal.to_vec();
    }
    let Some(h) = savgol_projection(window, poly) else {
        return signal.to_vec();
    };
    let half = window / 2;
    let n = signal.len();
    let dot_row = |row: usize, start: usize| -> f64 { (0..window).map(|k| h[(row, k)] * signal[start + k]).sum() };

    (0..n)
        .map(|i| {
            if i < half {
                dot_row(i, 0)
            } else if i + half >= n {
                dot_row(window - (n - i), n - window)
            } else {
                dot_row(half, i - half)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_repeats_first_value_at_end() {
        let dirs = vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let ts = [0.0, 10.0, 20.0];
        let v = angular_velocity(&dirs, &ts);
        assert_eq!(v.len(), 3);
        assert!((v[0] - std::f64::consts::FRAC_PI_2 / 10.0).abs() < 1e-12);
        assert_eq!(v[1], 0.0);
        assert_eq!(v[2], v[0]);
    }

    #[test]
    fn outliers_and_non_finite_are_dropped() {
        let mut v = vec![1.0; 200];
        v[50] = 1000.0;
        v[60] = f64::NAN;
        v[70] = f64::INFINITY;
        let keep = outlier_mask(&v, 5.0);
        assert!(!keep[50] && !keep[60] && !keep[70]);
        assert_eq!(keep.iter().filter(|k| **k).count(), 197);
    }

    #[test]
    fn constant_signal_keeps_everything() {
        let keep = outlier_mask(&[0.5; 10], 5.0);
        assert!(keep.iter().all(|k| *k));
    }

    #[test]
    fn gaussian_preserves_constant_signal() {
        let out = gaussian_filter(&[2.0; 7], 4.0);
        assert!(out.iter().all(|v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn savgol_reproduces_quadratics_exactly() {
        let signal: Vec<f64> = (0..20).map(|i| 0.5 * (i * i) as f64 - 3.0 * i as f64 + 1.0).collect();
        let out = savgol_filter(&signal, 9, 2);
        for (a, b) in out.iter().zip(signal.iter()) {
            assert!((a - b).abs() < 1e-8, "{a} vs {b}");
        }
    }

    #[test]
    fn filter_config_parses_with_defaults() {
        let f: VelocityFilter = serde_json::from_str(r#"{"name":"savgol"}"#).unwrap();
        assert_eq!(f, VelocityFilter::savgol());
        let g: VelocityFilter = serde_json::from_str(r#"{"name":"gauss","sigma":2.0}"#).unwrap();
        assert_eq!(g, VelocityFilter::Gauss { sigma: 2.0 });
    }
}
