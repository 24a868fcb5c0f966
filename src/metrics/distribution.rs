//! Distribution-based metrics: NSS, CC, SIM, KLD and InfoGain.
//!
//! Every function returns `NaN` instead of failing when its input is
//! degenerate (no fixated pixel, constant or zero-sum map).
use super::weight::weight_map;
use super::Plane;

/// Stabilizes logarithms and ratios.
pub const EPSILON: f64 = f64::EPSILON;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Zero mean, unit (population) standard deviation.
pub fn standardize(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    let sd = var.sqrt();
    values.iter().map(|v| (v - m) / sd).collect()
}

/// Rescales to `[0, 1]`; a constant input becomes `NaN`.
pub fn range_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    values.iter().map(|v| (v - min) / span).collect()
}

/// Divides by the total; a zero-sum input becomes `NaN`.
pub fn sum_normalize(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    values.iter().map(|v| v / total).collect()
}

fn weighted(plane: &Plane) -> Vec<f64> {
    plane
        .data
        .iter()
        .zip(weight_map(plane.w, plane.h))
        .map(|(v, w)| v * w)
        .collect()
}

fn at_fixations<'a>(values: &'a [f64], fixations: &'a Plane) -> impl Iterator<Item = f64> + 'a {
    values
        .iter()
        .zip(&fixations.data)
        .filter(|(_, &f)| f > 0.5)
        .map(|(&v, _)| v)
}

/// Normalized scanpath saliency: mean z-scored saliency at fixated pixels.
pub fn nss(saliency: &Plane, fixations: &Plane) -> f64 {
    let sal = saliency.resized_like(fixations);
    let z = standardize(&sal.data);
    let picked: Vec<f64> = at_fixations(&z, fixations).collect();
    mean(&picked)
}

/// Pearson correlation weighted by the latitude weights of `other`'s grid.
pub fn cc(map: &Plane, other: &Plane) -> f64 {
    let a = map.resized_like(other);
    let x = standardize(&a.data);
    let y = standardize(&other.data);
    let w = weight_map(other.w, other.h);
    let total: f64 = w.iter().sum();
    if !(total > 0.0) {
        return f64::NAN;
    }
    let mx = x.iter().zip(&w).map(|(v, w)| v * w).sum::<f64>() / total;
    let my = y.iter().zip(&w).map(|(v, w)| v * w).sum::<f64>() / total;
    let (mut cov, mut vx, mut vy) = (0.0, 0.0, 0.0);
    for ((a, b), w) in x.iter().zip(&y).zip(&w) {
        let da = a - mx;
        let db = b - my;
        cov += w * da * db;
        vx += w * da * da;
        vy += w * db * db;
    }
    cov / (vx * vy).sqrt()
}

/// Histogram intersection of the weighted, range- then sum-normalized maps.
pub fn sim(map: &Plane, other: &Plane) -> f64 {
    let a = map.resized_like(other);
    let p = sum_normalize(&range_normalize(&weighted(&a)));
    let q = sum_normalize(&range_normalize(&weighted(other)));
    p.iter().zip(&q).map(|(a, b)| a.min(*b)).sum()
}

/// Weighted Kullback-Leibler divergence of `q` from `p`.
pub fn kld(p: &Plane, q: &Plane) -> f64 {
    let a = p.resized_like(q);
    let p = sum_normalize(&weighted(&a));
    let q = sum_normalize(&weighted(q));
    p.iter()
        .zip(&q)
        .filter(|(p, _)| **p != 0.0)
        .map(|(p, q)| p * ((p + EPSILON) / (q + EPSILON)).ln())
        .sum()
}

/// Mean log2 gain of `saliency` over `baseline` at fixated pixels.
pub fn info_gain(saliency: &Plane, fixations: &Plane, baseline: &Plane) -> f64 {
    let s = sum_normalize(&saliency.resized_like(fixations).data);
    let b = sum_normalize(&baseline.resized_like(fixations).data);
    let gains: Vec<f64> = s
        .iter()
        .zip(&b)
        .zip(&fixations.data)
        .filter(|(_, &f)| f > 0.5)
        .map(|((s, b), _)| (EPSILON + s).log2() - (EPSILON + b).log2())
        .collect();
    mean(&gains)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian(w: usize, h: usize, cx: f64, cy: f64, two_sigma2: f64) -> Plane {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                let d2 = (x as f64 - cx).powi(2) + (y as f64 - cy).powi(2);
                data.push((-d2 / two_sigma2).exp());
            }
        }
        Plane { w, h, data }
    }

    fn blob(w: usize, h: usize, cx: f64, cy: f64) -> Plane {
        gaussian(w, h, cx, cy, 8.0)
    }

    fn fixations_at(w: usize, h: usize, cells: &[(usize, usize)]) -> Plane {
        let mut p = Plane::zeros(w, h);
        for &(x, y) in cells {
            p.data[y * w + x] = 1.0;
        }
        p
    }

    #[test]
    fn identical_maps_are_perfectly_similar() {
        let a = blob(20, 10, 6.0, 5.0);
        assert!((cc(&a, &a) - 1.0).abs() < 1e-12);
        assert!((sim(&a, &a) - 1.0).abs() < 1e-12);
        assert!(kld(&a, &a).abs() < 1e-12);
    }

    #[test]
    fn distant_maps_score_lower() {
        let a = blob(20, 10, 4.0, 5.0);
        let b = blob(20, 10, 15.0, 5.0);
        assert!(cc(&a, &b) < 0.5);
        assert!(sim(&a, &b) < 0.5);
        assert!(kld(&a, &b) > 0.5);
    }

    #[test]
    fn nss_rewards_saliency_at_fixations() {
        let a = blob(20, 10, 6.0, 5.0);
        let on = fixations_at(20, 10, &[(6, 5)]);
        let off = fixations_at(20, 10, &[(18, 1)]);
        assert!(nss(&a, &on) > 1.0);
        assert!(nss(&a, &off) < 0.0);
    }

    #[test]
    fn empty_fixations_give_nan() {
        let a = blob(20, 10, 6.0, 5.0);
        let none = Plane::zeros(20, 10);
        assert!(nss(&a, &none).is_nan());
        assert!(info_gain(&a, &none, &a).is_nan());
    }

    #[test]
    fn zero_maps_give_nan() {
        let zero = Plane::zeros(20, 10);
        assert!(cc(&zero, &zero).is_nan());
        assert!(sim(&zero, &zero).is_nan());
        assert!(kld(&zero, &zero).is_nan());
    }

    #[test]
    fn info_gain_is_zero_against_itself() {
        let a = blob(20, 10, 6.0, 5.0);
        let fix = fixations_at(20, 10, &[(6, 5), (3, 3)]);
        assert!(info_gain(&a, &fix, &a).abs() < 1e-12);
        let flat = Plane {
            w: 20,
            h: 10,
            data: vec![1.0; 200],
        };
        assert!(info_gain(&a, &fix, &flat) > 0.0);
    }

    #[test]
    fn mismatched_sizes_are_resampled() {
        // same blob sampled at half resolution
        let small = gaussian(10, 5, 2.75, 2.25, 2.0);
        let big = blob(20, 10, 6.0, 5.0);
        let r = cc(&small, &big);
        assert!(r > 0.8, "{r}");
    }
}
