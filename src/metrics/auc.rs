//! ROC-area metrics over a saliency map and a fixation map.
//!
//! Both variants range-normalize the saliency map to `[0, 1]` and treat cells
//! of the fixation map above 0.5 as positives.
//!
//! - AUC-Judd thresholds at every fixated saliency value and counts false
//!   positives over all non-fixated pixels.
//! - AUC-Borji draws, per repetition, as many random pixels as there are
//!   fixations and thresholds on a fixed step. The draw comes from the
//!   caller's RNG so results are reproducible under a seed.
use super::distribution::range_normalize;
use super::Plane;
use rand::Rng;

/// Trapezoidal area under `y(x)`.
fn trapz(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(y, x)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum()
}

struct Scored {
    values: Vec<f64>,
    positives: Vec<f64>,
}

fn score(saliency: &Plane, fixations: &Plane) -> Option<Scored> {
    let sal = saliency.resized_like(fixations);
    let values = range_normalize(&sal.data);
    if values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let positives: Vec<f64> = values
        .iter()
        .zip(&fixations.data)
        .filter(|(_, &f)| f > 0.5)
        .map(|(&v, _)| v)
        .collect();
    (!positives.is_empty()).then_some(Scored { values, positives })
}

fn sort_descending(v: &mut [f64]) {
    v.sort_by(|a, b| b.total_cmp(a));
}

pub fn auc_judd(saliency: &Plane, fixations: &Plane) -> f64 {
    let Some(Scored { mut values, mut positives }) = score(saliency, fixations) else {
        return f64::NAN;
    };
    let n_fix = positives.len();
    let n_pixels = values.len();
    if n_pixels == n_fix {
        return f64::NAN;
    }
    sort_descending(&mut values);
    sort_descending(&mut positives);

    let mut tp = Vec::with_capacity(n_fix + 2);
    let mut fp = Vec::with_capacity(n_fix + 2);
    tp.push(0.0);
    fp.push(0.0);
    for &threshold in &positives {
        let above = values.partition_point(|&v| v >= threshold);
        let hits = positives.partition_point(|&v| v >= threshold);
        tp.push(hits as f64 / n_fix as f64);
        fp.push((above - hits) as f64 / (n_pixels - n_fix) as f64);
    }
    tp.push(1.0);
    fp.push(1.0);
    trapz(&tp, &fp)
}

pub fn auc_borji<R: Rng>(
    saliency: &Plane,
    fixations: &Plane,
    repetitions: usize,
    step: f64,
    rng: &mut R,
) -> f64 {
    let Some(Scored { values, positives }) = score(saliency, fixations) else {
        return f64::NAN;
    };
    if repetitions == 0 || !(step > 0.0) {
        return f64::NAN;
    }
    let n_fix = positives.len();
    let fix_max = positives.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut total = 0.0;
    let mut random = vec![0.0; n_fix];
    for _ in 0..repetitions {
        for r in random.iter_mut() {
            *r = values[rng.gen_range(0..values.len())];
        }
        let top = random.iter().copied().fold(fix_max, f64::max);
        let mut thresholds: Vec<f64> = (0..)
            .map(|k| k as f64 * step)
            .take_while(|t| *t < top)
            .collect();
        thresholds.reverse();

        let mut tp = Vec::with_capacity(thresholds.len() + 2);
        let mut fp = Vec::with_capacity(thresholds.len() + 2);
        tp.push(0.0);
        fp.push(0.0);
        for &t in &thresholds {
            tp.push(positives.iter().filter(|&&v| v >= t).count() as f64 / n_fix as f64);
            fp.push(random.iter().filter(|&&v| v >= t).count() as f64 / n_fix as f64);
        }
        tp.push(1.0);
        fp.push(1.0);
        total += trapz(&tp, &fp);
    }
    total / repetitions as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn plane(w: usize, h: usize, data: Vec<f64>) -> Plane {
        Plane { w, h, data }
    }

    fn ramp(w: usize, h: usize) -> Plane {
        plane(w, h, (0..w * h).map(|i| i as f64).collect())
    }

    #[test]
    fn judd_is_one_when_saliency_equals_fixations() {
        let mut fix = vec![0.0; 100];
        for i in [3, 17, 42, 77] {
            fix[i] = 1.0;
        }
        let f = plane(10, 10, fix);
        assert_eq!(auc_judd(&f, &f), 1.0);
    }

    #[test]
    fn judd_matches_rank_statistic_without_ties() {
        // values 0..9, fixations on 7 and 2
        let s = ramp(10, 1);
        let mut fix = vec![0.0; 10];
        fix[7] = 1.0;
        fix[2] = 1.0;
        let auc = auc_judd(&s, &plane(10, 1, fix));
        // thresholds 7/9 then 2/9: (tp, fp) = (0.5, 2/8), (1, 6/8)
        let expected = 0.25 * 0.25 + 0.5 * 0.75 + 0.25 * 1.0;
        assert!((auc - expected).abs() < 1e-12, "{auc}");
    }

    #[test]
    fn judd_and_borji_are_nan_without_fixations() {
        let s = ramp(10, 1);
        let none = plane(10, 1, vec![0.0; 10]);
        assert!(auc_judd(&s, &none).is_nan());
        let mut rng = StdRng::seed_from_u64(7);
        assert!(auc_borji(&s, &none, 10, 0.1, &mut rng).is_nan());
    }

    #[test]
    fn constant_saliency_is_nan() {
        let s = plane(4, 1, vec![2.0; 4]);
        let fix = plane(4, 1, vec![1.0, 0.0, 0.0, 0.0]);
        assert!(auc_judd(&s, &fix).is_nan());
    }

    #[test]
    fn borji_is_reproducible_and_high_for_good_maps() {
        let s = ramp(50, 2);
        let mut fix = vec![0.0; 100];
        for i in 90..100 {
            fix[i] = 1.0;
        }
        let f = plane(50, 2, fix);
        let a = auc_borji(&s, &f, 50, 0.1, &mut StdRng::seed_from_u64(3));
        let b = auc_borji(&s, &f, 50, 0.1, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
        assert!(a > 0.8, "{a}");
    }
}
