//! Bicubic resampling used to bring saliency maps onto the fixation-map grid.
//!
//! Cubic convolution with the Keys kernel at `a = -0.5`, which is the
//! Catmull-Rom spline (not OpenCV's `a = -0.75`), evaluated separably: rows
//! first, then columns. Source samples are addressed at pixel centres and
//! borders are clamped.
//!
//! scikit-image's order-3 `resize` fits an interpolating cubic B-spline with
//! zero padding instead. Both pass through the samples; values differ slightly
//! near sharp peaks and at the border.

const KEYS_A: f64 = -0.5;

#[inline]
fn keys_weight(t: f64) -> f64 {
    let t = t.abs();
    if t <= 1.0 {
        (KEYS_A + 2.0) * t * t * t - (KEYS_A + 3.0) * t * t + 1.0
    } else if t < 2.0 {
        KEYS_A * t * t * t - 5.0 * KEYS_A * t * t + 8.0 * KEYS_A * t - 4.0 * KEYS_A
    } else {
        0.0
    }
}

/// Precomputed taps for one output coordinate.
struct Taps {
    start: isize,
    weights: [f64; 4],
}

fn build_taps(src_len: usize, dst_len: usize) -> Vec<Taps> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|i| {
            let centre = (i as f64 + 0.5) * scale - 0.5;
            let base = centre.floor();
            let frac = centre - base;
            let mut weights = [0.0; 4];
            let mut total = 0.0;
            for (k, w) in weights.iter_mut().enumerate() {
                *w = keys_weight(frac - (k as f64 - 1.0));
                total += *w;
            }
            if total.abs() > f64::EPSILON {
                for w in weights.iter_mut() {
                    *w /= total;
                }
            }
            Taps {
                start: base as isize - 1,
                weights,
            }
        })
        .collect()
}

#[inline]
fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Resample a row-major `sw × sh` grid to `dw × dh`.
///
/// Identical shapes return a copy of the input.
pub fn resize_bicubic(src: &[f64], sw: usize, sh: usize, dw: usize, dh: usize) -> Vec<f64> {
    debug_assert_eq!(src.len(), sw * sh);
    if sw == dw && sh == dh {
        return src.to_vec();
    }
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return vec![0.0; dw * dh];
    }

    let x_taps = build_taps(sw, dw);
    let y_taps = build_taps(sh, dh);

    // Horizontal pass: sh × dw
    let mut tmp = vec![0.0; sh * dw];
    for y in 0..sh {
        let row = &src[y * sw..(y + 1) * sw];
        let out = &mut tmp[y * dw..(y + 1) * dw];
        for (x, taps) in x_taps.iter().enumerate() {
            let mut acc = 0.0;
            for (k, w) in taps.weights.iter().enumerate() {
                acc += w * row[clamp_index(taps.start + k as isize, sw)];
            }
            out[x] = acc;
        }
    }

    // Vertical pass: dh × dw
    let mut dst = vec![0.0; dh * dw];
    for (y, taps) in y_taps.iter().enumerate() {
        let out = &mut dst[y * dw..(y + 1) * dw];
        for (k, w) in taps.weights.iter().enumerate() {
            let sy = clamp_index(taps.start + k as isize, sh);
            let row = &tmp[sy * dw..(sy + 1) * dw];
            for (o, v) in out.iter_mut().zip(row.iter()) {
                *o += w * v;
            }
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_grid_stays_constant() {
        let src = vec![3.0; 8 * 4];
        let dst = resize_bicubic(&src, 8, 4, 20, 10);
        assert_eq!(dst.len(), 200);
        assert!(dst.iter().all(|v| (v - 3.0).abs() < 1e-9));
    }

    #[test]
    fn kernel_matches_catmull_rom() {
        assert_eq!(keys_weight(0.0), 1.0);
        assert!((keys_weight(0.5) - 0.5625).abs() < 1e-12);
        assert!((keys_weight(-1.5) + 0.0625).abs() < 1e-12);
        assert!(keys_weight(1.0).abs() < 1e-12 && keys_weight(2.0) == 0.0);
    }

    #[test]
    fn same_shape_is_identity() {
        let src: Vec<f64> = (0..12).map(|v| v as f64).collect();
        assert_eq!(resize_bicubic(&src, 4, 3, 4, 3), src);
    }

    #[test]
    fn downscale_preserves_mean_of_ramp() {
        let (w, h) = (16, 8);
        let src: Vec<f64> = (0..w * h).map(|i| (i % w) as f64).collect();
        let dst = resize_bicubic(&src, w, h, 8, 4);
        let mean_src = src.iter().sum::<f64>() / src.len() as f64;
        let mean_dst = dst.iter().sum::<f64>() / dst.len() as f64;
        assert!((mean_src - mean_dst).abs() < 0.1, "{mean_src} vs {mean_dst}");
    }
}
