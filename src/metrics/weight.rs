//! Latitude weighting of equirectangular grids.
//!
//! A pixel row at colatitude `θ` covers a solid angle proportional to
//! `sin θ`. Rows are weighted by `sin(linspace(0, π, H))`, zero at both poles.
use std::f64::consts::PI;

/// Weight of each row of an `h`-row grid.
pub fn row_weights(h: usize) -> Vec<f64> {
    match h {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..h).map(|y| (y as f64 * PI / (h - 1) as f64).sin()).collect(),
    }
}

/// Full `w × h` weight grid, row-major.
pub fn weight_map(w: usize, h: usize) -> Vec<f64> {
    let rows = row_weights(h);
    let mut out = Vec::with_capacity(w * h);
    for r in rows {
        out.extend(std::iter::repeat(r).take(w));
    }
    out
}
