//! Pixel-centre sphere grid and the latitude-dependent Gaussian window.
//!
//! Overview
//! - [`SphereGrid`] caches one unit vector per pixel. Column `x` maps to
//!   longitude `2π − x/(W−1)·2π`, row `y` to colatitude `y/(H−1)·π`.
//! - [`gaussian_support`] returns the column and row indices a kernel centred
//!   on a normalized `(u, v)` position touches. The window widens towards the
//!   poles to follow the horizontal stretch of the projection and is capped at
//!   the grid width.
//! - [`splat`] evaluates the kernel over that window.
//!
//! Notes
//! - Indices are wrapped modulo the grid size in both directions.
use super::KernelDistance;
use crate::image::ImageF32;
use crate::sphere::equirect_to_unit;
use nalgebra::Vector3;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Unit vector at the centre of every pixel, row-major.
#[derive(Clone, Debug)]
pub struct SphereGrid {
    pub w: usize,
    pub h: usize,
    points: Vec<Vector3<f64>>,
}

impl SphereGrid {
    pub fn new(w: usize, h: usize) -> Self {
        let lon_step = if w > 1 { TAU / (w - 1) as f64 } else { 0.0 };
        let colat_step = if h > 1 { PI / (h - 1) as f64 } else { 0.0 };
        let mut points = Vec::with_capacity(w * h);
        for y in 0..h {
            let colat = y as f64 * colat_step;
            for x in 0..w {
                points.push(equirect_to_unit(TAU - x as f64 * lon_step, colat));
            }
        }
        Self { w, h, points }
    }

    #[inline]
    pub fn point(&self, x: usize, y: usize) -> &Vector3<f64> {
        &self.points[y * self.w + x]
    }
}

/// Window of a kernel on the grid, as wrapped column and row indices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Support {
    pub columns: Vec<usize>,
    pub rows: Vec<usize>,
}

impl Support {
    pub fn len(&self) -> usize {
        self.columns.len() * self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }
}

fn wrapped_range(centre: i64, extent: i64, size: usize) -> Vec<usize> {
    let n = size as i64;
    let half = extent / 2;
    (centre - half..centre + half).map(|i| i.rem_euclid(n) as usize).collect()
}

/// Window of a kernel with standard deviation `sigma` (rad) centred on the
/// normalized position `(u, v)`.
pub fn gaussian_support(w: usize, h: usize, u: f64, v: f64, sigma: f64) -> Support {
    if w == 0 || h == 0 {
        return Support::default();
    }
    let cx = (u * w as f64) as i64;
    let cy = (v * h as f64) as i64;
    let sy = (h as f64 * (2.5 * sigma).sin()) as i64;
    let stretch = 1.0 + (v * PI - FRAC_PI_2).abs().tan();
    let sx = (w as f64 * stretch * 1.5 * sigma).min(w as f64) as i64;
    Support {
        columns: wrapped_range(cx, sx.max(0), w),
        rows: wrapped_range(cy, sy.max(0), h),
    }
}

/// Unnormalized Gaussian weight of `point` around `centre`.
#[inline]
pub fn kernel_weight(point: &Vector3<f64>, centre: &Vector3<f64>, sigma: f64, kernel: KernelDistance) -> f64 {
    let d2 = match kernel {
        KernelDistance::Euclidean => (point - centre).norm_squared(),
        KernelDistance::Geodesic => {
            let d = point.dot(centre).clamp(-1.0, 1.0).acos();
            d * d
        }
    };
    (-d2 / (2.0 * sigma * sigma)).exp()
}

/// Kernel contributions of one position as `(linear index, weight)` pairs.
pub fn kernel_cells(
    grid: &SphereGrid,
    centre: &Vector3<f64>,
    u: f64,
    v: f64,
    sigma: f64,
    kernel: KernelDistance,
) -> Vec<(usize, f32)> {
    let support = gaussian_support(grid.w, grid.h, u, v, sigma);
    let mut cells = Vec::with_capacity(support.len());
    for &y in &support.rows {
        for &x in &support.columns {
            let weight = kernel_weight(grid.point(x, y), centre, sigma, kernel);
            cells.push((y * grid.w + x, weight as f32));
        }
    }
    cells
}

/// Adds one Gaussian centred on `centre` to `map`.
pub fn splat(
    map: &mut ImageF32,
    grid: &SphereGrid,
    centre: &Vector3<f64>,
    u: f64,
    v: f64,
    sigma: f64,
    kernel: KernelDistance,
) {
    debug_assert_eq!((map.w, map.h), (grid.w, grid.h));
    for (i, weight) in kernel_cells(grid, centre, u, v, sigma, kernel) {
        map.data[i] += weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphere::normalized_to_unit;

    #[test]
    fn grid_corners_match_projection() {
        let grid = SphereGrid::new(9, 5);
        assert!((grid.point(0, 0) - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-12);
        assert!((grid.point(4, 4) - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
        // column 0 and the last column both sit on the seam
        assert!((grid.point(0, 2) - grid.point(8, 2)).norm() < 1e-12);
        for y in 0..5 {
            for x in 0..9 {
                assert!((grid.point(x, y).norm() - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn grid_agrees_with_normalized_coordinates() {
        let (w, h) = (201, 101);
        let grid = SphereGrid::new(w, h);
        let d = normalized_to_unit(0.25, 0.5);
        let x = (0.25 * (w - 1) as f64).round() as usize;
        let y = (0.5 * (h - 1) as f64).round() as usize;
        assert!((grid.point(x, y) - d).norm() < 1e-9);
    }

    #[test]
    fn window_is_square_at_equator_and_full_width_at_pole() {
        let sigma = 2f64.to_radians();
        let eq = gaussian_support(2000, 1000, 0.5, 0.5, sigma);
        assert_eq!(eq.rows.len(), 86);
        assert_eq!(eq.columns.len(), 104);
        let pole = gaussian_support(2000, 1000, 0.5, 0.001, sigma);
        assert_eq!(pole.columns.len(), 2000);
        assert!(pole.columns.len() > eq.columns.len());
    }

    #[test]
    fn window_wraps_across_seam() {
        let support = gaussian_support(100, 50, 0.0, 0.5, 5f64.to_radians());
        assert!(support.columns.contains(&99));
        assert!(support.columns.contains(&0));
        assert!(support.columns.iter().all(|&x| x < 100));
    }

    #[test]
    fn geodesic_and_euclidean_agree_at_centre() {
        let c = normalized_to_unit(0.3, 0.4);
        let sigma = 0.05;
        for kernel in [KernelDistance::Euclidean, KernelDistance::Geodesic] {
            assert!((kernel_weight(&c, &c, sigma, kernel) - 1.0).abs() < 1e-12);
        }
        let p = normalized_to_unit(0.31, 0.4);
        let eu = kernel_weight(&p, &c, sigma, KernelDistance::Euclidean);
        let geo = kernel_weight(&p, &c, sigma, KernelDistance::Geodesic);
        assert!(eu >= geo);
    }
}
