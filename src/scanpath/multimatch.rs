//! MultiMatch alignment of two scanpaths.
//!
//! Overview
//! - Five dissimilarity matrices are built between the fixations of the two
//!   scanpaths: position, duration, saccade length, saccade shape and saccade
//!   direction, each scaled to `[0, 1]`.
//! - Their weighted sum is the cost of entering a cell of an `M × N` grid
//!   graph where each cell steps right, down or diagonally. The cheapest path
//!   from the first to the last pair of fixations is the alignment.
//! - Each dimension's similarity is one minus its mean along the path.
//!
//! Notes
//! - Cells that cannot be computed (the saccade dimensions of the first pair,
//!   the direction of the last pair) are `NaN`. They contribute nothing to
//!   the cost, and a dimension with no computable cell is left out of both
//!   the cost normalization and the aggregate score.
use super::vector::ScanpathVector;
use crate::error::{GazeError, Result};
use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::f64::consts::PI;

pub const DIMENSIONS: [&str; 5] = ["position", "duration", "length", "shape", "direction"];

/// Relative weight of each dimension.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiMatchWeights {
    pub position: f64,
    pub duration: f64,
    pub length: f64,
    pub shape: f64,
    pub direction: f64,
}

impl Default for MultiMatchWeights {
    fn default() -> Self {
        Self {
            position: 1.0,
            duration: 1.0,
            length: 1.0,
            shape: 1.0,
            direction: 1.0,
        }
    }
}

impl MultiMatchWeights {
    pub fn as_array(&self) -> [f64; 5] {
        [self.position, self.duration, self.length, self.shape, self.direction]
    }

    pub fn from_array(w: [f64; 5]) -> Self {
        Self {
            position: w[0],
            duration: w[1],
            length: w[2],
            shape: w[3],
            direction: w[4],
        }
    }
}

/// Per-dimension similarities in `[0, 1]` and their weighted average.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiMatchResult {
    pub score: f64,
    pub position: f64,
    pub duration: f64,
    pub length: f64,
    pub shape: f64,
    pub direction: f64,
}

impl MultiMatchResult {
    pub fn dimensions(&self) -> [f64; 5] {
        [self.position, self.duration, self.length, self.shape, self.direction]
    }

    fn from_dimensions(score: f64, d: [f64; 5]) -> Self {
        Self {
            score,
            position: d[0],
            duration: d[1],
            length: d[2],
            shape: d[3],
            direction: d[4],
        }
    }
}

/// Alignment with its path as `(i, j)` pairs from `(0, 0)` to `(M−1, N−1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Alignment {
    pub result: MultiMatchResult,
    pub path: Vec<(usize, usize)>,
    /// Total cost of the path.
    pub cost: f64,
}

/// Angle between unit vectors; exact zero for identical inputs.
fn arc(a: &nalgebra::Vector3<f64>, b: &nalgebra::Vector3<f64>) -> f64 {
    a.cross(b).norm().atan2(a.dot(b))
}

fn shape_angle(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dot = a[0] * b[0] + a[1] * b[1];
    let norms = ((a[0] * a[0] + a[1] * a[1]) * (b[0] * b[0] + b[1] * b[1])).sqrt();
    (dot / norms).clamp(-1.0, 1.0).acos()
}

/// The five `M × N` dissimilarity matrices.
pub fn dissimilarity_matrices(s1: &[ScanpathVector], s2: &[ScanpathVector]) -> [DMatrix<f64>; 5] {
    let (m, n) = (s1.len(), s2.len());
    let max_duration = s1
        .iter()
        .chain(s2)
        .map(|v| v.duration)
        .filter(|d| d.is_finite())
        .fold(0.0, f64::max);

    let position = DMatrix::from_fn(m, n, |i, j| arc(&s1[i].position, &s2[j].position) / PI);
    let duration = DMatrix::from_fn(m, n, |i, j| {
        (s1[i].duration - s2[j].duration).abs() / (max_duration + f64::EPSILON)
    });
    let mut length = DMatrix::zeros(m, n);
    let mut shape = DMatrix::zeros(m, n);
    let mut direction = DMatrix::zeros(m, n);
    for i in 1..m {
        for j in 1..n {
            length[(i, j)] = (s1[i].saccade_length - s2[j].saccade_length).abs() / PI;
            shape[(i, j)] = shape_angle(s1[i].saccade(), s2[j].saccade()) / PI;
            if i + 1 < m && j + 1 < n {
                direction[(i, j)] = (s1[i].saccade_direction - s2[j].saccade_direction).abs() / PI;
            }
        }
    }
    if m > 0 && n > 0 {
        for dim in [&mut length, &mut shape, &mut direction] {
            dim[(0, 0)] = f64::NAN;
        }
        direction[(m - 1, n - 1)] = f64::NAN;
    }
    [position, duration, length, shape, direction]
}

/// Weighted combination; `NaN` cells count as zero and dimensions without
/// any computable cell are dropped from the normalization.
pub fn weight_matrix(dims: &[DMatrix<f64>; 5], weights: &[f64; 5]) -> Option<DMatrix<f64>> {
    let (m, n) = dims[0].shape();
    let total: f64 = dims
        .iter()
        .zip(weights)
        .filter(|(d, _)| d.iter().any(|v| !v.is_nan()))
        .map(|(_, w)| w)
        .sum();
    if !(total > 0.0) {
        return None;
    }
    Some(DMatrix::from_fn(m, n, |i, j| {
        dims.iter()
            .zip(weights)
            .map(|(d, w)| if d[(i, j)].is_nan() { 0.0 } else { d[(i, j)] * w })
            .sum::<f64>()
            / total
    }))
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Cost(f64);

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Successors of cell `(i, j)` in the alignment graph.
fn successors(i: usize, j: usize, m: usize, n: usize) -> impl Iterator<Item = (usize, usize)> {
    let last_row = i + 1 == m;
    let last_col = j + 1 == n;
    let right = (!last_col).then_some((i, j + 1));
    let down = (!last_row).then_some((i + 1, j));
    let diag = (!last_row && !last_col).then_some((i + 1, j + 1));
    [right, down, diag].into_iter().flatten()
}

/// Cheapest path from `(0, 0)` to the bottom-right cell, where entering a
/// cell costs its value in `w`.
pub fn shortest_path(w: &DMatrix<f64>) -> (Vec<(usize, usize)>, f64) {
    let (m, n) = w.shape();
    if m == 0 || n == 0 {
        return (Vec::new(), f64::NAN);
    }
    let node = |i: usize, j: usize| i * n + j;
    let mut dist = vec![f64::INFINITY; m * n];
    let mut prev: Vec<Option<usize>> = vec![None; m * n];
    let mut heap = BinaryHeap::new();
    dist[0] = 0.0;
    heap.push(Reverse((Cost(0.0), 0usize)));

    while let Some(Reverse((Cost(d), u))) = heap.pop() {
        if d > dist[u] {
            continue;
        }
        if u == m * n - 1 {
            break;
        }
        let (i, j) = (u / n, u % n);
        for (ni, nj) in successors(i, j, m, n) {
            let v = node(ni, nj);
            let candidate = d + w[(ni, nj)];
            if candidate < dist[v] {
                dist[v] = candidate;
                prev[v] = Some(u);
                heap.push(Reverse((Cost(candidate), v)));
            }
        }
    }

    let end = m * n - 1;
    let mut path = vec![(m - 1, n - 1)];
    let mut cur = end;
    while let Some(p) = prev[cur] {
        path.push((p / n, p % n));
        cur = p;
    }
    path.reverse();
    (path, dist[end])
}

fn mean_along(dim: &DMatrix<f64>, path: &[(usize, usize)]) -> f64 {
    let (sum, count) = path
        .iter()
        .map(|&(i, j)| dim[(i, j)])
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Aligns two scanpaths and scores their similarity.
pub fn multimatch(s1: &[ScanpathVector], s2: &[ScanpathVector], weights: &MultiMatchWeights) -> Result<Alignment> {
    if s1.is_empty() || s2.is_empty() {
        return Err(GazeError::InvalidParameter(format!(
            "MultiMatch needs two non-empty scanpaths, got {} and {} fixations",
            s1.len(),
            s2.len()
        )));
    }
    let w = weights.as_array();
    if w.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
        return Err(GazeError::InvalidParameter(format!("MultiMatch weights must be finite and non-negative, got {w:?}")));
    }
    let dims = dissimilarity_matrices(s1, s2);
    let wm = weight_matrix(&dims, &w).ok_or_else(|| {
        GazeError::InvalidParameter("MultiMatch weights are zero on every computable dimension".into())
    })?;
    let (path, cost) = shortest_path(&wm);

    let similarity: [f64; 5] = std::array::from_fn(|d| 1.0 - mean_along(&dims[d], &path));
    let (num, den) = similarity
        .iter()
        .zip(&w)
        .filter(|(s, _)| !s.is_nan())
        .fold((0.0, 0.0), |(num, den), (s, w)| (num + s * w, den + w));
    let score = if den > 0.0 { num / den } else { f64::NAN };
    debug!(
        "MultiMatch {}x{}: path of {} cells, score {:.4}",
        s1.len(),
        s2.len(),
        path.len(),
        score
    );
    Ok(Alignment {
        result: MultiMatchResult::from_dimensions(score, similarity),
        path,
        cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanpath::vector::scanpath_from_points;
    use crate::types::FixationPoint;

    fn path_of(coords: &[(f64, f64)]) -> Vec<ScanpathVector> {
        let points: Vec<FixationPoint> = coords
            .iter()
            .enumerate()
            .map(|(k, &(u, v))| {
                let mut p = FixationPoint::from_lon_lat(u, v, k);
                p.start_ms = k as f64 * 300.0;
                p.duration_ms = 250.0;
                p
            })
            .collect();
        scanpath_from_points(&points)
    }

    #[test]
    fn identical_scanpaths_score_one() {
        let sp = path_of(&[(0.3, 0.5), (0.35, 0.45), (0.42, 0.5), (0.4, 0.6), (0.33, 0.55)]);
        let out = multimatch(&sp, &sp, &MultiMatchWeights::default()).unwrap();
        assert_eq!(out.result.score, 1.0);
        assert_eq!(out.result.dimensions(), [1.0; 5]);
        let diagonal: Vec<_> = (0..5).map(|k| (k, k)).collect();
        assert_eq!(out.path, diagonal);
        assert_eq!(out.cost, 0.0);
    }

    #[test]
    fn nan_cells_are_placed_at_the_edges() {
        let a = path_of(&[(0.3, 0.5), (0.35, 0.45), (0.42, 0.5)]);
        let b = path_of(&[(0.31, 0.5), (0.36, 0.44), (0.4, 0.52), (0.45, 0.5)]);
        let dims = dissimilarity_matrices(&a, &b);
        assert!(dims[2][(0, 0)].is_nan() && dims[3][(0, 0)].is_nan() && dims[4][(0, 0)].is_nan());
        assert!(dims[4][(2, 3)].is_nan());
        assert!(!dims[0][(0, 0)].is_nan() && !dims[1][(0, 0)].is_nan());
        for d in &dims[..4] {
            assert!(d.iter().filter(|v| !v.is_nan()).all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn path_moves_monotonically_to_the_corner() {
        let a = path_of(&[(0.3, 0.5), (0.35, 0.45), (0.42, 0.5)]);
        let b = path_of(&[(0.1, 0.5), (0.31, 0.5), (0.36, 0.44), (0.4, 0.52), (0.45, 0.5)]);
        let out = multimatch(&a, &b, &MultiMatchWeights::default()).unwrap();
        assert_eq!(out.path.first(), Some(&(0, 0)));
        assert_eq!(out.path.last(), Some(&(2, 4)));
        for pair in out.path.windows(2) {
            let (di, dj) = (pair[1].0 - pair[0].0, pair[1].1 - pair[0].1);
            assert!(di <= 1 && dj <= 1 && di + dj >= 1);
        }
        assert!(out.result.score < 1.0 && out.result.score > 0.0);
    }

    #[test]
    fn single_fixations_compare_position_and_duration_only() {
        let a = path_of(&[(0.3, 0.5)]);
        let b = path_of(&[(0.3, 0.5)]);
        let out = multimatch(&a, &b, &MultiMatchWeights::default()).unwrap();
        assert!(out.result.length.is_nan() && out.result.direction.is_nan());
        assert_eq!(out.result.score, 1.0);
        assert_eq!(out.path, vec![(0, 0)]);
    }

    #[test]
    fn rejects_empty_inputs_and_bad_weights() {
        let a = path_of(&[(0.3, 0.5)]);
        assert!(multimatch(&a, &[], &MultiMatchWeights::default()).is_err());
        let zero = MultiMatchWeights::from_array([0.0; 5]);
        assert!(multimatch(&a, &a, &zero).is_err());
    }
}
