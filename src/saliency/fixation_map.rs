//! Hit-count grids of fixation positions.
use crate::types::FixationPoint;

/// Row-major `u32` grid counting fixations per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixationMap {
    pub w: usize,
    pub h: usize,
    pub data: Vec<u32>,
}

impl FixationMap {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0; w * h],
        }
    }

    /// Counts each normalized position at pixel `(trunc(u·W − 1), trunc(v·H − 1))`,
    /// negative indices wrapping to the far edge.
    pub fn from_points(points: &[FixationPoint], w: usize, h: usize) -> Self {
        let mut map = Self::new(w, h);
        for p in points {
            map.add(p, 1);
        }
        map
    }

    /// Adds `count` hits at the cell of `point`; non-finite positions are ignored.
    pub fn add(&mut self, point: &FixationPoint, count: u32) {
        if self.w == 0 || self.h == 0 || !(point.lon.is_finite() && point.lat.is_finite()) {
            return;
        }
        let x = cell(point.lon, self.w);
        let y = cell(point.lat, self.h);
        self.data[y * self.w + x] += count;
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.data[y * self.w + x]
    }

    /// Total number of hits.
    pub fn total(&self) -> u64 {
        self.data.iter().map(|&c| c as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&c| c == 0)
    }

    /// Counts as f64, the representation used by the metrics.
    pub fn to_f64(&self) -> Vec<f64> {
        self.data.iter().map(|&c| c as f64).collect()
    }

    /// Merges another map of the same size.
    pub fn accumulate(&mut self, other: &FixationMap) {
        debug_assert_eq!((self.w, self.h), (other.w, other.h));
        for (dst, src) in self.data.iter_mut().zip(other.data.iter()) {
            *dst += *src;
        }
    }
}

fn cell(coord: f64, size: usize) -> usize {
    let raw = (coord * size as f64 - 1.0) as i64;
    raw.rem_euclid(size as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_land_one_pixel_up_left() {
        let pts = [
            FixationPoint::from_lon_lat(0.5, 0.5, 0),
            FixationPoint::from_lon_lat(0.5, 0.5, 1),
            FixationPoint::from_lon_lat(0.25, 0.75, 2),
        ];
        let map = FixationMap::from_points(&pts, 8, 4);
        assert_eq!(map.get(3, 1), 2);
        assert_eq!(map.get(1, 2), 1);
        assert_eq!(map.total(), 3);
    }

    #[test]
    fn origin_wraps_to_far_corner() {
        let map = FixationMap::from_points(&[FixationPoint::from_lon_lat(0.0, 0.0, 0)], 8, 4);
        assert_eq!(map.get(7, 3), 1);
    }

    #[test]
    fn sub_pixel_offsets_truncate_towards_zero() {
        // 0.05·10 − 1 = −0.5 truncates to 0, not −1
        let map = FixationMap::from_points(&[FixationPoint::from_lon_lat(0.05, 0.05, 0)], 10, 10);
        assert_eq!(map.get(0, 0), 1);
    }

    #[test]
    fn non_finite_positions_are_skipped() {
        let map = FixationMap::from_points(&[FixationPoint::from_lon_lat(f64::NAN, 0.5, 0)], 4, 4);
        assert!(map.is_empty());
    }
}
