//! Spherical geometry shared across the pipeline.
//!
//! Conventions
//! - Directions are unit vectors in the toolbox frame where `z` points up.
//! - Equirectangular coordinates are `(lon, lat)` in radians with
//!   `lon = atan2(x, y)` and `lat = asin(z)`.
//! - Normalized coordinates are `(u, v)` in `[0, 1)` with the origin at the
//!   top-left of the equirectangular image.
//! - Mercator coordinates are derived from `(lon, colat)` where colatitude is
//!   measured from the north pole (`[0, π]`).
use nalgebra::Vector3;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

const EPS: f64 = 1e-12;

/// Converts a unit vector to equirectangular longitude/latitude (radians).
#[inline]
pub fn unit_to_equirect(v: &Vector3<f64>) -> (f64, f64) {
    let lon = v.x.atan2(v.y);
    let lat = v.z.clamp(-1.0, 1.0).asin();
    (lon, lat)
}

/// Converts longitude and colatitude (radians) to a unit vector.
#[inline]
pub fn equirect_to_unit(lon: f64, colat: f64) -> Vector3<f64> {
    Vector3::new(colat.sin() * lon.cos(), colat.sin() * lon.sin(), colat.cos())
}

/// Maps a unit vector to normalized `(u, v)` image coordinates in `[0, 1)`.
#[inline]
pub fn normalized_lon_lat(v: &Vector3<f64>) -> (f64, f64) {
    let (lon, lat) = unit_to_equirect(v);
    let u = wrap_unit(lon / TAU - 0.25);
    let v = wrap_unit(1.0 - (lat / PI + 0.5));
    (u, v)
}

/// Inverse of [`normalized_lon_lat`]: returns the unit vector seen at `(u, v)`.
#[inline]
pub fn normalized_to_unit(u: f64, v: f64) -> Vector3<f64> {
    equirect_to_unit((1.0 - u) * TAU, v * PI)
}

/// Wraps a value into `[0, 1)` by adding one to negative inputs.
#[inline]
pub fn wrap_unit(x: f64) -> f64 {
    if x < 0.0 {
        x + 1.0
    } else {
        x
    }
}

/// Projects `(lon, colat)` to Mercator `(x, y)`.
///
/// The latitude origin is shifted to the equator before projection, so the
/// poles map to ±∞.
#[inline]
pub fn equirect_to_mercator(lon: f64, colat: f64) -> [f64; 2] {
    let shifted = colat - FRAC_PI_2;
    [lon, (FRAC_PI_4 + shifted / 2.0).tan().ln()]
}

/// Unsigned angle (radians) between two unit vectors.
#[inline]
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}

/// Signed angle (radians) between two 2D vectors, `-atan2(a × b, a · b)`.
#[inline]
pub fn signed_angle_2d(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let cross = a[0] * b[1] - a[1] * b[0];
    let dot = a[0] * b[0] + a[1] * b[1];
    -cross.atan2(dot)
}

/// Great-circle distance between two `(lon, lat)` positions (haversine form).
#[inline]
pub fn orthodromic(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let dlon = p2.0 - p1.0;
    let dlat = p2.1 - p1.1;
    let a = (dlat / 2.0).sin().powi(2) + p1.1.cos() * p2.1.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().clamp(0.0, 1.0).asin()
}

/// Mean unsigned angle between a set of unit vectors and a reference direction.
pub fn mean_angle_to(points: &[Vector3<f64>], reference: &Vector3<f64>) -> f64 {
    if points.is_empty() {
        return f64::NAN;
    }
    points.iter().map(|p| angle_between(p, reference)).sum::<f64>() / points.len() as f64
}

/// Normalized mean of a set of vectors. Returns `None` when the mean collapses.
pub fn normalized_mean<'a, I>(vectors: I) -> Option<Vector3<f64>>
where
    I: IntoIterator<Item = &'a Vector3<f64>>,
{
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for v in vectors {
        sum += v;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let norm = sum.norm();
    (norm > EPS).then(|| sum / norm)
}

/// Renormalizes a vector, leaving near-zero vectors untouched.
#[inline]
pub fn renormalize(v: Vector3<f64>) -> Vector3<f64> {
    let n = v.norm();
    if n > EPS {
        v / n
    } else {
        v
    }
}
