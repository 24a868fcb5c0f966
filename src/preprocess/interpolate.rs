//! Resampling helpers: natural cubic splines for eye rays and SQUAD for head
//! orientation.
//!
//! Both interpolators clamp queries outside the sampled range to the nearest
//! endpoint value.
use nalgebra::{Quaternion, UnitQuaternion};

const EPS: f64 = 1e-12;

/// Natural cubic spline through `(x, y)` knots with strictly increasing `x`.
#[derive(Clone, Debug)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots.
    m: Vec<f64>,
}

impl CubicSpline {
    /// Builds the spline. Returns `None` with fewer than two knots.
    pub fn new(x: &[f64], y: &[f64]) -> Option<Self> {
        let n = x.len();
        if n < 2 || y.len() != n {
            return None;
        }
        let mut m = vec![0.0; n];
        if n > 2 {
            // Tridiagonal system for the interior second derivatives (Thomas algorithm).
            let mut c_prime = vec![0.0; n];
            let mut d_prime = vec![0.0; n];
            for i in 1..n - 1 {
                let h0 = x[i] - x[i - 1];
                let h1 = x[i + 1] - x[i];
                let a = h0;
                let b = 2.0 * (h0 + h1);
                let c = h1;
                let d = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
                let denom = b - a * c_prime[i - 1];
                c_prime[i] = c / denom;
                d_prime[i] = (d - a * d_prime[i - 1]) / denom;
            }
            for i in (1..n - 1).rev() {
                m[i] = d_prime[i] - c_prime[i] * m[i + 1];
            }
        }
        Some(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        let n = self.x.len();
        if t <= self.x[0] {
            return self.y[0];
        }
        if t >= self.x[n - 1] {
            return self.y[n - 1];
        }
        let hi = self.x.partition_point(|&xi| xi <= t).clamp(1, n - 1);
        let lo = hi - 1;
        let h = self.x[hi] - self.x[lo];
        let a = (self.x[hi] - t) / h;
        let b = (t - self.x[lo]) / h;
        a * self.y[lo]
            + b * self.y[hi]
            + ((a * a * a - a) * self.m[lo] + (b * b * b - b) * self.m[hi]) * h * h / 6.0
    }
}

/// Interpolates every component of `values` at the query times.
pub fn cubic_resample(times: &[f64], values: &[[f64; 3]], query: &[f64]) -> Option<Vec<[f64; 3]>> {
    let splines: Vec<CubicSpline> = (0..3)
        .map(|c| {
            let ys: Vec<f64> = values.iter().map(|v| v[c]).collect();
            CubicSpline::new(times, &ys)
        })
        .collect::<Option<_>>()?;
    Some(
        query
            .iter()
            .map(|&t| [splines[0].evaluate(t), splines[1].evaluate(t), splines[2].evaluate(t)])
            .collect(),
    )
}

fn slerp(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    a.try_slerp(b, t, EPS).unwrap_or(*a)
}

/// Inner control point of SQUAD at knot `i`.
fn squad_control(prev: &UnitQuaternion<f64>, cur: &UnitQuaternion<f64>, next: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    let inv = cur.inverse();
    let ln_next = (inv * next).ln();
    let ln_prev = (inv * prev).ln();
    let tangent: Quaternion<f64> = -(ln_next + ln_prev) * 0.25;
    *cur * UnitQuaternion::new_normalize(tangent.exp())
}

/// Spherical quadrangle interpolation of `rotations` sampled at `times`.
///
/// Consecutive knots are flipped into the same hemisphere first so that the
/// interpolation follows the shortest arc.
pub fn squad_resample(times: &[f64], rotations: &[UnitQuaternion<f64>], query: &[f64]) -> Vec<UnitQuaternion<f64>> {
    let n = rotations.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![rotations[0]; query.len()];
    }

    let mut knots = Vec::with_capacity(n);
    knots.push(rotations[0]);
    for q in &rotations[1..] {
        let prev: &UnitQuaternion<f64> = knots.last().unwrap_or(q);
        if prev.coords.dot(&q.coords) < 0.0 {
            knots.push(UnitQuaternion::new_unchecked(-q.into_inner()));
        } else {
            knots.push(*q);
        }
    }

    let controls: Vec<UnitQuaternion<f64>> = (0..n)
        .map(|i| {
            let prev = &knots[i.saturating_sub(1)];
            let next = &knots[(i + 1).min(n - 1)];
            squad_control(prev, &knots[i], next)
        })
        .collect();

    query
        .iter()
        .map(|&t| {
            if t <= times[0] {
                return knots[0];
            }
            if t >= times[n - 1] {
                return knots[n - 1];
            }
            let hi = times.partition_point(|&ti| ti <= t).clamp(1, n - 1);
            let lo = hi - 1;
            let span = times[hi] - times[lo];
            let h = if span > EPS { (t - times[lo]) / span } else { 0.0 };
            let outer = slerp(&knots[lo], &knots[hi], h);
            let inner = slerp(&controls[lo], &controls[hi], h);
            slerp(&outer, &inner, 2.0 * h * (1.0 - h))
        })
        .collect()
}

/// `n` evenly spaced values covering `[start, end]` inclusively.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn spline_passes_through_knots_and_reproduces_lines() {
        let x = [0.0, 1.0, 2.5, 4.0];
        let y = [1.0, 3.0, 6.0, 9.0];
        let s = CubicSpline::new(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(y.iter()) {
            assert!((s.evaluate(*xi) - yi).abs() < 1e-12);
        }
        assert!((s.evaluate(2.0) - 5.0).abs() < 1e-9);
        assert_eq!(s.evaluate(-1.0), 1.0);
        assert_eq!(s.evaluate(10.0), 9.0);
    }

    #[test]
    fn squad_hits_knots_and_stays_unit() {
        let axis = Vector3::z_axis();
        let rots: Vec<_> = (0..5)
            .map(|i| UnitQuaternion::from_axis_angle(&axis, 0.2 * i as f64))
            .collect();
        let times = [0.0, 10.0, 20.0, 30.0, 40.0];
        let query = linspace(0.0, 40.0, 17);
        let out = squad_resample(&times, &rots, &query);
        assert!(out[0].angle_to(&rots[0]) < 1e-9);
        assert!(out[8].angle_to(&rots[2]) < 1e-9);
        // Interior intervals of a constant-rate rotation interpolate linearly.
        assert!((out[5].angle() - 0.25).abs() < 1e-9);
        for q in out {
            assert!((q.coords.norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn linspace_includes_endpoints() {
        let v = linspace(0.0, 1.0, 5);
        assert_eq!(v, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }
}
