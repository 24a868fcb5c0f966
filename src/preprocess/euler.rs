//! Euler head angles to quaternions.
//!
//! Game-engine recorders report `(pitch, yaw, roll)` applied in YXZ order
//! (yaw, then pitch, then roll). Angles are given in degrees unless every
//! value of the recording already fits in `[-2π, 2π]`.
use nalgebra::{Quaternion, UnitQuaternion};
use std::f64::consts::TAU;

/// Returns `true` when the angle set must be converted from degrees.
pub fn angles_in_degrees(angles: &[[f64; 3]]) -> bool {
    angles
        .iter()
        .flat_map(|a| a.iter())
        .any(|v| v.abs() > TAU)
}

/// Quaternion for `(pitch, yaw, roll)` in radians, YXZ rotation order.
pub fn euler_yxz_to_quaternion(pitch: f64, yaw: f64, roll: f64) -> UnitQuaternion<f64> {
    let (s1, c1) = (pitch / 2.0).sin_cos();
    let (s2, c2) = (yaw / 2.0).sin_cos();
    let (s3, c3) = (roll / 2.0).sin_cos();

    let w = c1 * c2 * c3 + s1 * s2 * s3;
    let x = s1 * c2 * c3 + c1 * s2 * s3;
    let y = c1 * s2 * c3 - s1 * c2 * s3;
    let z = c1 * c2 * s3 - s1 * s2 * c3;
    UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z))
}

/// Converts a whole recording's Euler channels, detecting the angle unit once.
pub fn convert_euler_series(angles: &[[f64; 3]]) -> Vec<UnitQuaternion<f64>> {
    let to_rad = if angles_in_degrees(angles) {
        std::f64::consts::PI / 180.0
    } else {
        1.0
    };
    angles
        .iter()
        .map(|a| euler_yxz_to_quaternion(a[0] * to_rad, a[1] * to_rad, a[2] * to_rad))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn pure_yaw_rotates_about_y() {
        let q = euler_yxz_to_quaternion(0.0, FRAC_PI_2, 0.0);
        let v = q * Vector3::new(0.0, 0.0, 1.0);
        assert!((v - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn yxz_order_matches_composition() {
        let (p, y, r) = (0.3, -1.1, 0.7);
        let q = euler_yxz_to_quaternion(p, y, r);
        let expected = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), y)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), p)
            * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), r);
        assert!(q.angle_to(&expected) < 1e-12);
    }

    #[test]
    fn degree_detection_uses_whole_series() {
        let series = [[10.0, 0.0, 0.0], [0.1, 0.2, 0.3]];
        assert!(angles_in_degrees(&series));
        let converted = convert_euler_series(&series);
        let expected = euler_yxz_to_quaternion(10f64.to_radians(), 0.0, 0.0);
        assert!(converted[0].angle_to(&expected) < 1e-12);
        assert!(!angles_in_degrees(&[[1.0, 2.0, 3.0]]));
    }
}
