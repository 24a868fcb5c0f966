//! Per-fixation feature vectors for scanpath comparison.
use crate::features::saccade::mercator_displacement;
use crate::sphere::{angle_between, signed_angle_2d};
use crate::types::{FixationPoint, FixationRecord, Track, TrackPosition};
use nalgebra::Vector3;

/// Ten features of one fixation and the saccade leading into it.
///
/// Saccade fields are `NaN` for the first fixation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanpathVector {
    pub position: Vector3<f64>,
    /// Time until the next fixation starts (ms); the last one keeps its own duration.
    pub duration: f64,
    pub lon: f64,
    pub lat: f64,
    /// Great-circle amplitude (rad).
    pub saccade_length: f64,
    /// Absolute angle of the Mercator displacement (rad).
    pub saccade_direction: f64,
    pub saccade_dx: f64,
    pub saccade_dy: f64,
    pub start_ms: f64,
    pub end_ms: f64,
}

impl ScanpathVector {
    /// `[x, y, z, duration, lon, lat, length, direction, dx, dy]`.
    pub fn features(&self) -> [f64; 10] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.duration,
            self.lon,
            self.lat,
            self.saccade_length,
            self.saccade_direction,
            self.saccade_dx,
            self.saccade_dy,
        ]
    }

    pub fn saccade(&self) -> [f64; 2] {
        [self.saccade_dx, self.saccade_dy]
    }
}

fn as_position(p: &FixationPoint) -> TrackPosition {
    TrackPosition {
        direction: p.direction,
        lon: p.lon,
        lat: p.lat,
    }
}

/// Scanpath of an ordered fixation list.
pub fn scanpath_from_points(points: &[FixationPoint]) -> Vec<ScanpathVector> {
    let nan = f64::NAN;
    points
        .iter()
        .enumerate()
        .map(|(k, p)| {
            let duration = match points.get(k + 1) {
                Some(next) => next.start_ms - p.start_ms,
                None => p.duration_ms,
            };
            let (length, direction, [dx, dy]) = match k.checked_sub(1).map(|i| &points[i]) {
                Some(prev) => {
                    let d = mercator_displacement(&as_position(prev), &as_position(p));
                    (
                        angle_between(&prev.direction, &p.direction),
                        signed_angle_2d(&d, &[1.0, 0.0]),
                        d,
                    )
                }
                None => (nan, nan, [nan, nan]),
            };
            ScanpathVector {
                position: p.direction,
                duration,
                lon: p.lon,
                lat: p.lat,
                saccade_length: length,
                saccade_direction: direction,
                saccade_dx: dx,
                saccade_dy: dy,
                start_ms: p.start_ms,
                end_ms: p.end_ms(),
            }
        })
        .collect()
}

/// Scanpath of fixation records on one track.
pub fn scanpath_from_records(records: &[FixationRecord], track: Track) -> Vec<ScanpathVector> {
    let points: Vec<FixationPoint> = records.iter().map(|r| FixationPoint::from_record(r, track)).collect();
    scanpath_from_points(&points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn point(u: f64, v: f64, start_ms: f64, duration_ms: f64) -> FixationPoint {
        let mut p = FixationPoint::from_lon_lat(u, v, 0);
        p.start_ms = start_ms;
        p.duration_ms = duration_ms;
        p
    }

    #[test]
    fn features_follow_fixation_order() {
        let sp = scanpath_from_points(&[point(0.4, 0.5, 0.0, 200.0), point(0.45, 0.5, 300.0, 150.0), point(0.45, 0.4, 500.0, 100.0)]);
        assert_eq!(sp.len(), 3);
        assert!(sp[0].saccade_length.is_nan() && sp[0].saccade_dx.is_nan());
        assert_eq!(sp[0].duration, 300.0);
        assert_eq!(sp[2].duration, 100.0);

        assert!((sp[1].saccade_length - 0.05 * TAU).abs() < 1e-9);
        assert!(sp[1].saccade_direction.abs() < 1e-12);
        assert!(sp[1].saccade_dx > 0.0 && sp[1].saccade_dy.abs() < 1e-12);
        // moving up the image is a quarter turn away from the x axis
        assert!((sp[2].saccade_direction.abs() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert_eq!(sp[2].features()[4], 0.45);
    }
}
