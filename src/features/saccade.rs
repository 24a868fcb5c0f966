//! Saccade geometry between consecutive fixation centroids.
//!
//! Angles are measured in Mercator space so that a horizontal saccade has an
//! absolute angle of zero wherever it happens on the sphere.
use crate::sphere::{angle_between, equirect_to_mercator, signed_angle_2d};
use crate::types::{SaccadeFeatures, TrackPosition};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Mercator position of a normalized `(lon, lat)` pair.
pub fn mercator_of(position: &TrackPosition) -> [f64; 2] {
    equirect_to_mercator(position.lon * TAU, position.lat * PI)
}

/// Mercator displacement from `from` to `to`.
///
/// When the longitude delta exceeds a quarter turn, one endpoint is shifted
/// by a full turn so that the saccade crosses the image seam instead.
pub fn mercator_displacement(from: &TrackPosition, to: &TrackPosition) -> [f64; 2] {
    let m1 = mercator_of(from);
    let m2 = mercator_of(to);
    let dx = m2[0] - m1[0];
    let dy = m2[1] - m1[1];
    if dx > FRAC_PI_2 {
        [m2[0] - (m1[0] + TAU), dy]
    } else if dx < -FRAC_PI_2 {
        [(m2[0] + TAU) - m1[0], dy]
    } else {
        [dx, dy]
    }
}

/// Features of the saccade `from → to`; `previous` is the displacement of
/// the saccade before it, if any.
pub fn saccade_between(
    from: &TrackPosition,
    to: &TrackPosition,
    previous: Option<[f64; 2]>,
) -> (SaccadeFeatures, [f64; 2]) {
    let displacement = mercator_displacement(from, to);
    let features = SaccadeFeatures {
        amplitude: angle_between(&from.direction, &to.direction),
        abs_angle: signed_angle_2d(&displacement, &[1.0, 0.0]),
        rel_angle: previous.map(|prev| signed_angle_2d(&displacement, &prev)),
    };
    (features, displacement)
}

/// Saccade features for a sequence of positions; entry `k` describes the
/// saccade into position `k`, the first entry is `None`.
pub fn saccade_sequence(positions: &[TrackPosition]) -> Vec<Option<SaccadeFeatures>> {
    let mut out = Vec::with_capacity(positions.len());
    let mut previous = None;
    for (k, pos) in positions.iter().enumerate() {
        if k == 0 {
            out.push(None);
            continue;
        }
        let (features, displacement) = saccade_between(&positions[k - 1], pos, previous);
        previous = Some(displacement);
        out.push(Some(features));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphere::normalized_to_unit;

    fn at(u: f64, v: f64) -> TrackPosition {
        TrackPosition {
            direction: normalized_to_unit(u, v),
            lon: u,
            lat: v,
        }
    }

    #[test]
    fn horizontal_saccade_has_zero_absolute_angle() {
        let (f, d) = saccade_between(&at(0.4, 0.5), &at(0.45, 0.5), None);
        assert!(f.abs_angle.abs() < 1e-12);
        assert!(d[0] > 0.0);
        assert!((f.amplitude - 0.05 * TAU).abs() < 1e-9);
        assert!(f.rel_angle.is_none());
    }

    #[test]
    fn seam_crossing_takes_the_wrapped_path() {
        let d = mercator_displacement(&at(0.95, 0.5), &at(0.05, 0.5));
        assert!((d[0] - 0.1 * TAU).abs() < 1e-9);
    }

    #[test]
    fn relative_angle_of_a_reversal_is_pi() {
        let seq = saccade_sequence(&[at(0.4, 0.5), at(0.45, 0.5), at(0.4, 0.5)]);
        assert!(seq[0].is_none());
        assert!(seq[1].unwrap().rel_angle.is_none());
        let rel = seq[2].unwrap().rel_angle.unwrap();
        assert!((rel.abs() - PI).abs() < 1e-9);
    }
}
