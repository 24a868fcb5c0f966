mod common;

use common::synthetic_gaze::small_circle;
use gaze360::image::ImageF32;
use gaze360::metrics::distribution::cc;
use gaze360::metrics::Plane;
use gaze360::progress::NoProgress;
use gaze360::saliency::binary::{load_saliency_bin, save_saliency_bin, FloatWidth};
use gaze360::saliency::{build_saliency, FixationMap, KernelDistance, SaliencyOptions};
use gaze360::types::FixationPoint;
use std::f64::consts::PI;

fn options(width: usize, height: usize, sigma_deg: f64) -> SaliencyOptions {
    SaliencyOptions {
        width,
        height,
        sigma_deg,
        ..Default::default()
    }
}

fn nonzero_columns(map: &ImageF32) -> usize {
    (0..map.w).filter(|&x| (0..map.h).any(|y| map.get(x, y) > 0.0)).count()
}

#[test]
fn equator_mass_is_stable_across_sigma() {
    let (w, h) = (720usize, 360usize);
    let point = [FixationPoint::from_lon_lat(0.5, 0.5, 0)];
    for sigma_deg in [2.0f64, 4.0, 8.0] {
        let map = build_saliency(&point, &options(w, h, sigma_deg), &mut NoProgress).unwrap();
        let sigma = sigma_deg.to_radians();
        let pixels_per_rad2 = (w - 1) as f64 / (2.0 * PI) * (h - 1) as f64 / PI;
        let ratio = map.sum() / (2.0 * PI * sigma * sigma * pixels_per_rad2);
        assert!((ratio - 1.0).abs() < 0.03, "sigma {sigma_deg}: mass ratio {ratio}");
    }
}

#[test]
fn pole_kernels_span_more_columns_than_equator_kernels() {
    let opts = options(360, 180, 4.0);
    let equator = build_saliency(&[FixationPoint::from_lon_lat(0.5, 0.5, 0)], &opts, &mut NoProgress).unwrap();
    let pole = build_saliency(&[FixationPoint::from_lon_lat(0.5, 0.01, 0)], &opts, &mut NoProgress).unwrap();
    let (eq_cols, pole_cols) = (nonzero_columns(&equator), nonzero_columns(&pole));
    assert!(eq_cols < 60, "{eq_cols}");
    assert_eq!(pole_cols, 360);
}

#[test]
fn euclidean_and_geodesic_kernels_agree() {
    let mut points = small_circle(10, 0.5, 0.5, 0.05);
    points.push(FixationPoint::from_lon_lat(0.1, 0.05, 10));
    points.push(FixationPoint::from_lon_lat(0.999, 0.5, 11));

    let euclid = options(720, 360, 2.0);
    let geodesic = SaliencyOptions {
        kernel: KernelDistance::Geodesic,
        ..euclid.clone()
    };
    let a = build_saliency(&points, &euclid, &mut NoProgress).unwrap();
    let b = build_saliency(&points, &geodesic, &mut NoProgress).unwrap();

    let mass_gap = (a.sum() - b.sum()).abs() / a.sum();
    assert!(b.sum() <= a.sum());
    assert!(mass_gap < 1e-3, "relative mass gap {mass_gap}");
    let r = cc(&Plane::from(&a), &Plane::from(&b));
    assert!(r > 0.9999, "cc {r}");
}

#[test]
fn saved_maps_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(200, 100, 5.0);
    let map = build_saliency(&small_circle(6, 0.3, 0.4, 0.04), &opts, &mut NoProgress).unwrap();
    for precision in [FloatWidth::F32, FloatWidth::F16] {
        let path = save_saliency_bin(&map, dir.path(), "viewer", precision).unwrap();
        let expected = format!("viewer_200x100_{}b_salmap.bin", precision.bits());
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), expected);
        let loaded = load_saliency_bin(&path).unwrap();
        let tol = if precision == FloatWidth::F32 { 0.0 } else { 1e-3 };
        for (a, b) in map.data.iter().zip(&loaded.data) {
            assert!((a - b).abs() <= tol * a.abs().max(1.0));
        }
    }
}

#[test]
fn fixation_map_counts_each_point_once() {
    let points = small_circle(10, 0.5, 0.5, 0.1);
    let map = FixationMap::from_points(&points, 2000, 1000);
    assert_eq!(map.total(), 10);
}
