mod common;

use common::synthetic_gaze::{rest_and_sweeps, small_circle, to_csv};
use gaze360::config::CompareConfig;
use gaze360::metrics::auc::auc_judd;
use gaze360::metrics::distribution::{cc, kld};
use gaze360::metrics::table::{append_rows, TABLE_HEADER};
use gaze360::metrics::Plane;
use gaze360::pipeline::{compare_inputs, load_input, InputKind};
use gaze360::progress::NoProgress;
use gaze360::saliency::{build_saliency, FixationMap, SaliencyOptions};
use gaze360::scanpath::{multimatch, scanpath_from_points, MultiMatchWeights};
use gaze360::types::Track;

#[test]
fn identical_small_circle_scanpaths_score_exactly_one() {
    let points = small_circle(10, 0.5, 0.5, 0.05);
    let s1 = scanpath_from_points(&points);
    let s2 = scanpath_from_points(&points);
    let alignment = multimatch(&s1, &s2, &MultiMatchWeights::from_array([1.0; 5])).unwrap();
    assert_eq!(alignment.result.score, 1.0);
    assert_eq!(alignment.result.dimensions(), [1.0; 5]);
    assert_eq!(alignment.cost, 0.0);
    assert!(alignment.path.iter().all(|&(i, j)| i == j));
}

#[test]
fn identical_maps_are_perfect_matches() {
    let points = small_circle(8, 0.4, 0.45, 0.06);
    let opts = SaliencyOptions {
        width: 400,
        height: 200,
        ..Default::default()
    };
    let map = Plane::from(&build_saliency(&points, &opts, &mut NoProgress).unwrap());
    let fixations = Plane::from(&FixationMap::from_points(&points, 400, 200));

    assert_eq!(auc_judd(&fixations, &fixations), 1.0);
    assert!((cc(&map, &map) - 1.0).abs() < 1e-12);
    assert_eq!(kld(&map, &map), 0.0);
}

#[test]
fn recordings_compare_into_an_appended_table() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("viewer_a.csv");
    let b = dir.path().join("viewer_b.csv");
    std::fs::write(&a, to_csv(&rest_and_sweeps("a", 4, 0.0))).unwrap();
    std::fs::write(&b, to_csv(&rest_and_sweeps("b", 4, 0.1))).unwrap();

    let json = format!(
        r#"{{"inputs": [{a:?}, {b:?}], "output_dir": {out:?},
            "pipeline": {{"saliency": {{"width": 360, "height": 180, "sigma_deg": 4.0}}}},
            "metrics": {{"borji_repetitions": 5}}}}"#,
        a = a.display().to_string(),
        b = b.display().to_string(),
        out = dir.path().display().to_string(),
    );
    let cfg: CompareConfig = serde_json::from_str(&json).unwrap();
    let processor = cfg.pipeline.processor();
    let first = load_input(&cfg.inputs[0], &processor, Track::Gaze, &mut NoProgress).unwrap();
    let second = load_input(&cfg.inputs[1], &processor, Track::Gaze, &mut NoProgress).unwrap();
    assert_eq!(first.kind, InputKind::Recording);
    assert_eq!(first.points.len(), 5);

    let rows = compare_inputs(&first, &second, None, &cfg, &mut NoProgress).unwrap();
    // Six saliency metrics without a baseline, then the score and five dimensions.
    assert_eq!(rows.len(), 12);
    let score = rows.iter().find(|r| r.metric == "multimatch.wavg").unwrap().value;
    assert!(score > 0.5 && score < 1.0, "{score}");

    let table = cfg.output_dir.join(&cfg.table);
    append_rows(&table, &rows).unwrap();
    append_rows(&table, &rows).unwrap();
    let text = std::fs::read_to_string(&table).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], TABLE_HEADER.join(","));
    assert_eq!(lines.len(), 1 + 2 * rows.len());
    assert!(lines[1].starts_with("viewer_a,viewer_b,"));
}
