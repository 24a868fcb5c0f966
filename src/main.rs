use gaze360::preprocess::{HeadFormat, PreprocessOptions, RawRecording, RawSample};
use gaze360::progress::NoProgress;
use gaze360::scanpath::MultiMatchWeights;
use gaze360::segment::SegmenterConfig;
use gaze360::{build_saliency, multimatch, GazeProcessor, SaliencyOptions, Track};

/// Head turning slowly while the eyes alternate between rests and sweeps.
fn synthetic_recording(name: &str, phase: f64) -> RawRecording {
    let mut yaw: f64 = phase;
    let samples = (0..3000)
        .map(|i| {
            if (40..52).contains(&(i % 120)) {
                yaw += 0.04;
            }
            let head_yaw = i as f64 * 1e-4;
            RawSample {
                timestamp: i as f64 * 8.0,
                head: [(head_yaw / 2.0).cos(), 0.0, (head_yaw / 2.0).sin(), 0.0],
                eye: [yaw.sin() * 0.5, 0.1, (1.0 - 0.25 * yaw.sin().powi(2) - 0.01).sqrt()],
                eye_secondary: None,
            }
        })
        .collect();
    RawRecording {
        name: name.into(),
        head_format: HeadFormat::Quaternion,
        samples,
    }
}

fn main() {
    // Demo stub: processes two synthetic viewers and compares them.
    let processor = GazeProcessor::new(PreprocessOptions::default(), SegmenterConfig::default());
    let opts = SaliencyOptions {
        width: 400,
        height: 200,
        ..Default::default()
    };
    let mut scanpaths = Vec::new();
    for (name, phase) in [("viewer_a", 0.0), ("viewer_b", 0.3)] {
        let out = match processor.process_recording(&synthetic_recording(name, phase), &mut NoProgress) {
            Ok(out) => out,
            Err(err) => {
                eprintln!("{name}: {err}");
                return;
            }
        };
        let points = out.fixation_points(Track::Gaze);
        let mass = build_saliency(&points, &opts, &mut NoProgress).map(|m| m.sum()).unwrap_or(f64::NAN);
        println!("{} saliency_mass={:.3}", out.report.summary(), mass);
        scanpaths.push(out.scanpath(Track::Gaze));
    }
    match multimatch(&scanpaths[0], &scanpaths[1], &MultiMatchWeights::default()) {
        Ok(alignment) => println!("multimatch={:.4} path_len={}", alignment.result.score, alignment.path.len()),
        Err(err) => println!("multimatch unavailable: {err}"),
    }
}
