use gaze360::preprocess::{HeadFormat, RawRecording, RawSample};
use gaze360::types::FixationPoint;

fn sample(timestamp: f64, yaw: f64) -> RawSample {
    RawSample {
        timestamp,
        head: [1.0, 0.0, 0.0, 0.0],
        eye: [yaw.sin(), 0.0, yaw.cos()],
        eye_secondary: None,
    }
}

fn recording(name: &str, samples: Vec<RawSample>) -> RawRecording {
    RawRecording {
        name: name.into(),
        head_format: HeadFormat::Quaternion,
        samples,
    }
}

/// `n` samples every `dt_ms` with the eye turning along a great circle at
/// a constant `deg_per_s`.
pub fn great_circle_arc(n: usize, deg_per_s: f64, dt_ms: f64) -> RawRecording {
    let step = deg_per_s.to_radians() * dt_ms / 1000.0;
    recording("arc", (0..n).map(|i| sample(i as f64 * dt_ms, i as f64 * step)).collect())
}

/// 100 Hz recording alternating 900 ms of slow drift (0.1 rad/s) with
/// 100 ms sweeps at 5 rad/s, starting from `yaw0`.
pub fn rest_and_sweeps(name: &str, seconds: usize, yaw0: f64) -> RawRecording {
    let mut yaw = yaw0;
    let samples = (0..seconds * 100)
        .map(|i| {
            yaw += if (45..55).contains(&(i % 100)) { 0.05 } else { 0.001 };
            sample(i as f64 * 10.0, yaw)
        })
        .collect();
    recording(name, samples)
}

/// The recording as the CSV a headset logger would produce.
pub fn to_csv(recording: &RawRecording) -> String {
    let mut text = String::from("timestamp,HeadW,HeadX,HeadY,HeadZ,RightGazeX,RightGazeY,RightGazeZ\n");
    for s in &recording.samples {
        text.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            s.timestamp, s.head[0], s.head[1], s.head[2], s.head[3], s.eye[0], s.eye[1], s.eye[2]
        ));
    }
    text
}

/// `n` fixations evenly spaced on a circle of normalized `radius` around
/// `(lon, lat)`, 250 ms long and 300 ms apart.
pub fn small_circle(n: usize, lon: f64, lat: f64, radius: f64) -> Vec<FixationPoint> {
    (0..n)
        .map(|k| {
            let a = std::f64::consts::TAU * k as f64 / n as f64;
            let mut p = FixationPoint::from_lon_lat(lon + radius * a.cos(), lat + radius * a.sin(), k);
            p.start_ms = k as f64 * 300.0;
            p.duration_ms = 250.0;
            p
        })
        .collect()
}
