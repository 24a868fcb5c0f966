//! Head-trajectory labelling for head-only tracking.
//!
//! The recording is cut into fixed temporal windows; the last sample of each
//! window becomes a one-sample "fixation", so the resulting trajectory is a
//! uniform temporal downsampling of head positions.
use crate::types::{GazeSample, LabelSequence};
use nalgebra::Vector3;

/// Labels the last sample of every complete `window_ms` window as fixation.
pub fn downsample_labels(timestamps: &[f64], window_ms: f64) -> LabelSequence {
    let mut labels = vec![false; timestamps.len()];
    let Some(&last) = timestamps.last() else {
        return labels;
    };
    if window_ms <= 0.0 || !last.is_finite() {
        return labels;
    }
    let windows = (last / window_ms).floor() as usize;
    let mut cursor = 0usize;
    for w in 0..windows {
        let start = w as f64 * window_ms;
        let end = (w + 1) as f64 * window_ms;
        while cursor < timestamps.len() && timestamps[cursor] < start {
            cursor += 1;
        }
        let first = cursor;
        while cursor < timestamps.len() && timestamps[cursor] < end {
            cursor += 1;
        }
        if cursor > first {
            labels[cursor - 1] = true;
        }
    }
    labels
}

/// Replaces the gaze track by the head track and clears the eye track.
pub fn head_as_gaze(samples: &mut [GazeSample]) {
    for s in samples {
        s.gaze = s.head;
        s.eye = Vector3::zeros();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_sample_of_each_window_is_marked() {
        let ts: Vec<f64> = (0..=50).map(|i| i as f64 * 10.0).collect();
        let labels = downsample_labels(&ts, 100.0);
        let marked: Vec<usize> = labels.iter().enumerate().filter(|(_, l)| **l).map(|(i, _)| i).collect();
        assert_eq!(marked, vec![9, 19, 29, 39, 49]);
    }

    #[test]
    fn empty_windows_are_skipped() {
        let ts = [0.0, 10.0, 250.0, 260.0, 310.0];
        let labels = downsample_labels(&ts, 100.0);
        assert_eq!(labels, vec![false, true, false, true, false]);
    }
}
