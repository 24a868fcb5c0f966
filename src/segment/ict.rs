//! Density-cluster identification (I-CT).
//!
//! DBSCAN over gaze directions. Two samples are neighbours when they are at
//! most `time_window_ms` apart and their angular distance lies in
//! `(0, eps]`. Pairs outside the time window have zero affinity and never
//! connect. Clustered samples are fixations, noise samples are saccades.
use super::cleanup::remove_isolated;
use super::{SegmentationSignal, Segmenter};
use crate::error::{GazeError, Result};
use crate::progress::{Progress, Throttle};
use crate::sphere::angle_between;
use crate::types::LabelSequence;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const NAME: &str = "I-CT";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IctParams {
    /// Neighbourhood radius (rad).
    pub eps: f64,
    /// Minimum neighbourhood size, the sample itself included.
    pub min_pts: usize,
    /// Samples further apart in time never connect (ms).
    pub time_window_ms: f64,
}

impl Default for IctParams {
    fn default() -> Self {
        Self {
            eps: 0.005,
            min_pts: 3,
            time_window_ms: 10.0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClusterSegmenter {
    params: IctParams,
}

impl ClusterSegmenter {
    pub fn new(params: IctParams) -> Self {
        Self { params }
    }
}

const UNVISITED: isize = -2;
const NOISE: isize = -1;

fn neighbours(signal: &SegmentationSignal, i: usize, params: &IctParams) -> Vec<usize> {
    let ts = &signal.timestamps;
    let dirs = &signal.directions;
    let mut out = vec![i];
    let connects = |j: usize| {
        let d = angle_between(&dirs[i], &dirs[j]);
        d > 0.0 && d <= params.eps
    };
    let mut j = i;
    while j > 0 && (ts[i] - ts[j - 1]).abs() <= params.time_window_ms {
        j -= 1;
        if connects(j) {
            out.push(j);
        }
    }
    let mut j = i + 1;
    while j < ts.len() && (ts[j] - ts[i]).abs() <= params.time_window_ms {
        if connects(j) {
            out.push(j);
        }
        j += 1;
    }
    out
}

/// Cluster id per sample, `-1` for noise.
pub fn dbscan(signal: &SegmentationSignal, params: &IctParams, progress: &mut dyn Progress) -> Result<Vec<isize>> {
    let n = signal.len();
    let mut labels = vec![UNVISITED; n];
    let mut cluster: isize = 0;
    let throttle = Throttle::new(n, 20);

    for i in 0..n {
        throttle.tick(i, progress)?;
        if labels[i] != UNVISITED {
            continue;
        }
        let seeds = neighbours(signal, i, params);
        if seeds.len() < params.min_pts {
            labels[i] = NOISE;
            continue;
        }
        labels[i] = cluster;
        let mut queue: VecDeque<usize> = seeds.into_iter().filter(|&j| j != i).collect();
        while let Some(j) = queue.pop_front() {
            if labels[j] == NOISE {
                labels[j] = cluster;
            }
            if labels[j] != UNVISITED {
                continue;
            }
            labels[j] = cluster;
            let reach = neighbours(signal, j, params);
            if reach.len() >= params.min_pts {
                queue.extend(reach.into_iter().filter(|&k| labels[k] == UNVISITED || labels[k] == NOISE));
            }
        }
        cluster += 1;
    }
    debug!("I-CT found {} clusters over {} samples", cluster, n);
    Ok(labels)
}

impl Segmenter for ClusterSegmenter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn segment(&self, signal: &SegmentationSignal, progress: &mut dyn Progress) -> Result<LabelSequence> {
        if signal.directions.len() != signal.timestamps.len() {
            return Err(GazeError::DimensionMismatch {
                expected: format!("{} directions", signal.timestamps.len()),
                actual: signal.directions.len().to_string(),
            });
        }
        let clusters = dbscan(signal, &self.params, progress)?;
        let mut labels: LabelSequence = clusters.iter().map(|&c| c != NOISE).collect();
        remove_isolated(&mut labels);
        Ok(labels)
    }
}
