//! Saliency synthesis from fixation positions.
//!
//! Overview
//! - Each [`FixationPoint`] adds an isotropic Gaussian on the sphere to an
//!   equirectangular [`ImageF32`]. The kernel is evaluated only inside a
//!   latitude-dependent window ([`grid::gaussian_support`]).
//! - [`video`] splats fixations onto the frames their time span covers.
//! - [`fixation_map`] builds hit-count grids, [`binary`] reads and writes raw
//!   float files with self-describing names.
//!
//! Notes
//! - Maps are accumulated mass and are never normalized here.
//! - The default kernel distance is the 3D chord between the pixel and the
//!   fixation direction. [`KernelDistance::Geodesic`] uses the great-circle
//!   angle instead.
pub mod binary;
pub mod fixation_map;
pub mod grid;
pub mod video;

use crate::error::{GazeError, Result};
use crate::image::ImageF32;
use crate::progress::{Progress, Throttle};
use crate::types::{FixationPoint, FixationRecord, GazeSample, Track};
use grid::SphereGrid;
use log::debug;
use serde::{Deserialize, Serialize};

pub use fixation_map::FixationMap;
pub use video::SaliencyVideo;

/// Distance used inside the Gaussian kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelDistance {
    /// Straight-line distance between unit vectors.
    #[default]
    Euclidean,
    /// Great-circle angle.
    Geodesic,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaliencyOptions {
    pub width: usize,
    pub height: usize,
    /// Kernel standard deviation in degrees.
    pub sigma_deg: f64,
    pub kernel: KernelDistance,
}

impl Default for SaliencyOptions {
    fn default() -> Self {
        Self {
            width: 2000,
            height: 1000,
            sigma_deg: 2.0,
            kernel: KernelDistance::Euclidean,
        }
    }
}

impl SaliencyOptions {
    pub fn sigma_rad(&self) -> f64 {
        self.sigma_deg.to_radians()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.width < 2 || self.height < 2 {
            return Err(GazeError::InvalidParameter(format!(
                "saliency grid must be at least 2x2, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.sigma_deg > 0.0) {
            return Err(GazeError::InvalidParameter(format!(
                "sigma_deg must be positive, got {}",
                self.sigma_deg
            )));
        }
        Ok(())
    }
}

/// Accumulates one Gaussian per point into a fresh map.
///
/// Progress is reported about 25 times; a refusal discards the map and
/// returns [`GazeError::Cancelled`].
pub fn build_saliency(points: &[FixationPoint], opts: &SaliencyOptions, progress: &mut dyn Progress) -> Result<ImageF32> {
    opts.validate()?;
    let grid = SphereGrid::new(opts.width, opts.height);
    let sigma = opts.sigma_rad();
    let mut map = ImageF32::new(opts.width, opts.height);
    let throttle = Throttle::new(points.len(), 25);
    for (i, p) in points.iter().enumerate() {
        grid::splat(&mut map, &grid, &p.direction, p.lon, p.lat, sigma, opts.kernel);
        throttle.tick(i, progress)?;
    }
    debug!(
        "saliency: {} points on {}x{} (sigma {}°, {:?})",
        points.len(),
        opts.width,
        opts.height,
        opts.sigma_deg,
        opts.kernel
    );
    Ok(map)
}

/// Positions of `records` on one track.
pub fn points_from_records(records: &[FixationRecord], track: Track) -> Vec<FixationPoint> {
    records.iter().map(|r| FixationPoint::from_record(r, track)).collect()
}

/// Raw samples treated as fixations.
pub fn points_from_samples(samples: &[GazeSample], track: Track) -> Vec<FixationPoint> {
    samples
        .iter()
        .enumerate()
        .map(|(i, s)| FixationPoint::from_sample(s, i, track))
        .collect()
}
