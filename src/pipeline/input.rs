//! Comparison inputs: raw recordings, fixation lists and binary maps.
//!
//! A `.bin` file whose name follows the binary layout is a saliency map or,
//! with the `fixmap` type, a fixation map. Any other file is read as CSV; a
//! header with a timestamp and head rotation channels marks a raw recording,
//! anything else is treated as a fixation list.
use super::GazeProcessor;
use crate::diagnostics::ProcessReport;
use crate::error::{GazeError, Result};
use crate::features::layout::load_fixation_list;
use crate::image::ImageF32;
use crate::preprocess::raw::ChannelMap;
use crate::progress::Progress;
use crate::saliency::binary::{load_fixation_map_bin, load_video_bin, BinaryName, FIXATION_KIND};
use crate::saliency::{FixationMap, SaliencyVideo};
use crate::scanpath::{scanpath_from_points, ScanpathVector};
use crate::types::{FixationPoint, Track};
use log::debug;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    Recording,
    FixationList,
    SaliencyMap,
    FixationMap,
}

/// Classifies `path` from its name and, for text files, its header row.
pub fn detect_input(path: &Path) -> Result<InputKind> {
    if let Some(name) = BinaryName::parse(path) {
        return Ok(match name.kind.as_deref() {
            Some(FIXATION_KIND) => InputKind::FixationMap,
            _ => InputKind::SaliencyMap,
        });
    }
    if path.extension().is_some_and(|e| e == "bin") {
        return Err(GazeError::InvalidParameter(format!(
            "{} is not named <name>_<W>x<H>[x<F>]_<bits>b[_<type>].bin",
            path.display()
        )));
    }
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_path(path)?;
    let header: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let channels = ChannelMap::from_header(&header[..]);
    let raw = channels.timestamp.is_some() && (channels.head_quaternion.is_some() || channels.head_euler.is_some());
    Ok(if raw { InputKind::Recording } else { InputKind::FixationList })
}

/// One side of a comparison.
///
/// Point-based inputs carry `points` and `scanpath`; binary maps carry the
/// map they store. Missing maps are synthesized by the caller.
#[derive(Clone, Debug)]
pub struct LoadedInput {
    pub name: String,
    pub kind: InputKind,
    pub points: Vec<FixationPoint>,
    pub scanpath: Vec<ScanpathVector>,
    /// Static saliency; for a video file, the sum of its frames.
    pub saliency: Option<ImageF32>,
    pub video: Option<SaliencyVideo>,
    pub fixation_map: Option<FixationMap>,
    /// Processing report of a raw recording.
    pub report: Option<ProcessReport>,
}

impl LoadedInput {
    fn empty(name: String, kind: InputKind) -> Self {
        Self {
            name,
            kind,
            points: Vec::new(),
            scanpath: Vec::new(),
            saliency: None,
            video: None,
            fixation_map: None,
            report: None,
        }
    }

    pub fn has_points(&self) -> bool {
        !self.points.is_empty()
    }
}

fn input_name(path: &Path) -> String {
    match BinaryName::parse(path) {
        Some(name) => name.stem,
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    }
}

/// Loads `path`, processing raw recordings with `processor` and reading
/// fixation positions from `track`.
pub fn load_input(
    path: &Path,
    processor: &GazeProcessor,
    track: Track,
    progress: &mut dyn Progress,
) -> Result<LoadedInput> {
    let kind = detect_input(path)?;
    debug!("{} detected as {:?}", path.display(), kind);
    let mut input = LoadedInput::empty(input_name(path), kind);
    match kind {
        InputKind::Recording => {
            let out = processor.process_path(path, progress)?;
            input.points = out.fixation_points(track);
            input.scanpath = out.scanpath(track);
            input.report = Some(out.report);
        }
        InputKind::FixationList => {
            input.points = load_fixation_list(path)?;
            input.scanpath = scanpath_from_points(&input.points);
        }
        InputKind::SaliencyMap => {
            let video = load_video_bin(path)?;
            input.saliency = Some(video.pooled(0..video.frame_count()));
            if video.frame_count() > 1 {
                input.video = Some(video);
            }
        }
        InputKind::FixationMap => {
            input.fixation_map = Some(load_fixation_map_bin(path)?);
        }
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::PreprocessOptions;
    use crate::progress::NoProgress;
    use crate::saliency::binary::{save_fixation_map_bin, save_video_bin, FloatWidth};
    use crate::segment::SegmenterConfig;

    #[test]
    fn detects_every_kind() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.csv");
        std::fs::write(&raw, "timestamp,pitch,yaw,roll,RightGazeX,RightGazeY,RightGazeZ\n0,0,0,0,0,0,1\n").unwrap();
        let fixlist = dir.path().join("fix.csv");
        std::fs::write(&fixlist, "idx,lon,lat\n0,0.5,0.5\n").unwrap();
        let salmap = dir.path().join("s_4x2_32b_salmap.bin");
        let fixmap = dir.path().join("s_4x2_32b_fixmap.bin");
        let unnamed = dir.path().join("map.bin");

        assert_eq!(detect_input(&raw).unwrap(), InputKind::Recording);
        assert_eq!(detect_input(&fixlist).unwrap(), InputKind::FixationList);
        assert_eq!(detect_input(&salmap).unwrap(), InputKind::SaliencyMap);
        assert_eq!(detect_input(&fixmap).unwrap(), InputKind::FixationMap);
        assert!(matches!(detect_input(&unnamed), Err(GazeError::InvalidParameter(_))));
    }

    #[test]
    fn loads_maps_and_fixation_lists() {
        let dir = tempfile::tempdir().unwrap();
        let processor = GazeProcessor::new(PreprocessOptions::default(), SegmenterConfig::default());

        let mut video = SaliencyVideo::new(4, 2, 3);
        video.frames[0].set(1, 1, 1.0);
        video.frames[2].set(1, 1, 2.0);
        let path = save_video_bin(&video, dir.path(), "clip", FloatWidth::F32).unwrap();
        let loaded = load_input(&path, &processor, Track::Gaze, &mut NoProgress).unwrap();
        assert_eq!(loaded.name, "clip");
        assert_eq!(loaded.saliency.as_ref().unwrap().get(1, 1), 3.0);
        assert_eq!(loaded.video.as_ref().unwrap().frame_count(), 3);

        let mut counts = FixationMap::new(4, 2);
        counts.data[5] = 2;
        let path = save_fixation_map_bin(&counts, dir.path(), "clip", FloatWidth::F16).unwrap();
        let loaded = load_input(&path, &processor, Track::Gaze, &mut NoProgress).unwrap();
        assert_eq!(loaded.fixation_map.unwrap().total(), 2);

        let fixlist = dir.path().join("viewer.csv");
        std::fs::write(&fixlist, "idx,lon,lat,time,dur\n0,0.25,0.5,0,200\n1,0.75,0.5,300,250\n").unwrap();
        let loaded = load_input(&fixlist, &processor, Track::Gaze, &mut NoProgress).unwrap();
        assert_eq!(loaded.kind, InputKind::FixationList);
        assert_eq!(loaded.points.len(), 2);
        assert_eq!(loaded.scanpath.len(), 2);
        assert_eq!(loaded.scanpath[0].duration, 300.0);
    }
}
