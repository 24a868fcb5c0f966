//! Raw head/eye recordings and header-driven channel detection.
//!
//! Recording files are delimited text with one header row. Header names are
//! matched after lower-casing and dropping every non-letter character, so
//! `Left_Gaze_Dir.X`, `leftgazedirx` and `LEFT GAZE DIR X` all resolve to the
//! same channel.
use super::EyeSelector;
use crate::error::{GazeError, Result};
use csv::{ReaderBuilder, Trim};
use log::{debug, info};
use std::io::Read;
use std::path::Path;

const TIMESTAMP: &[&str] = &["oculots", "oculotimestamp", "ocutimestamp", "etts", "timestamp", "ts"];

const LEFT_X: &[&str] = &["leftgazex", "leftgazedirx", "lgazex", "xlgaze", "lefteyedirectionx", "leftgazedirectionx"];
const LEFT_Y: &[&str] = &["leftgazey", "leftgazediry", "lgazey", "ylgaze", "lefteyedirectiony", "leftgazedirectiony"];
const LEFT_Z: &[&str] = &["leftgazez", "leftgazedirz", "lgazez", "zlgaze", "lefteyedirectionz", "leftgazedirectionz"];

const RIGHT_X: &[&str] = &["rightgazex", "rightgazedirx", "rgazex", "xrgaze", "righteyedirectionx", "rightgazedirectionx"];
const RIGHT_Y: &[&str] = &["rightgazey", "rightgazediry", "rgazey", "yrgaze", "righteyedirectiony", "rightgazedirectiony"];
const RIGHT_Z: &[&str] = &["rightgazez", "rightgazedirz", "rgazez", "zrgaze", "righteyedirectionz", "rightgazedirectionz"];

const BIN_X: &[&str] = &["bingazex", "bingazedirx", "meangazedirx", "meangazedirectionx"];
const BIN_Y: &[&str] = &["bingazey", "bingazediry", "meangazediry", "meangazedirectiony"];
const BIN_Z: &[&str] = &["bingazez", "bingazedirz", "meangazedirz", "meangazedirectionz"];

const HEAD_X: &[&str] = &["xcam", "camx", "headx", "xhead", "camerarotationx", "cameraquaternionx"];
const HEAD_Y: &[&str] = &["ycam", "camy", "heady", "yhead", "camerarotationy", "cameraquaterniony"];
const HEAD_Z: &[&str] = &["zcam", "camz", "headz", "zhead", "camerarotationz", "cameraquaternionz"];
const HEAD_W: &[&str] = &["wcam", "camw", "headw", "whead", "camerarotationw", "cameraquaternionw"];

const PITCH: &[&str] = &["pitch", "campitch", "pitchcam", "pitchead", "headpitch"];
const YAW: &[&str] = &["yaw", "camyaw", "yawcam", "yawhead", "headyaw"];
const ROLL: &[&str] = &["roll", "camroll", "rollcam", "rollhead", "headroll"];

/// How head orientation is encoded in a recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadFormat {
    /// `(w, x, y, z)` quaternion channels.
    Quaternion,
    /// `(pitch, yaw, roll)` Euler channels, degrees or radians.
    Euler,
}

/// One raw row as read from disk.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSample {
    pub timestamp: f64,
    /// `(w, x, y, z)` for quaternion input, `(pitch, yaw, roll, NaN-free pad)` for Euler input.
    pub head: [f64; 4],
    /// Eye ray in head coordinates.
    pub eye: [f64; 3],
    /// Second eye ray, present only for binocular averaging.
    pub eye_secondary: Option<[f64; 3]>,
}

/// A recording ready for preprocessing.
#[derive(Clone, Debug)]
pub struct RawRecording {
    pub name: String,
    pub head_format: HeadFormat,
    pub samples: Vec<RawSample>,
}

/// Column indices resolved from a header row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelMap {
    pub timestamp: Option<usize>,
    pub left: Option<[usize; 3]>,
    pub right: Option<[usize; 3]>,
    pub binocular: Option<[usize; 3]>,
    pub head_quaternion: Option<[usize; 4]>,
    pub head_euler: Option<[usize; 3]>,
}

/// Columns to extract for a given eye selection.
#[derive(Clone, Debug, PartialEq, Eq)]
struct ColumnSelection {
    timestamp: usize,
    head: [usize; 4],
    head_format: HeadFormat,
    eye: Option<[usize; 3]>,
    eye_secondary: Option<[usize; 3]>,
}

/// Lower-cases a header entry and keeps ASCII letters only.
pub fn clean_header_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn find(header: &[String], aliases: &[&str]) -> Option<usize> {
    header.iter().position(|h| aliases.contains(&h.as_str()))
}

fn find3(header: &[String], x: &[&str], y: &[&str], z: &[&str]) -> Option<[usize; 3]> {
    Some([find(header, x)?, find(header, y)?, find(header, z)?])
}

impl ChannelMap {
    /// Resolve channels from raw header names.
    pub fn from_header<S: AsRef<str>>(names: &[S]) -> Self {
        let header: Vec<String> = names.iter().map(|n| clean_header_name(n.as_ref())).collect();
        let head_quaternion = (|| {
            Some([
                find(&header, HEAD_W)?,
                find(&header, HEAD_X)?,
                find(&header, HEAD_Y)?,
                find(&header, HEAD_Z)?,
            ])
        })();
        Self {
            timestamp: find(&header, TIMESTAMP),
            left: find3(&header, LEFT_X, LEFT_Y, LEFT_Z),
            right: find3(&header, RIGHT_X, RIGHT_Y, RIGHT_Z),
            binocular: find3(&header, BIN_X, BIN_Y, BIN_Z),
            head_quaternion,
            head_euler: find3(&header, PITCH, YAW, ROLL),
        }
    }

    fn select(&self, eye: EyeSelector, source_name: &str) -> Result<ColumnSelection> {
        let missing = |channel: &'static str| GazeError::MissingChannel {
            channel,
            source_name: source_name.to_string(),
        };
        let timestamp = self.timestamp.ok_or_else(|| missing("timestamp"))?;
        let (head, head_format) = match (self.head_quaternion, self.head_euler) {
            (Some(q), _) => (q, HeadFormat::Quaternion),
            (None, Some([p, y, r])) => ([p, y, r, r], HeadFormat::Euler),
            (None, None) => return Err(missing("head rotation")),
        };
        let (eye, eye_secondary) = match eye {
            EyeSelector::Right => (Some(self.right.ok_or_else(|| missing("right gaze ray"))?), None),
            EyeSelector::Left => (Some(self.left.ok_or_else(|| missing("left gaze ray"))?), None),
            EyeSelector::Binocular => match (self.binocular, self.left, self.right) {
                (Some(b), _, _) => (Some(b), None),
                (None, Some(l), Some(r)) => (Some(r), Some(l)),
                (None, None, Some(r)) => (Some(r), None),
                (None, Some(l), None) => (Some(l), None),
                (None, None, None) => return Err(missing("gaze ray")),
            },
            EyeSelector::HeadOnly => (None, None),
        };
        Ok(ColumnSelection {
            timestamp,
            head,
            head_format,
            eye,
            eye_secondary,
        })
    }
}

fn parse_field(field: &str) -> f64 {
    if field.is_empty() {
        return f64::NAN;
    }
    field.parse::<f64>().unwrap_or(f64::NAN)
}

/// Read a recording from any reader producing comma-delimited text.
pub fn read_raw_recording<R: Read>(reader: R, name: &str, eye: EyeSelector) -> Result<RawRecording> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let header: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let channels = ChannelMap::from_header(&header[..]);
    let selection = channels.select(eye, name)?;
    debug!("read_raw_recording name={} channels={:?}", name, channels);

    let pick = |record: &csv::StringRecord, idx: usize| -> f64 {
        record.get(idx).map(parse_field).unwrap_or(f64::NAN)
    };

    let mut samples = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let timestamp = pick(&record, selection.timestamp);
        let head = selection.head.map(|i| pick(&record, i));
        let eye = match selection.eye {
            Some(cols) => cols.map(|i| pick(&record, i)),
            // Head-only recordings look straight ahead.
            None => [0.0, 0.0, 1.0],
        };
        let eye_secondary = selection.eye_secondary.map(|cols| cols.map(|i| pick(&record, i)));
        samples.push(RawSample {
            timestamp,
            head,
            eye,
            eye_secondary,
        });
    }

    if samples.is_empty() {
        return Err(GazeError::Parse {
            line: 0,
            message: format!("no samples found in {name}"),
        });
    }

    info!(
        "Loaded {} samples from {} ({:?} head rotation)",
        samples.len(),
        name,
        selection.head_format
    );
    Ok(RawRecording {
        name: name.to_string(),
        head_format: selection.head_format,
        samples,
    })
}

/// Load a recording from disk. The file stem becomes the recording name.
pub fn load_raw_recording(path: &Path, eye: EyeSelector) -> Result<RawRecording> {
    let file = std::fs::File::open(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    read_raw_recording(file, &name, eye)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_cleaning_drops_punctuation_and_case() {
        assert_eq!(clean_header_name(" Left_Gaze_Dir.X "), "leftgazedirx");
        assert_eq!(clean_header_name("Camera Rotation W"), "camerarotationw");
    }

    #[test]
    fn channel_map_prefers_quaternion() {
        let header = ["Timestamp", "xcam", "ycam", "zcam", "wcam", "pitch", "yaw", "roll", "rightgazex", "rightgazey", "rightgazez"];
        let map = ChannelMap::from_header(&header);
        assert_eq!(map.timestamp, Some(0));
        assert_eq!(map.head_quaternion, Some([4, 1, 2, 3]));
        assert_eq!(map.head_euler, Some([5, 6, 7]));
        let sel = map.select(EyeSelector::Right, "t").unwrap();
        assert_eq!(sel.head_format, HeadFormat::Quaternion);
        assert_eq!(sel.eye, Some([8, 9, 10]));
    }

    #[test]
    fn missing_head_channel_is_reported() {
        let csv = "timestamp,rightgazex,rightgazey,rightgazez\n0,0,0,1\n";
        let err = read_raw_recording(csv.as_bytes(), "nohead", EyeSelector::Right).unwrap_err();
        assert!(matches!(err, GazeError::MissingChannel { channel: "head rotation", .. }));
    }

    #[test]
    fn binocular_falls_back_to_both_eyes() {
        let csv = "ts,headpitch,headyaw,headroll,leftgazex,leftgazey,leftgazez,rightgazex,rightgazey,rightgazez\n\
                   0,0,0,0,0.1,0,1,-0.1,0,1\n";
        let rec = read_raw_recording(csv.as_bytes(), "bino", EyeSelector::Binocular).unwrap();
        assert_eq!(rec.head_format, HeadFormat::Euler);
        assert_eq!(rec.samples[0].eye, [-0.1, 0.0, 1.0]);
        assert_eq!(rec.samples[0].eye_secondary, Some([0.1, 0.0, 1.0]));
    }

    #[test]
    fn unparsable_fields_become_nan() {
        let csv = "ts,wcam,xcam,ycam,zcam,rgazex,rgazey,rgazez\n0,1,0,0,0,,0,1\n";
        let rec = read_raw_recording(csv.as_bytes(), "gap", EyeSelector::Right).unwrap();
        assert!(rec.samples[0].eye[0].is_nan());
    }
}
