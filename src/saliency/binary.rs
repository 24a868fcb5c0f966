//! Raw float saliency files with self-describing names.
//!
//! A file holds a headerless row-major array of little-endian floats. Its
//! name carries the shape and precision:
//! `<name>_<W>x<H>[x<F>]_<bits>b[_<type>].bin`, with the frame count `F`
//! present only for videos. Half precision is converted in place.
use super::{FixationMap, SaliencyVideo};
use crate::error::{GazeError, Result};
use crate::image::io::ensure_parent_dir;
use crate::image::ImageF32;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// `type` suffix of saliency map files.
pub const SALIENCY_KIND: &str = "salmap";
/// `type` suffix of fixation map files.
pub const FIXATION_KIND: &str = "fixmap";

/// Element precision of a binary file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloatWidth {
    #[serde(rename = "16")]
    F16,
    #[default]
    #[serde(rename = "32")]
    F32,
    #[serde(rename = "64")]
    F64,
}

impl FloatWidth {
    pub fn bits(self) -> usize {
        match self {
            FloatWidth::F16 => 16,
            FloatWidth::F32 => 32,
            FloatWidth::F64 => 64,
        }
    }

    pub fn bytes(self) -> usize {
        self.bits() / 8
    }

    pub fn from_bits(bits: usize) -> Option<Self> {
        match bits {
            16 => Some(FloatWidth::F16),
            32 => Some(FloatWidth::F32),
            64 => Some(FloatWidth::F64),
            _ => None,
        }
    }
}

/// Parsed form of a binary file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryName {
    pub stem: String,
    pub width: usize,
    pub height: usize,
    pub frames: Option<usize>,
    pub precision: FloatWidth,
    pub kind: Option<String>,
}

impl BinaryName {
    pub fn file_name(&self) -> String {
        let mut dims = format!("{}x{}", self.width, self.height);
        if let Some(f) = self.frames {
            dims.push_str(&format!("x{f}"));
        }
        let mut name = format!("{}_{}_{}b", self.stem, dims, self.precision.bits());
        if let Some(kind) = &self.kind {
            name.push('_');
            name.push_str(kind);
        }
        name.push_str(".bin");
        name
    }

    /// Parses a file name (directories are ignored). Returns `None` when the
    /// name does not follow the layout.
    pub fn parse(path: &Path) -> Option<Self> {
        let file = path.file_name()?.to_str()?;
        let base = file.strip_suffix(".bin")?;
        let parts: Vec<&str> = base.split('_').collect();
        // Either `..._<dims>_<bits>b` or `..._<dims>_<bits>b_<type>`.
        for (dims_at, kind) in [(parts.len().checked_sub(2)?, None), (parts.len().checked_sub(3)?, parts.last())] {
            if dims_at == 0 {
                continue;
            }
            let Some(precision) = parse_bits(parts[dims_at + 1]) else {
                continue;
            };
            let Some((width, height, frames)) = parse_dims(parts[dims_at]) else {
                continue;
            };
            if let Some(k) = kind {
                if k.is_empty() || !k.chars().all(|c| c.is_alphanumeric()) {
                    continue;
                }
            }
            return Some(Self {
                stem: parts[..dims_at].join("_"),
                width,
                height,
                frames,
                precision,
                kind: kind.map(|k| k.to_string()),
            });
        }
        None
    }

    fn element_count(&self) -> usize {
        self.width * self.height * self.frames.unwrap_or(1)
    }
}

fn parse_bits(token: &str) -> Option<FloatWidth> {
    FloatWidth::from_bits(token.strip_suffix('b')?.parse().ok()?)
}

fn parse_dims(token: &str) -> Option<(usize, usize, Option<usize>)> {
    let nums: Vec<usize> = token.split('x').map(|t| t.parse().ok()).collect::<Option<_>>()?;
    match nums[..] {
        [w, h] => Some((w, h, None)),
        [w, h, f] => Some((w, h, Some(f))),
        _ => None,
    }
}

/// IEEE 754 binary16 encoding with round-to-nearest-even.
pub fn f32_to_f16_bits(value: f32) -> u16 {
    let x = value.to_bits();
    let sign = ((x >> 16) & 0x8000) as u16;
    let exp = ((x >> 23) & 0xff) as i32;
    let mant = x & 0x7f_ffff;

    if exp == 0xff {
        let nan = if mant != 0 { 0x200 | (mant >> 13) as u16 } else { 0 };
        return sign | 0x7c00 | nan;
    }
    let e = exp - 127 + 15;
    if e >= 0x1f {
        return sign | 0x7c00;
    }
    let (bits, shift) = if e <= 0 {
        if e < -10 {
            return sign;
        }
        ((mant | 0x80_0000), (14 - e) as u32)
    } else {
        (((e as u32) << 23) | mant, 13)
    };
    let mut half = bits >> shift;
    let round_bit = 1u32 << (shift - 1);
    let sticky = round_bit - 1;
    let lsb = round_bit << 1;
    if bits & round_bit != 0 && bits & (lsb | sticky) != 0 {
        half += 1;
    }
    sign | half as u16
}

pub fn f16_bits_to_f32(h: u16) -> f32 {
    let sign = ((h & 0x8000) as u32) << 16;
    let exp = ((h >> 10) & 0x1f) as u32;
    let mant = (h & 0x3ff) as u32;
    match exp {
        0 => {
            let v = mant as f32 * 2f32.powi(-24);
            if sign != 0 {
                -v
            } else {
                v
            }
        }
        0x1f => f32::from_bits(sign | 0x7f80_0000 | (mant << 13)),
        _ => f32::from_bits(sign | ((exp + 112) << 23) | (mant << 13)),
    }
}

fn encode(values: &[f32], precision: FloatWidth) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * precision.bytes());
    for &v in values {
        match precision {
            FloatWidth::F16 => out.extend_from_slice(&f32_to_f16_bits(v).to_le_bytes()),
            FloatWidth::F32 => out.extend_from_slice(&v.to_le_bytes()),
            FloatWidth::F64 => out.extend_from_slice(&(v as f64).to_le_bytes()),
        }
    }
    out
}

fn decode(bytes: &[u8], precision: FloatWidth) -> Vec<f32> {
    match precision {
        FloatWidth::F16 => bytes
            .chunks_exact(2)
            .map(|c| f16_bits_to_f32(u16::from_le_bytes([c[0], c[1]])))
            .collect(),
        FloatWidth::F32 => bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        FloatWidth::F64 => bytes
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32)
            .collect(),
    }
}

/// Writes `values` under `dir` with a name built from `name`; returns the path.
pub fn write_binary(dir: &Path, name: &BinaryName, values: &[f32]) -> Result<PathBuf> {
    if values.len() != name.element_count() {
        return Err(GazeError::DimensionMismatch {
            expected: format!("{} values for {}", name.element_count(), name.file_name()),
            actual: values.len().to_string(),
        });
    }
    let path = dir.join(name.file_name());
    ensure_parent_dir(&path)?;
    fs::write(&path, encode(values, name.precision))?;
    Ok(path)
}

/// Reads a binary file, taking its shape and precision from the name.
pub fn read_binary(path: &Path) -> Result<(BinaryName, Vec<f32>)> {
    let name = BinaryName::parse(path).ok_or_else(|| {
        GazeError::InvalidParameter(format!("{} is not named <name>_<W>x<H>[x<F>]_<bits>b[_<type>].bin", path.display()))
    })?;
    let bytes = fs::read(path)?;
    let expected = name.element_count() * name.precision.bytes();
    if bytes.len() != expected {
        return Err(GazeError::DimensionMismatch {
            expected: format!("{expected} bytes"),
            actual: bytes.len().to_string(),
        });
    }
    let values = decode(&bytes, name.precision);
    Ok((name, values))
}

pub fn save_saliency_bin(map: &ImageF32, dir: &Path, stem: &str, precision: FloatWidth) -> Result<PathBuf> {
    let name = BinaryName {
        stem: stem.to_string(),
        width: map.w,
        height: map.h,
        frames: None,
        precision,
        kind: Some(SALIENCY_KIND.into()),
    };
    write_binary(dir, &name, &map.data)
}

pub fn save_video_bin(video: &SaliencyVideo, dir: &Path, stem: &str, precision: FloatWidth) -> Result<PathBuf> {
    let name = BinaryName {
        stem: stem.to_string(),
        width: video.w,
        height: video.h,
        frames: Some(video.frame_count()),
        precision,
        kind: Some(SALIENCY_KIND.into()),
    };
    write_binary(dir, &name, &video.to_flat())
}

pub fn save_fixation_map_bin(map: &FixationMap, dir: &Path, stem: &str, precision: FloatWidth) -> Result<PathBuf> {
    let name = BinaryName {
        stem: stem.to_string(),
        width: map.w,
        height: map.h,
        frames: None,
        precision,
        kind: Some(FIXATION_KIND.into()),
    };
    let values: Vec<f32> = map.data.iter().map(|&c| c as f32).collect();
    write_binary(dir, &name, &values)
}

/// Loads a single map. A video file is summed over its frames.
pub fn load_saliency_bin(path: &Path) -> Result<ImageF32> {
    let (name, values) = read_binary(path)?;
    let plane = name.width * name.height;
    let mut map = ImageF32::new(name.width, name.height);
    if plane == 0 {
        return Ok(map);
    }
    for frame in values.chunks_exact(plane) {
        for (dst, src) in map.data.iter_mut().zip(frame) {
            *dst += *src;
        }
    }
    Ok(map)
}

pub fn load_video_bin(path: &Path) -> Result<SaliencyVideo> {
    let (name, values) = read_binary(path)?;
    let plane = name.width * name.height;
    let frames = if plane == 0 {
        Vec::new()
    } else {
        values
            .chunks_exact(plane)
            .filter_map(|c| ImageF32::from_vec(name.width, name.height, c.to_vec()))
            .collect()
    };
    Ok(SaliencyVideo {
        w: name.width,
        h: name.height,
        frames,
    })
}

/// Loads a fixation map; cells are rounded to the nearest count.
pub fn load_fixation_map_bin(path: &Path) -> Result<FixationMap> {
    let (name, values) = read_binary(path)?;
    Ok(FixationMap {
        w: name.width,
        h: name.height,
        data: values
            .iter()
            .take(name.width * name.height)
            .map(|&v| v.max(0.0).round() as u32)
            .collect(),
    })
}
