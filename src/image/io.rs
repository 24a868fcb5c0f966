//! I/O helpers for saliency grids and JSON reports.
//!
//! - `save_saliency_png`: write an `ImageF32` to a grayscale PNG, scaled by its maximum.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::ImageF32;
use crate::error::{GazeError, Result};
use image::{GrayImage, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Save a saliency grid as an 8-bit grayscale PNG.
///
/// Values are divided by the grid maximum; an all-zero grid is written black.
pub fn save_saliency_png(map: &ImageF32, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let max = map.max();
    let scale = if max > 0.0 { 255.0 / max } else { 0.0 };
    let mut out = GrayImage::new(map.w as u32, map.h as u32);
    for y in 0..map.h {
        for x in 0..map.w {
            let v = (map.get(x, y) * scale).clamp(0.0, 255.0);
            out.put_pixel(x as u32, y as u32, Luma([v as u8]));
        }
    }
    out.save(path)
        .map_err(|e| GazeError::Image(format!("Failed to save {}: {e}", path.display())))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
