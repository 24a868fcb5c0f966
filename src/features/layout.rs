//! The 29-column fixation record layout and fixation-list files.
//!
//! Column order is fixed; subsets are emitted in the order the caller lists
//! them. Index and timestamp columns are written as integers, every other
//! column in scientific notation with eight decimals. Missing values (the
//! saccade features of the first record) are written as `NaN`.
use crate::error::{GazeError, Result};
use crate::image::io::ensure_parent_dir;
use crate::preprocess::raw::clean_header_name;
use crate::types::{FixationPoint, FixationRecord};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::Path;

pub const RECORD_COLUMNS: [&str; 29] = [
    "long_Gaze",
    "lat_Gaze",
    "X_gaze",
    "Y_gaze",
    "Z_gaze",
    "long_Eye",
    "lat_Eye",
    "long_Head",
    "lat_Head",
    "Fix_index",
    "Fix_idx_start",
    "Fix_idx_end",
    "Fix_time_start",
    "Fix_time_end",
    "Fix_duration",
    "Fix_Dispersion",
    "Fix_peak_vel",
    "Fix_peak_acc",
    "Sacc_peak_vel",
    "Sacc_peak_acc",
    "Sacc_ampl_Gaze",
    "Sacc_ampl_Eye",
    "Sacc_ampl_Head",
    "Sacc_absAngle_Gaze",
    "Sacc_absAngle_Eye",
    "Sacc_absAngle_Head",
    "Sacc_relAngle_Gaze",
    "Sacc_relAngle_Eye",
    "Sacc_relAngle_Head",
];

/// Columns written as integers.
const INTEGER_COLUMNS: [usize; 5] = [9, 10, 11, 12, 13];

/// Default subset: fixation index, longitude, latitude, start time.
pub const DEFAULT_COLUMNS: [usize; 4] = [9, 0, 1, 12];

/// Flattens a record into the 29-column layout.
pub fn record_row(r: &FixationRecord) -> [f64; 29] {
    let nan = f64::NAN;
    let sacc = |s: Option<&crate::types::SaccadeFeatures>| {
        s.map_or([nan, nan, nan], |f| [f.amplitude, f.abs_angle, f.rel_angle.unwrap_or(nan)])
    };
    let g = sacc(r.saccade_gaze.as_ref());
    let e = sacc(r.saccade_eye.as_ref());
    let h = sacc(r.saccade_head.as_ref());
    [
        r.gaze.lon,
        r.gaze.lat,
        r.gaze.direction.x,
        r.gaze.direction.y,
        r.gaze.direction.z,
        r.eye.lon,
        r.eye.lat,
        r.head.lon,
        r.head.lat,
        r.index as f64,
        r.start_index as f64,
        r.end_index as f64,
        r.start_ms,
        r.end_ms,
        r.duration_ms,
        r.dispersion,
        r.peak_velocity,
        r.peak_acceleration,
        r.saccade_peak_velocity.unwrap_or(nan),
        r.saccade_peak_acceleration.unwrap_or(nan),
        g[0],
        e[0],
        h[0],
        g[1],
        e[1],
        h[1],
        g[2],
        e[2],
        h[2],
    ]
}

fn format_cell(column: usize, value: f64) -> String {
    if !value.is_finite() {
        return if value.is_nan() { "NaN".into() } else { format!("{value}") };
    }
    if INTEGER_COLUMNS.contains(&column) {
        format!("{}", value.trunc() as i64)
    } else {
        format!("{value:.8e}")
    }
}

/// Options of [`write_fixation_csv`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixationCsvOptions {
    /// Column indices into [`RECORD_COLUMNS`], in output order.
    pub columns: Vec<usize>,
    /// Append rows to an existing file without a header.
    pub append: bool,
}

impl Default for FixationCsvOptions {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS.to_vec(),
            append: false,
        }
    }
}

impl FixationCsvOptions {
    /// Every column of the layout.
    pub fn all_columns() -> Self {
        Self {
            columns: (0..RECORD_COLUMNS.len()).collect(),
            append: false,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(GazeError::InvalidParameter("fixation column subset is empty".into()));
        }
        if let Some(bad) = self.columns.iter().find(|&&c| c >= RECORD_COLUMNS.len()) {
            return Err(GazeError::InvalidParameter(format!(
                "fixation column {bad} out of range (layout has {} columns)",
                RECORD_COLUMNS.len()
            )));
        }
        Ok(())
    }
}

/// Writes records to any writer; `header` controls the header row.
pub fn write_fixation_records<W: Write>(
    writer: W,
    records: &[FixationRecord],
    columns: &[usize],
    header: bool,
) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    if header {
        wtr.write_record(columns.iter().map(|&c| RECORD_COLUMNS[c]))?;
    }
    for record in records {
        let row = record_row(record);
        wtr.write_record(columns.iter().map(|&c| format_cell(c, row[c])))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes a fixation list file, creating parent directories as needed.
pub fn write_fixation_csv(path: &Path, records: &[FixationRecord], options: &FixationCsvOptions) -> Result<()> {
    options.validate()?;
    ensure_parent_dir(path)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(options.append)
        .truncate(!options.append)
        .open(path)?;
    write_fixation_records(file, records, &options.columns, !options.append)?;
    debug!("wrote {} fixations to {}", records.len(), path.display());
    Ok(())
}

const FIX_LON: &[&str] = &["lon", "longitude", "longaze", "longgaze"];
const FIX_LAT: &[&str] = &["lat", "latitude", "latgaze"];
const FIX_X: &[&str] = &["x", "xsph", "xgaze"];
const FIX_Y: &[&str] = &["y", "ysph", "ygaze"];
const FIX_Z: &[&str] = &["z", "zsph", "zgaze"];
const FIX_TS: &[&str] = &["time", "starttimestamp", "timestamp", "timestart", "fixtimestart"];
const FIX_DUR: &[&str] = &["dur", "duration", "fixduration"];
const FIX_IDX: &[&str] = &["idx", "index", "i", "fixindex"];

/// Reads a fixation list with at least longitude and latitude columns.
///
/// Directions come from `x`/`y`/`z` columns when all three are present and are
/// otherwise derived from the normalized longitude/latitude.
pub fn read_fixation_list<R: Read>(reader: R, source_name: &str) -> Result<Vec<FixationPoint>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .comment(None)
        .from_reader(reader);
    let header: Vec<String> = rdr.headers()?.iter().map(clean_header_name).collect();
    let find = |aliases: &[&str]| header.iter().position(|h| aliases.contains(&h.as_str()));
    let missing = |channel: &'static str| GazeError::MissingChannel {
        channel,
        source_name: source_name.to_string(),
    };
    let lon_col = find(FIX_LON).ok_or_else(|| missing("longitude"))?;
    let lat_col = find(FIX_LAT).ok_or_else(|| missing("latitude"))?;
    let xyz = match (find(FIX_X), find(FIX_Y), find(FIX_Z)) {
        (Some(x), Some(y), Some(z)) => Some([x, y, z]),
        _ => None,
    };
    let ts_col = find(FIX_TS);
    let dur_col = find(FIX_DUR);
    let idx_col = find(FIX_IDX);

    let mut points = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let line = row + 2;
        let value = |col: usize| -> Result<f64> {
            let field = record.get(col).unwrap_or("");
            field.parse::<f64>().map_err(|e| GazeError::Parse {
                line,
                message: format!("column {col} ('{field}'): {e}"),
            })
        };
        let lon = value(lon_col)?;
        let lat = value(lat_col)?;
        let mut point = FixationPoint::from_lon_lat(lon, lat, row);
        if let Some([x, y, z]) = xyz {
            point.direction = nalgebra::Vector3::new(value(x)?, value(y)?, value(z)?);
        }
        if let Some(c) = ts_col {
            point.start_ms = value(c)?;
        }
        if let Some(c) = dur_col {
            point.duration_ms = value(c)?;
        }
        if let Some(c) = idx_col {
            point.index = value(c)? as usize;
        }
        points.push(point);
    }
    debug!("read {} fixations from {}", points.len(), source_name);
    Ok(points)
}

/// Reads a fixation list from disk.
pub fn load_fixation_list(path: &Path) -> Result<Vec<FixationPoint>> {
    let file = std::fs::File::open(path)?;
    read_fixation_list(file, &path.display().to_string())
}
