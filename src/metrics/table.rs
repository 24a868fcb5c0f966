//! Append-only comparison table.
//!
//! Rows are `Name1,Name2,Metric,Value` with the value in scientific notation
//! with five decimals and a signed exponent of at least two digits
//! (`1.23457e-01`); non-finite values are `nan`, `inf` and `-inf`. The header is written only when the file is new or
//! empty, so repeated runs accumulate into one table.
use crate::error::Result;
use crate::image::io::ensure_parent_dir;
use csv::WriterBuilder;
use log::debug;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

pub const TABLE_HEADER: [&str; 4] = ["Name1", "Name2", "Metric", "Value"];

/// One row of the table.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonRow {
    pub name1: String,
    pub name2: String,
    pub metric: String,
    pub value: f64,
}

impl ComparisonRow {
    pub fn new(name1: &str, name2: &str, metric: impl Into<String>, value: f64) -> Self {
        Self {
            name1: name1.to_string(),
            name2: name2.to_string(),
            metric: metric.into(),
            value,
        }
    }
}

pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let formatted = format!("{value:.5e}");
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        return formatted;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

/// Writes rows, preceded by the header when `header` is set.
pub fn write_rows<W: Write>(writer: W, rows: &[ComparisonRow], header: bool) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    if header {
        wtr.write_record(TABLE_HEADER)?;
    }
    for row in rows {
        let value = format_value(row.value);
        wtr.write_record([row.name1.as_str(), row.name2.as_str(), row.metric.as_str(), value.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Appends rows to the table at `path`.
pub fn append_rows(path: &Path, rows: &[ComparisonRow]) -> Result<()> {
    ensure_parent_dir(path)?;
    let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    write_rows(file, rows, is_new)?;
    debug!("appended {} rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("comparisons.csv");
        append_rows(&path, &[ComparisonRow::new("a", "b", "CC", 0.123456789)]).unwrap();
        append_rows(&path, &[ComparisonRow::new("a", "c", "KLD", f64::NAN)]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["Name1,Name2,Metric,Value", "a,b,CC,1.23457e-01", "a,c,KLD,nan"]);
    }

    #[test]
    fn values_use_five_decimals() {
        assert_eq!(format_value(1.0), "1.00000e+00");
        assert_eq!(format_value(-2500.0), "-2.50000e+03");
        assert_eq!(format_value(0.0), "0.00000e+00");
        assert_eq!(format_value(3.2e-120), "3.20000e-120");
        assert_eq!(format_value(f64::NEG_INFINITY), "-inf");
    }
}
