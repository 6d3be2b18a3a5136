//! Parsing of the uploaded input data file.
//!
//! Only what the page needs is extracted: the number of records and the
//! first and last timestamp, which bound the calibration date/time pickers.
//! Any parse failure is reported as a whole and the pickers stay disabled.

use crate::validators;
use csv::{ReaderBuilder, Trim};
use log::info;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum DataFileError {
    Empty,
    Csv { line: u64, message: String },
    TooFewColumns { line: u64 },
    BadTimestamp { line: u64, value: String },
}

impl fmt::Display for DataFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFileError::Empty => write!(f, "The input file contains no data rows"),
            DataFileError::Csv { line, message } => {
                write!(f, "Could not read line {} of the input file: {}", line, message)
            }
            DataFileError::TooFewColumns { line } => write!(
                f,
                "Line {} of the input file has fewer columns than required",
                line
            ),
            DataFileError::BadTimestamp { line, value } => write!(
                f,
                "Line {} of the input file starts with '{}', expected a date/time",
                line, value
            ),
        }
    }
}

impl std::error::Error for DataFileError {}

/// What the date/time pickers need to know about a loaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSummary {
    pub rows: usize,
    pub first: String,
    pub last: String,
}

impl DataSummary {
    /// (min, max) in the `datetime-local` input format.
    pub fn picker_bounds(&self) -> (String, String) {
        (to_picker_value(&self.first), to_picker_value(&self.last))
    }
}

/// Convert `YYYY-MM-DD[ HH:MM[:SS]]` to `YYYY-MM-DDTHH:MM`.
pub fn to_picker_value(timestamp: &str) -> String {
    let normalized = timestamp.trim().replace(' ', "T");
    if normalized.len() == 10 {
        format!("{}T00:00", normalized)
    } else {
        normalized.chars().take(16).collect()
    }
}

fn delimiter(separator: &str) -> u8 {
    separator.bytes().next().unwrap_or(b',')
}

/// Read `text` with the configured separator.
///
/// `header` is the zero-based index of the column-name row; it and every row
/// above it are skipped.
pub fn summarize(text: &str, header: u32, separator: &str) -> Result<DataSummary, DataFileError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter(separator))
        .from_reader(text.as_bytes());

    let mut rows = 0usize;
    let mut first = None;
    let mut last = String::new();

    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| DataFileError::Csv {
            line: e.position().map(|p| p.line()).unwrap_or(i as u64 + 1),
            message: e.to_string(),
        })?;
        if i <= header as usize {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(i as u64 + 1);
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() < 2 {
            return Err(DataFileError::TooFewColumns { line });
        }
        let stamp = record.get(0).unwrap_or_default();
        if !validators::validate_datetime(stamp).valid {
            return Err(DataFileError::BadTimestamp {
                line,
                value: stamp.to_string(),
            });
        }
        if first.is_none() {
            first = Some(stamp.to_string());
        }
        last = stamp.to_string();
        rows += 1;
    }

    let first = first.ok_or(DataFileError::Empty)?;
    info!("Input file holds {} records from {} to {}", rows, first, last);
    Ok(DataSummary { rows, first, last })
}
