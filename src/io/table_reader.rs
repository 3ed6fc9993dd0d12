//! Reader for time-of-day × month tables.
//!
//! # File Format
//!
//! ```text
//! # Evaporative fraction, Howard Springs
//! # columns: Jan Feb Mar Apr May Jun Jul Aug Sep Oct Nov Dec
//! 0.61 0.63 0.60 0.52 0.41 0.33 0.30 0.29 0.31 0.40 0.52 0.58
//! 0.62 0.64 0.60 0.53 0.41 0.33 0.30 0.29 0.31 0.41 0.52 0.59
//! ```
//!
//! One row per time-of-day bin, starting at midnight.

use std::path::Path;

use super::SourceFileError;
use crate::gapfill::MonthlyTable;

/// Read a table file.
pub fn read_table_file(path: &Path) -> Result<MonthlyTable, SourceFileError> {
    let content = std::fs::read_to_string(path)?;
    parse_table(&content)
}

/// Parse a table from a string.
pub fn parse_table(content: &str) -> Result<MonthlyTable, SourceFileError> {
    let mut rows = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let values: Vec<f64> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| SourceFileError::Parse {
                line: line_num + 1,
                message: "Invalid value".into(),
            })?;
        let row: [f64; 12] = values.try_into().map_err(|v: Vec<f64>| SourceFileError::Parse {
            line: line_num + 1,
            message: format!("Expected 12 monthly values, found {}", v.len()),
        })?;
        rows.push(row);
    }

    MonthlyTable::new(rows).ok_or(SourceFileError::EmptyFile)
}
