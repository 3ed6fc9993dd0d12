//! Reader and writer for whitespace-delimited dataset files.
//!
//! # File Format
//!
//! ```text
//! # Alternate site: Daly River
//! # site: Daly River
//! timestamp Ta Ah Fsd
//! 2024-01-01T00:00:00 24.1 17.9 0.0
//! 2024-01-01T00:30:00 23.8 -9999 0.0
//! ```
//!
//! The time step is taken from a `# time_step:` comment (minutes) when
//! present, otherwise from the first two records. Values equal to `-9999`
//! or that read as `nan` are stored as missing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDateTime;

use super::SourceFileError;
use crate::series::Dataset;

/// Timestamp format of the first column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn parse_error(line: usize, message: impl Into<String>) -> SourceFileError {
    SourceFileError::Parse {
        line,
        message: message.into(),
    }
}

/// Read a dataset file.
///
/// # Errors
/// I/O failures, malformed lines, files without records and time axes the
/// [`Dataset`] rejects.
pub fn read_dataset_file(path: &Path) -> Result<Dataset, SourceFileError> {
    let content = std::fs::read_to_string(path)?;
    parse_dataset(&content)
}

/// Parse a dataset from a string.
///
/// Same format as the file.
pub fn parse_dataset(content: &str) -> Result<Dataset, SourceFileError> {
    let mut site: Option<String> = None;
    let mut time_step: Option<u32> = None;
    let mut header: Option<Vec<String>> = None;
    let mut timestamps: Vec<NaiveDateTime> = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('#') {
            let comment = line.trim_start_matches('#').trim();
            if let Some(name) = comment.strip_prefix("site:") {
                site = Some(name.trim().to_string());
            } else if let Some(step) = comment.strip_prefix("time_step:") {
                let step = step
                    .trim()
                    .parse()
                    .map_err(|_| parse_error(line_num + 1, "Invalid time_step"))?;
                time_step = Some(step);
            }
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(names) = &header else {
            if parts.next() != Some("timestamp") {
                return Err(parse_error(line_num + 1, "Expected header: timestamp name1 name2 ..."));
            }
            let names: Vec<String> = parts.map(str::to_string).collect();
            columns = vec![Vec::new(); names.len()];
            header = Some(names);
            continue;
        };

        let stamp = parts.next().unwrap_or_default();
        let t = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .map_err(|e| parse_error(line_num + 1, format!("Invalid timestamp '{stamp}': {e}")))?;
        let values: Vec<&str> = parts.collect();
        if values.len() != names.len() {
            return Err(parse_error(
                line_num + 1,
                format!("Expected {} values, found {}", names.len(), values.len()),
            ));
        }
        for ((column, raw), name) in columns.iter_mut().zip(values).zip(names) {
            let v: f64 = raw
                .parse()
                .map_err(|_| parse_error(line_num + 1, format!("Invalid value for {name}")))?;
            column.push(v);
        }
        timestamps.push(t);
    }

    let Some(names) = header else {
        return Err(SourceFileError::EmptyFile);
    };
    if timestamps.is_empty() {
        return Err(SourceFileError::EmptyFile);
    }

    let time_step = match (time_step, timestamps.get(1)) {
        (Some(step), _) => step,
        (None, Some(&t1)) => u32::try_from((t1 - timestamps[0]).num_minutes())
            .map_err(|_| parse_error(0, "Records are not in time order"))?,
        (None, None) => return Err(parse_error(0, "Cannot infer the time step from a single record")),
    };

    let mut ds = Dataset::from_columns(timestamps, time_step, names.into_iter().zip(columns))?;
    if let Some(site) = site {
        ds = ds.with_site(site);
    }
    Ok(ds)
}

/// Write a dataset in the same format. Rejected samples are written as the
/// missing sentinel; flags are not preserved.
pub fn write_dataset_file(path: &Path, ds: &Dataset) -> Result<(), SourceFileError> {
    let mut file = BufWriter::new(File::create(path)?);

    let site = &ds.attributes().site;
    if !site.is_empty() {
        writeln!(file, "# site: {site}")?;
    }
    writeln!(file, "# level: {}", ds.level())?;
    writeln!(file, "# time_step: {}", ds.time_step())?;

    let series: Vec<_> = ds.iter().collect();
    write!(file, "timestamp")?;
    for s in &series {
        write!(file, " {}", s.name())?;
    }
    writeln!(file)?;

    for (i, t) in ds.timestamps().iter().enumerate() {
        write!(file, "{}", t.format(TIMESTAMP_FORMAT))?;
        for s in &series {
            write!(file, " {}", s.data()[i])?;
        }
        writeln!(file)?;
    }
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MISSING;
    use crate::types::FlagCode;
    use tempfile::NamedTempFile;

    const CONTENT: &str = r#"
# Alternate site
# site: Daly River
timestamp Ta Fsd
2024-01-01T00:00:00 24.1 0.0
2024-01-01T00:30:00 -9999 0.0
2024-01-01T01:00:00 23.5 nan
"#;

    #[test]
    fn test_parse_dataset() {
        let ds = parse_dataset(CONTENT).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.time_step(), 30);
        assert_eq!(ds.attributes().site, "Daly River");

        let ta = ds.series("Ta").unwrap();
        assert_eq!(ta.data()[0], 24.1);
        assert_eq!(ta.flag()[1], FlagCode::Missing);
        let fsd = ds.series("Fsd").unwrap();
        assert_eq!(fsd.data()[2], MISSING);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_dataset("# only comments"), Err(SourceFileError::EmptyFile)));
        assert!(matches!(
            parse_dataset("Ta Fsd\n"),
            Err(SourceFileError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse_dataset("timestamp Ta\n2024-01-01T00:00:00 1.0 2.0\n"),
            Err(SourceFileError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            parse_dataset("timestamp Ta\n2024-01-01 1.0\n"),
            Err(SourceFileError::Parse { .. })
        ));
    }

    #[test]
    fn test_single_record_needs_time_step() {
        let single = "timestamp Ta\n2024-01-01T00:00:00 1.0\n";
        assert!(parse_dataset(single).is_err());
        let ds = parse_dataset(&format!("# time_step: 60\n{single}")).unwrap();
        assert_eq!(ds.time_step(), 60);
    }

    #[test]
    fn test_irregular_axis_rejected() {
        let content = "timestamp Ta\n2024-01-01T00:00:00 1\n2024-01-01T00:30:00 2\n2024-01-01T02:00:00 3\n";
        assert!(matches!(parse_dataset(content), Err(SourceFileError::Dataset(_))));
    }

    #[test]
    fn test_write_then_read() {
        let ds = parse_dataset(CONTENT).unwrap();
        let file = NamedTempFile::new().unwrap();
        write_dataset_file(file.path(), &ds).unwrap();

        let back = read_dataset_file(file.path()).unwrap();
        assert_eq!(back.timestamps(), ds.timestamps());
        assert_eq!(back.attributes().site, "Daly River");
        assert_eq!(back.series("Ta").unwrap().data(), ds.series("Ta").unwrap().data());
        assert_eq!(back.series("Fsd").unwrap().flag()[2], FlagCode::Missing);
    }
}
