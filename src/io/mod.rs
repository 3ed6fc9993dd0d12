//! Text exchange formats for datasets and lookup tables.
//!
//! The processing core works on in-memory [`Dataset`](crate::series::Dataset)s.
//! This module reads the two file kinds the gap-fill cascade consumes
//! (alternate-site datasets and time-of-day × month tables), writes datasets
//! back out, and caches loaded files for the length of a run.
//!
//! # File Formats
//!
//! ## Dataset Files
//!
//! ```text
//! # site: Daly River
//! timestamp Ta Ah
//! 2024-01-01T00:00:00 24.1 17.9
//! 2024-01-01T00:30:00 23.8 -9999
//! ```
//!
//! ## Table Files
//!
//! ```text
//! # columns: Jan Feb Mar Apr May Jun Jul Aug Sep Oct Nov Dec
//! 0.61 0.63 0.60 0.52 0.41 0.33 0.30 0.29 0.31 0.40 0.52 0.58
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use fluxqc::io::{SourceCache, read_dataset_file};
//!
//! let l1 = read_dataset_file(Path::new("HowardSprings_L1.txt")).unwrap();
//! let mut cache = SourceCache::new();
//! let ef = cache.table(Path::new("ef.txt")).unwrap();
//! println!("{} records, {} EF bins", l1.len(), ef.bins());
//! ```

mod cache;
mod dataset_reader;
mod table_reader;

use thiserror::Error;

use crate::series::DatasetError;

pub use cache::SourceCache;
pub use dataset_reader::{TIMESTAMP_FORMAT, parse_dataset, read_dataset_file, write_dataset_file};
pub use table_reader::{parse_table, read_table_file};

/// Error type for source file reading.
#[derive(Debug, Error)]
pub enum SourceFileError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error with line number
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// No data records
    #[error("File contains no data")]
    EmptyFile,

    /// Records do not form a valid dataset
    #[error("Invalid dataset: {0}")]
    Dataset(#[from] DatasetError),
}
