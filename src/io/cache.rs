//! Per-run cache of loaded source files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use super::{SourceFileError, read_dataset_file, read_table_file};
use crate::gapfill::MonthlyTable;
use crate::series::Dataset;

/// Datasets and tables loaded from disk, keyed by path.
///
/// Each file is read at most once; later requests share the loaded copy.
#[derive(Debug, Default)]
pub struct SourceCache {
    datasets: HashMap<PathBuf, Arc<Dataset>>,
    tables: HashMap<PathBuf, Arc<MonthlyTable>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dataset at `path`, reading it on first use.
    pub fn dataset(&mut self, path: &Path) -> Result<Arc<Dataset>, SourceFileError> {
        if let Some(ds) = self.datasets.get(path) {
            return Ok(Arc::clone(ds));
        }
        let ds = Arc::new(read_dataset_file(path)?);
        info!(path = %path.display(), records = ds.len(), "loaded dataset");
        self.datasets.insert(path.to_path_buf(), Arc::clone(&ds));
        Ok(ds)
    }

    /// Table at `path`, reading it on first use.
    pub fn table(&mut self, path: &Path) -> Result<Arc<MonthlyTable>, SourceFileError> {
        if let Some(table) = self.tables.get(path) {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(read_table_file(path)?);
        info!(path = %path.display(), bins = table.bins(), "loaded table");
        self.tables.insert(path.to_path_buf(), Arc::clone(&table));
        Ok(table)
    }

    /// Number of files loaded.
    pub fn len(&self) -> usize {
        self.datasets.len() + self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
