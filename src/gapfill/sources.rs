//! Read-only data sources for the gap-fill cascade.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::ControlConfig;
use crate::io::{SourceCache, SourceFileError};
use crate::series::Dataset;

use super::MonthlyTable;

/// Alternate-site datasets and lookup tables, keyed as referenced in the
/// control parameters.
///
/// Sources are shared through `Arc` and never mutated by the cascade.
#[derive(Clone, Debug, Default)]
pub struct GapFillSources {
    datasets: HashMap<String, Arc<Dataset>>,
    tables: HashMap<String, Arc<MonthlyTable>>,
}

impl GapFillSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset under `key`.
    pub fn with_dataset(mut self, key: impl Into<String>, dataset: Dataset) -> Self {
        self.datasets.insert(key.into(), Arc::new(dataset));
        self
    }

    /// Register a shared dataset under `key`.
    pub fn with_shared_dataset(mut self, key: impl Into<String>, dataset: Arc<Dataset>) -> Self {
        self.datasets.insert(key.into(), dataset);
        self
    }

    /// Register a table under `key`.
    pub fn with_table(mut self, key: impl Into<String>, table: MonthlyTable) -> Self {
        self.tables.insert(key.into(), Arc::new(table));
        self
    }

    pub fn dataset(&self, key: &str) -> Option<&Dataset> {
        self.datasets.get(key).map(Arc::as_ref)
    }

    pub fn table(&self, key: &str) -> Option<&MonthlyTable> {
        self.tables.get(key).map(Arc::as_ref)
    }

    /// Load every source the configuration references, treating keys as file
    /// paths. Keys already registered are not reloaded.
    ///
    /// # Errors
    /// The first file that cannot be read or parsed.
    pub fn load(mut self, config: &ControlConfig, cache: &mut SourceCache) -> Result<Self, SourceFileError> {
        let mut dataset_keys: Vec<&str> = Vec::new();
        let mut table_keys: Vec<&str> = Vec::new();

        for variable in config.variables.values() {
            let Some(gap_fill) = &variable.gap_fill else {
                continue;
            };
            dataset_keys.extend(gap_fill.alternate.iter().map(|a| a.source.as_str()));
            table_keys.extend(gap_fill.climatology.as_deref());
        }
        if let Some(external) = &config.l4.external {
            dataset_keys.push(&external.source);
        }
        if let Some(ratios) = &config.l4.ratios {
            table_keys.push(&ratios.evaporative_fraction);
            table_keys.extend(ratios.bowen_ratio.as_deref());
            table_keys.extend(ratios.water_use_efficiency.as_deref());
        }

        for key in dataset_keys {
            if !self.datasets.contains_key(key) {
                let dataset = cache.dataset(Path::new(key))?;
                self.datasets.insert(key.to_string(), dataset);
            }
        }
        for key in table_keys {
            if !self.tables.contains_key(key) {
                let table = cache.table(Path::new(key))?;
                self.tables.insert(key.to_string(), table);
            }
        }
        debug!(datasets = self.datasets.len(), tables = self.tables.len(), "gap-fill sources ready");
        Ok(self)
    }
}
