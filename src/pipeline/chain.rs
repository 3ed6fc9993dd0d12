//! Ordered transform chain with static order validation.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::config::ControlConfig;
use crate::series::Dataset;

use super::error::PipelineError;
use super::registry::resolve_chain;
use super::traits::{Transform, TransformOutcome};

/// What one transform did during a run.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformRecord {
    pub name: String,
    pub outcome: TransformOutcome,
}

/// An ordered list of transforms.
#[derive(Default)]
pub struct Pipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the configured L3 chain.
    pub fn from_config(config: &ControlConfig) -> Self {
        Self {
            transforms: resolve_chain(&config.l3.transforms, config),
        }
    }

    /// Append a transform (builder style).
    pub fn with(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    /// Append a boxed transform.
    pub fn push(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Transform names in run order.
    pub fn names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Check the declared dependencies against `ds` before running.
    ///
    /// A requirement produced only by a later transform is an error. A
    /// requirement produced nowhere and absent from `ds` is logged and
    /// returned; that transform will be skipped at run time.
    ///
    /// # Errors
    /// [`PipelineError::OrderViolation`] for the first misordered requirement.
    pub fn validate(&self, ds: &Dataset) -> Result<Vec<String>, PipelineError> {
        let mut available: HashSet<String> = ds.names().map(str::to_string).collect();
        let mut missing = Vec::new();

        for (k, transform) in self.transforms.iter().enumerate() {
            for series in transform.requires() {
                if available.contains(&series) {
                    continue;
                }
                let later = self.transforms[k + 1..]
                    .iter()
                    .find(|t| t.produces().contains(&series));
                if let Some(producer) = later {
                    return Err(PipelineError::OrderViolation {
                        transform: transform.name().to_string(),
                        series,
                        producer: producer.name().to_string(),
                    });
                }
                warn!(transform = transform.name(), missing = %series, "input not available, transform will be skipped");
                missing.push(series);
            }
            available.extend(transform.produces());
        }
        Ok(missing)
    }

    /// Run every transform in order.
    ///
    /// Transforms with missing inputs are skipped with a warning. Applied
    /// transforms are appended to the dataset's audit trail.
    ///
    /// # Errors
    /// The first run-aborting error; the dataset keeps the outputs of the
    /// transforms that completed.
    pub fn run(&self, ds: &mut Dataset) -> Result<Vec<TransformRecord>, PipelineError> {
        let mut records = Vec::with_capacity(self.transforms.len());
        for transform in &self.transforms {
            let name = transform.name();
            let missing = transform.missing_inputs(ds);
            let outcome = if missing.is_empty() {
                transform.apply(ds)?
            } else {
                warn!(transform = name, missing = ?missing, "missing inputs, skipped");
                TransformOutcome::skipped(format!("missing inputs: {}", missing.join(", ")))
            };

            match &outcome {
                TransformOutcome::Applied { outputs, masked } => {
                    debug!(transform = name, outputs = outputs.len(), masked, "applied");
                    ds.record_function(name);
                }
                TransformOutcome::Skipped { reason } => {
                    debug!(transform = name, %reason, "skipped");
                }
            }
            records.push(TransformRecord {
                name: name.to_string(),
                outcome,
            });
        }
        let applied = records.iter().filter(|r| r.outcome.is_applied()).count();
        info!(level = %ds.level(), applied, skipped = records.len() - applied, "transform chain complete");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corrections::{AvailableEnergy, MergeSeries, NetRadiation, SoilHeatStorage};
    use crate::config::SoilConfig;
    use chrono::{Duration, NaiveDate};

    fn dataset(columns: &[&str]) -> Dataset {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let times = (0..4).map(|i| t0 + Duration::minutes(30 * i)).collect();
        Dataset::from_columns(times, 30, columns.iter().map(|c| (c.to_string(), vec![1.0; 4]))).unwrap()
    }

    #[test]
    fn test_order_violation() {
        // Fa needs Fn, which only NetRadiation produces, and it runs later
        let pipeline = Pipeline::new().with(AvailableEnergy).with(NetRadiation);
        let ds = dataset(&["Fsd", "Fsu", "Fld", "Flu", "Fg"]);
        let err = pipeline.validate(&ds).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::OrderViolation { ref transform, ref series, ref producer }
                if transform == "AvailableEnergy" && series == "Fn" && producer == "NetRadiation"
        ));
        assert!(Pipeline::new().with(NetRadiation).with(AvailableEnergy).validate(&ds).unwrap().is_empty());
    }

    #[test]
    fn test_self_produced_input_is_not_a_violation() {
        let soil = SoilHeatStorage::from_config(&SoilConfig::new(0.08, 1300.0, 0.01, 0.1)).unwrap();
        let pipeline = Pipeline::new().with(soil);
        let missing = pipeline.validate(&dataset(&["Ts"])).unwrap();
        assert_eq!(missing, vec!["Fg".to_string()]);
    }

    #[test]
    fn test_run_skips_and_records() {
        let pipeline = Pipeline::new()
            .with(MergeSeries::new("Ta", &["Ta_HMP"]))
            .with(NetRadiation);
        let mut ds = dataset(&["Ta_HMP"]);
        let records = pipeline.run(&mut ds).unwrap();

        assert!(records[0].outcome.is_applied());
        assert!(!records[1].outcome.is_applied());
        assert_eq!(ds.attributes().functions, vec!["MergeSeries".to_string()]);
        assert!(ds.contains("Ta"));
    }
}
