//! Quality-control checks.
//!
//! - [`range`]: monthly lower/upper bounds
//! - [`diurnal`]: outliers against the month × time-of-day statistics
//! - [`diagnostic`]: instrument self-diagnostics
//! - [`exclusion`]: user-specified date and time-of-day windows
//! - [`gaps`]: flux-gap coordination between `Fe`, `Fh` and `Fc`
//! - [`ustar`]: friction velocity filter
//!
//! Every check rejects only samples that are still good, so earlier
//! rejections keep their reason code. The range and diurnal codes depend on
//! the dataset's processing level.
//!
//! [`run_qc_checks`] runs one QC pass over every configured variable and
//! repeats it until a pass rejects nothing. Checks interact (a diagnostic
//! rejection changes the diurnal statistics, a range rejection of a key
//! variable trips the diagnostic fallback), so iterating to a fixed point
//! is what makes a second run a no-op regardless of check order.

pub mod diagnostic;
pub mod diurnal;
pub mod exclusion;
pub mod gaps;
pub mod range;
pub mod ustar;

use std::collections::BTreeMap;
use std::ops::AddAssign;

use tracing::{debug, info};

use crate::config::{ControlConfig, DiagnosticConfig, VariableConfig};
use crate::pipeline::{PipelineError, Transform, TransformOutcome};
use crate::series::{Dataset, DatasetError};

pub use diagnostic::{diagnostic_check, diagnostic_failures};
pub use diurnal::diurnal_check;
pub use exclusion::{exclude_dates, exclude_hours};
pub use gaps::FluxGapCoordination;
pub use range::range_check;
pub use ustar::UstarFilter;

/// Samples rejected by each check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QcReport {
    pub diagnostic: usize,
    pub excluded: usize,
    pub range: usize,
    pub diurnal: usize,
    /// Passes run, including the final one that rejected nothing.
    pub passes: usize,
}

impl QcReport {
    /// Total samples rejected.
    pub fn total(&self) -> usize {
        self.diagnostic + self.excluded + self.range + self.diurnal
    }
}

impl AddAssign for QcReport {
    fn add_assign(&mut self, rhs: Self) {
        self.diagnostic += rhs.diagnostic;
        self.excluded += rhs.excluded;
        self.range += rhs.range;
        self.diurnal += rhs.diurnal;
        self.passes += rhs.passes;
    }
}

/// One pass of all checks.
fn qc_pass(
    ds: &mut Dataset,
    variables: &BTreeMap<String, VariableConfig>,
    diagnostics: &DiagnosticConfig,
) -> Result<QcReport, DatasetError> {
    let level = ds.level();
    let mut report = QcReport {
        passes: 1,
        ..Default::default()
    };

    for (instrument, code) in diagnostics.instruments() {
        report.diagnostic += diagnostic_check(ds, instrument, code);
    }

    for (name, variable) in variables {
        if !variable.has_qc() {
            continue;
        }
        if !ds.contains(name) {
            debug!(series = %name, level = %level, "not present, QC skipped");
            continue;
        }
        report.excluded += exclude_dates(ds, name, &variable.exclude_dates)?;
        report.excluded += exclude_hours(ds, name, &variable.exclude_hours)?;
        if let Some(check) = &variable.range {
            report.range += range_check(ds, name, check, level.range_code())?;
        }
        if let Some(check) = &variable.diurnal {
            report.diurnal += diurnal_check(ds, name, check, level.diurnal_code())?;
        }
    }
    Ok(report)
}

fn run_checks(
    ds: &mut Dataset,
    variables: &BTreeMap<String, VariableConfig>,
    diagnostics: &DiagnosticConfig,
) -> Result<QcReport, DatasetError> {
    let mut report = QcReport::default();
    loop {
        let pass = qc_pass(ds, variables, diagnostics)?;
        let rejected = pass.total();
        report += pass;
        if rejected == 0 {
            break;
        }
    }
    info!(
        level = %ds.level(),
        rejected = report.total(),
        passes = report.passes,
        "QC checks complete"
    );
    Ok(report)
}

/// Run range, diurnal, diagnostic and exclusion checks to a fixed point.
///
/// # Errors
/// Only structural dataset errors; unconfigured or absent variables are
/// skipped.
pub fn run_qc_checks(ds: &mut Dataset, config: &ControlConfig) -> Result<QcReport, DatasetError> {
    run_checks(ds, &config.variables, &config.diagnostics)
}

/// [`run_qc_checks`] as a transform, for re-running QC inside the L3 chain.
#[derive(Clone, Debug, Default)]
pub struct QcChecks {
    variables: BTreeMap<String, VariableConfig>,
    diagnostics: DiagnosticConfig,
}

impl QcChecks {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            variables: config.variables.clone(),
            diagnostics: config.diagnostics.clone(),
        }
    }
}

impl Transform for QcChecks {
    fn name(&self) -> &'static str {
        "QcChecks"
    }

    fn description(&self) -> &str {
        "Range, diurnal, diagnostic and exclusion checks"
    }

    fn requires(&self) -> Vec<String> {
        Vec::new()
    }

    fn produces(&self) -> Vec<String> {
        Vec::new()
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let report = run_checks(ds, &self.variables, &self.diagnostics)?;
        let outputs = self
            .variables
            .keys()
            .filter(|name| ds.contains(name))
            .cloned()
            .collect();
        Ok(TransformOutcome::Applied {
            outputs,
            masked: report.total(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiurnalCheck, RangeCheck};
    use crate::series::MISSING;
    use crate::types::{FlagCode, ProcessingLevel};
    use chrono::{Duration, NaiveDate};

    fn dataset(level: ProcessingLevel) -> Dataset {
        let t0 = NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let n = 48 * 6;
        let times = (0..n).map(|i| t0 + Duration::minutes(30 * i as i64)).collect();
        let mut fc: Vec<f64> = (0..n).map(|i| -0.2 + 0.01 * (i % 48) as f64 + 0.001 * (i / 48) as f64).collect();
        fc[10] = 150.0;
        fc[48 * 2 + 30] = 40.0;
        let ds = Dataset::from_columns(
            times,
            30,
            [
                ("Fc".to_string(), fc),
                ("Ux".to_string(), vec![2.0; n]),
                ("Diag_CSAT".to_string(), vec![0.0; n]),
            ],
        )
        .unwrap();
        ds.to_level(level)
    }

    fn config() -> ControlConfig {
        ControlConfig::default().with_variable(
            "Fc",
            VariableConfig::default()
                .with_range(RangeCheck::new(-100.0, 100.0))
                .with_diurnal(DiurnalCheck::new(2.0)),
        )
    }

    #[test]
    fn test_level_specific_codes() {
        let mut ds = dataset(ProcessingLevel::L3);
        let report = run_qc_checks(&mut ds, &config()).unwrap();
        assert_eq!(report.range, 1);
        let fc = ds.series("Fc").unwrap();
        assert_eq!(fc.flag()[10], FlagCode::RangeL3);
        assert_eq!(fc.data()[10], MISSING);
        assert_eq!(fc.flag()[48 * 2 + 30], FlagCode::DiurnalL3);
    }

    #[test]
    fn test_rerun_changes_nothing() {
        let mut ds = dataset(ProcessingLevel::L2);
        let config = config();
        run_qc_checks(&mut ds, &config).unwrap();
        let snapshot = ds.clone();

        let report = run_qc_checks(&mut ds, &config).unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(report.passes, 1);
        assert_eq!(ds, snapshot);
    }

    #[test]
    fn test_transform_reports_masked() {
        let mut ds = dataset(ProcessingLevel::L2);
        let outcome = QcChecks::new(&config()).apply(&mut ds).unwrap();
        match outcome {
            TransformOutcome::Applied { outputs, masked } => {
                assert_eq!(outputs, vec!["Fc".to_string()]);
                assert!(masked >= 2);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(ds.invariant_violations().is_empty());
    }
}
