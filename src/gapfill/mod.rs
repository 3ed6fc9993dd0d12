//! L4 gap filling.
//!
//! The cascade runs in strict precedence, each stage filling only samples
//! that are still missing:
//!
//! 1. externally gap-filled flux set ([`fill_from_external`])
//! 2. alternate sites ([`fill_from_alternate`])
//! 3. climatology ([`fill_from_climatology`])
//! 4. ratio surfaces for `Fe`, `Fh`, `Fc` ([`fill_from_ratios`])
//! 5. linear interpolation of short gaps ([`interpolate_gaps`])
//!
//! A stage whose source is not available is skipped with a warning.

mod sources;
mod table;

pub mod interpolate;
pub mod ratio;
pub mod substitute;

use tracing::{debug, info, warn};

use crate::config::{ControlConfig, GapFillConfig};
use crate::series::{Dataset, DatasetError};

pub use interpolate::interpolate_gaps;
pub use ratio::{RatioFill, fill_from_ratios};
pub use sources::GapFillSources;
pub use substitute::{fill_from_alternate, fill_from_climatology, fill_from_external};
pub use table::MonthlyTable;

/// Samples filled by each stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GapFillReport {
    pub external: usize,
    pub alternate: usize,
    pub climatology: usize,
    pub ratio: RatioFill,
    pub interpolated: usize,
}

impl GapFillReport {
    pub fn total(&self) -> usize {
        self.external + self.alternate + self.climatology + self.ratio.total() + self.interpolated
    }
}

/// Configured variables present in `ds`.
fn targets<'a>(ds: &Dataset, config: &'a ControlConfig) -> Vec<(&'a str, &'a GapFillConfig)> {
    config
        .variables
        .iter()
        .filter_map(|(name, v)| v.gap_fill.as_ref().map(|g| (name.as_str(), g)))
        .filter(|(name, _)| {
            let present = ds.contains(name);
            if !present {
                debug!(series = name, "not present, gap fill skipped");
            }
            present
        })
        .collect()
}

/// Run the full cascade over `ds`.
///
/// # Errors
/// Only structural dataset errors. Unloaded sources and absent series are
/// logged and skipped.
pub fn run_gap_fill(
    ds: &mut Dataset,
    config: &ControlConfig,
    sources: &GapFillSources,
) -> Result<GapFillReport, DatasetError> {
    let mut report = GapFillReport::default();
    let targets = targets(ds, config);

    if let Some(external) = &config.l4.external {
        match sources.dataset(&external.source) {
            Some(source) => {
                for (target, series) in &external.series {
                    if ds.contains(target) {
                        report.external += fill_from_external(ds, target, source, series)?;
                    } else {
                        debug!(series = %target, "not present, external fill skipped");
                    }
                }
            }
            None => warn!(source = %external.source, "external flux set not loaded, stage skipped"),
        }
    }

    for &(target, gap_fill) in &targets {
        for alternate in &gap_fill.alternate {
            match sources.dataset(&alternate.source) {
                Some(source) => report.alternate += fill_from_alternate(ds, target, source, alternate)?,
                None => warn!(target, source = %alternate.source, "alternate dataset not loaded, skipped"),
            }
        }
    }

    for &(target, gap_fill) in &targets {
        let Some(key) = &gap_fill.climatology else {
            continue;
        };
        match sources.table(key) {
            Some(table) => report.climatology += fill_from_climatology(ds, target, table)?,
            None => warn!(target, table = %key, "climatology table not loaded, skipped"),
        }
    }

    if let Some(ratios) = &config.l4.ratios {
        report.ratio = fill_from_ratios(ds, ratios, sources)?;
    }

    for &(target, gap_fill) in &targets {
        let max_gap = gap_fill
            .max_interpolation_gap
            .or(config.l4.max_interpolation_gap);
        if let Some(max_gap) = max_gap {
            report.interpolated += interpolate_gaps(ds, target, max_gap)?;
        }
    }

    info!(
        external = report.external,
        alternate = report.alternate,
        climatology = report.climatology,
        ratio = report.ratio.total(),
        interpolated = report.interpolated,
        "gap fill complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AlternateSource, L4Config, RatioConfig, VariableConfig};
    use crate::series::MISSING;
    use crate::types::FlagCode;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn times(n: usize) -> Vec<NaiveDateTime> {
        let t0 = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        (0..n).map(|i| t0 + Duration::minutes(30 * i as i64)).collect()
    }

    #[test]
    fn test_ratio_wins_over_interpolation() {
        let mut ds = Dataset::from_columns(
            times(3),
            30,
            [
                ("Fa".to_string(), vec![300.0, 300.0, 300.0]),
                ("Fe".to_string(), vec![100.0, MISSING, 120.0]),
            ],
        )
        .unwrap();
        let config = ControlConfig::default()
            .with_variable("Fe", VariableConfig::default().with_gap_fill(GapFillConfig::default()))
            .with_l4(L4Config::default().with_ratios(RatioConfig {
                evaporative_fraction: "ef".into(),
                bowen_ratio: None,
                water_use_efficiency: None,
            }));
        let sources = GapFillSources::new().with_table("ef", MonthlyTable::constant(48, 0.5).unwrap());

        let report = run_gap_fill(&mut ds, &config, &sources).unwrap();
        assert_eq!(report.ratio.fe, 1);
        assert_eq!(report.interpolated, 0);

        let fe = ds.series("Fe").unwrap();
        assert_relative_eq!(fe.data()[1], 150.0, epsilon = 1e-9);
        assert_eq!(fe.flag()[1], FlagCode::Ratio);
    }

    #[test]
    fn test_alternate_before_climatology() {
        let mut ds = Dataset::from_columns(times(2), 30, [("Ta".to_string(), vec![MISSING, MISSING])]).unwrap();
        let alt = Dataset::from_columns(times(2), 30, [("Ta".to_string(), vec![18.0, MISSING])]).unwrap();
        let gap_fill = GapFillConfig {
            alternate: vec![AlternateSource::new("alt")],
            climatology: Some("clim".into()),
            max_interpolation_gap: None,
        };
        let config = ControlConfig::default()
            .with_variable("Ta", VariableConfig::default().with_gap_fill(gap_fill))
            .with_l4(L4Config::default().with_max_interpolation_gap(None));
        let sources = GapFillSources::new()
            .with_dataset("alt", alt)
            .with_table("clim", MonthlyTable::constant(48, 12.0).unwrap());

        let report = run_gap_fill(&mut ds, &config, &sources).unwrap();
        assert_eq!(report.alternate, 1);
        assert_eq!(report.climatology, 1);
        let ta = ds.series("Ta").unwrap();
        assert_eq!(ta.flag()[0], FlagCode::AlternateSite);
        assert_eq!(ta.flag()[1], FlagCode::Climatology);
        assert_relative_eq!(ta.data()[1], 12.0);
    }

    #[test]
    fn test_unloaded_sources_skip() {
        let mut ds = Dataset::from_columns(times(3), 30, [("Ta".to_string(), vec![1.0, MISSING, 3.0])]).unwrap();
        let gap_fill = GapFillConfig {
            alternate: vec![AlternateSource::new("nowhere")],
            ..Default::default()
        };
        let config = ControlConfig::default().with_variable("Ta", VariableConfig::default().with_gap_fill(gap_fill));

        let report = run_gap_fill(&mut ds, &config, &GapFillSources::new()).unwrap();
        // Falls through to interpolation with the L4 default gap
        assert_eq!(report.alternate, 0);
        assert_eq!(report.interpolated, 1);
        assert_eq!(report.total(), 1);
    }
}
