//! Level-specific settings: the L3 transform chain and L4 gap filling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pipeline::TransformKind;
use crate::series::names;

/// Which WPL formulation to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WplForm {
    /// Operate on raw fluxes (W/m², mg/m²/s).
    #[default]
    Flux,
    /// Operate on raw covariances.
    Covariance,
}

/// L3 settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct L3Config {
    /// Ordered transform chain.
    pub transforms: Vec<TransformKind>,
    /// WPL formulation used by the density correction.
    pub wpl_form: WplForm,
}

impl Default for L3Config {
    fn default() -> Self {
        Self {
            transforms: TransformKind::standard_l3(),
            wpl_form: WplForm::Flux,
        }
    }
}

impl L3Config {
    /// Settings with an explicit transform chain.
    pub fn with_transforms(transforms: Vec<TransformKind>) -> Self {
        Self {
            transforms,
            ..Default::default()
        }
    }

    pub fn with_wpl_form(mut self, form: WplForm) -> Self {
        self.wpl_form = form;
        self
    }
}

/// Ratio surfaces used to reconstruct fluxes from available energy.
///
/// Each entry is the key of a time-of-day × month table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatioConfig {
    /// Evaporative fraction `Fe/Fa`.
    pub evaporative_fraction: String,
    /// Bowen ratio `Fh/Fe`.
    #[serde(default)]
    pub bowen_ratio: Option<String>,
    /// Water use efficiency `Fc/Fe`.
    #[serde(default)]
    pub water_use_efficiency: Option<String>,
}

/// Externally gap-filled flux set, mapped target name → source name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalFluxConfig {
    /// Key of the external dataset.
    pub source: String,
    /// Series copied into missing slots.
    pub series: BTreeMap<String, String>,
}

/// Daily statistic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DailyStatistic {
    Mean,
    Sum,
    Min,
    Max,
}

/// One daily output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailySeriesConfig {
    /// Input series.
    pub series: String,
    pub statistic: DailyStatistic,
    /// Multiplier applied to each sample before aggregation.
    #[serde(default = "unit_scale")]
    pub scale: f64,
    /// Output name; defaults to `<series>_<statistic>`.
    #[serde(default)]
    pub output: Option<String>,
}

fn unit_scale() -> f64 {
    1.0
}

impl DailySeriesConfig {
    pub fn new(series: impl Into<String>, statistic: DailyStatistic) -> Self {
        Self {
            series: series.into(),
            statistic,
            scale: 1.0,
            output: None,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Name of the daily series.
    pub fn output_name(&self) -> String {
        match &self.output {
            Some(name) => name.clone(),
            None => {
                let suffix = match self.statistic {
                    DailyStatistic::Mean => "mean",
                    DailyStatistic::Sum => "sum",
                    DailyStatistic::Min => "min",
                    DailyStatistic::Max => "max",
                };
                format!("{}_{}", self.series, suffix)
            }
        }
    }
}

/// Daily aggregation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyConfig {
    /// Fraction of a day's samples that must be good for a daily value.
    pub min_valid_fraction: f64,
    pub series: Vec<DailySeriesConfig>,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            min_valid_fraction: 1.0,
            series: Vec::new(),
        }
    }
}

impl DailyConfig {
    /// Energy and carbon budget defaults for 30 minute data.
    ///
    /// Energy fluxes are summed to MJ/m²/day, CO₂ flux to g CO₂/m²/day.
    pub fn budget(time_step_minutes: u32) -> Self {
        let seconds = f64::from(time_step_minutes) * 60.0;
        Self {
            min_valid_fraction: 1.0,
            series: vec![
                DailySeriesConfig::new(names::FN, DailyStatistic::Sum).with_scale(seconds / 1e6),
                DailySeriesConfig::new(names::FG, DailyStatistic::Sum).with_scale(seconds / 1e6),
                DailySeriesConfig::new(names::FH, DailyStatistic::Sum).with_scale(seconds / 1e6),
                DailySeriesConfig::new(names::FE, DailyStatistic::Sum).with_scale(seconds / 1e6),
                DailySeriesConfig::new(names::FC, DailyStatistic::Sum).with_scale(seconds / 1e3),
                DailySeriesConfig::new(names::TA, DailyStatistic::Mean),
                DailySeriesConfig::new(names::TA, DailyStatistic::Min),
                DailySeriesConfig::new(names::TA, DailyStatistic::Max),
            ],
        }
    }
}

/// L4 settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct L4Config {
    /// Longest gap (samples) filled by interpolation unless a variable
    /// overrides it. `None` disables interpolation by default.
    pub max_interpolation_gap: Option<usize>,
    /// Ratio-based reconstruction of Fe, Fh and Fc.
    pub ratios: Option<RatioConfig>,
    /// Externally gap-filled flux set consumed before the cascade.
    pub external: Option<ExternalFluxConfig>,
    /// Re-run the QC checks with L4 codes after gap filling.
    pub rerun_qc: bool,
    /// Daily aggregation.
    pub daily: Option<DailyConfig>,
}

impl Default for L4Config {
    fn default() -> Self {
        Self {
            max_interpolation_gap: Some(2),
            ratios: None,
            external: None,
            rerun_qc: false,
            daily: None,
        }
    }
}

impl L4Config {
    pub fn with_max_interpolation_gap(mut self, max_gap: Option<usize>) -> Self {
        self.max_interpolation_gap = max_gap;
        self
    }

    pub fn with_ratios(mut self, ratios: RatioConfig) -> Self {
        self.ratios = Some(ratios);
        self
    }

    pub fn with_external(mut self, external: ExternalFluxConfig) -> Self {
        self.external = Some(external);
        self
    }

    pub fn with_rerun_qc(mut self, rerun_qc: bool) -> Self {
        self.rerun_qc = rerun_qc;
        self
    }

    pub fn with_daily(mut self, daily: DailyConfig) -> Self {
        self.daily = Some(daily);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_output_name() {
        let d = DailySeriesConfig::new("Fe", DailyStatistic::Sum);
        assert_eq!(d.output_name(), "Fe_sum");
        assert_eq!(d.with_output("ET").output_name(), "ET");
    }

    #[test]
    fn test_budget_scales() {
        let d = DailyConfig::budget(30);
        assert_eq!(d.series[0].scale, 1800.0 / 1e6);
    }
}
