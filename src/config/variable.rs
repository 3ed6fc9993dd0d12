//! Per-variable QC, linear correction and gap-fill settings.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::types::MonthlyValues;

/// Monthly lower and upper bounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeCheck {
    pub lower: MonthlyValues,
    pub upper: MonthlyValues,
}

impl RangeCheck {
    /// Same bounds in every month.
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower: MonthlyValues::constant(lower),
            upper: MonthlyValues::constant(upper),
        }
    }
}

/// Number of standard deviations allowed around the time-of-day mean.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiurnalCheck {
    pub num_sd: MonthlyValues,
}

impl DiurnalCheck {
    pub fn new(num_sd: f64) -> Self {
        Self {
            num_sd: MonthlyValues::constant(num_sd),
        }
    }
}

/// Inclusive absolute date window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// True if `t` falls inside the window.
    #[inline]
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Constant offset (degrees) added to a wind direction inside an inclusive
/// window, for a sonic mounted off its nominal bearing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindDirectionOffset {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub offset: f64,
}

impl WindDirectionOffset {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, offset: f64) -> Self {
        Self { start, end, offset }
    }

    /// Offset to apply at `t`, zero outside the window.
    #[inline]
    pub fn at(&self, t: NaiveDateTime) -> f64 {
        if t >= self.start && t <= self.end {
            self.offset
        } else {
            0.0
        }
    }
}

/// Times of day excluded within a date window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Times of day to exclude, e.g. `"13:30:00"`.
    pub times: Vec<NaiveTime>,
}

/// Form of a linear correction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LinearKind {
    /// `y = slope·x + offset`.
    Linear { slope: f64, offset: f64 },
    /// Slope and offset vary linearly in time from the window start to its end.
    Drift {
        slope_start: f64,
        offset_start: f64,
        slope_end: f64,
        offset_end: f64,
    },
    /// `y = x + offset + rate·days`, days counted from the window start.
    LocalDrift { rate_per_day: f64, offset: f64 },
}

/// Linear correction applied over an inclusive time window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearCorrection {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub kind: LinearKind,
}

/// Polynomial applied to alternate-site data within a time window.
///
/// Coefficients are highest power first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolynomialWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub coefficients: Vec<f64>,
}

impl PolynomialWindow {
    /// Evaluate the polynomial with Horner's scheme.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients.iter().fold(0.0, |acc, &c| acc * x + c)
    }
}

/// An alternate-site source for one variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlternateSource {
    /// Key of the alternate dataset (file path or registered name).
    pub source: String,
    /// Series name in the alternate dataset; defaults to the target name.
    #[serde(default)]
    pub series: Option<String>,
    /// Bias-correction polynomials.
    #[serde(default)]
    pub transforms: Vec<PolynomialWindow>,
}

impl AlternateSource {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            series: None,
            transforms: Vec::new(),
        }
    }

    /// Read a differently named series from the alternate dataset.
    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        self.series = Some(series.into());
        self
    }

    /// Add a bias-correction polynomial.
    pub fn with_transform(mut self, window: PolynomialWindow) -> Self {
        self.transforms.push(window);
        self
    }
}

/// Gap-fill sources for one variable, in cascade order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapFillConfig {
    /// Alternate sites, tried in order.
    pub alternate: Vec<AlternateSource>,
    /// Key of the climatology table.
    pub climatology: Option<String>,
    /// Longest gap (samples) filled by interpolation; overrides the L4 default.
    pub max_interpolation_gap: Option<usize>,
}

/// Everything configured for a single variable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableConfig {
    pub range: Option<RangeCheck>,
    pub diurnal: Option<DiurnalCheck>,
    pub exclude_dates: Vec<DateWindow>,
    pub exclude_hours: Vec<HourWindow>,
    pub linear: Vec<LinearCorrection>,
    pub gap_fill: Option<GapFillConfig>,
}

impl VariableConfig {
    pub fn with_range(mut self, range: RangeCheck) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_diurnal(mut self, diurnal: DiurnalCheck) -> Self {
        self.diurnal = Some(diurnal);
        self
    }

    pub fn with_exclude_date(mut self, window: DateWindow) -> Self {
        self.exclude_dates.push(window);
        self
    }

    pub fn with_exclude_hours(mut self, window: HourWindow) -> Self {
        self.exclude_hours.push(window);
        self
    }

    pub fn with_linear(mut self, correction: LinearCorrection) -> Self {
        self.linear.push(correction);
        self
    }

    pub fn with_gap_fill(mut self, gap_fill: GapFillConfig) -> Self {
        self.gap_fill = Some(gap_fill);
        self
    }

    /// True if any QC check is configured.
    pub fn has_qc(&self) -> bool {
        self.range.is_some()
            || self.diurnal.is_some()
            || !self.exclude_dates.is_empty()
            || !self.exclude_hours.is_empty()
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if let Some(range) = &self.range {
            range.lower.validate(&format!("{name}.range.lower"))?;
            range.upper.validate(&format!("{name}.range.upper"))?;
        }
        if let Some(diurnal) = &self.diurnal {
            diurnal.num_sd.validate(&format!("{name}.diurnal.num_sd"))?;
        }
        for window in &self.exclude_dates {
            if window.end < window.start {
                return Err(ConfigError::InvalidParameter {
                    key: format!("{name}.exclude_dates"),
                    message: format!("window ends ({}) before it starts ({})", window.end, window.start),
                });
            }
        }
        Ok(())
    }
}
