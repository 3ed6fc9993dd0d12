//! Time-indexed collection of series sharing one time axis.
//!
//! A [`Dataset`] owns a validated, fixed-interval time axis and a map of
//! named [`Series`]. All series have the dataset's length. New derived
//! series go through [`Dataset::create`], which builds the flag array,
//! enforces the sentinel/flag pairing and records the inputs for audit.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use fluxqc::series::{Dataset, NewSeries, MISSING};
//! use fluxqc::types::FlagCode;
//!
//! let t0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 30, 0).unwrap();
//! let times: Vec<_> = (0..3).map(|i| t0 + chrono::Duration::minutes(30 * i)).collect();
//!
//! let mut ds = Dataset::from_columns(times, 30, [("Ta".to_string(), vec![20.0, MISSING, 22.0])])
//!     .unwrap();
//! assert_eq!(ds.series("Ta").unwrap().flag()[1], FlagCode::Missing);
//!
//! let ta = ds.get("Ta").unwrap();
//! let tk: Vec<f64> = ta.values.iter().map(|t| t + 273.15).collect();
//! ds.create(NewSeries::new("TaK", tk).with_inputs(&["Ta"]).merge_input_flags())
//!     .unwrap();
//! assert_eq!(ds.series("TaK").unwrap().data()[1], MISSING);
//! ```

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::data::{MISSING, Series, SeriesAttributes, is_missing};
use crate::types::{FlagCode, ProcessingLevel};

/// Errors raised by structural dataset problems.
#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    /// Series length does not match the dataset length.
    #[error("Series '{name}' has length {found}, dataset has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// No timestamps.
    #[error("Dataset time axis is empty")]
    EmptyTimeAxis,

    /// Timestamps decrease or repeat.
    #[error("Non-monotonic or duplicate timestamp at index {index}")]
    NonMonotonicTime { index: usize },

    /// Timestamps are not spaced by the sample interval.
    #[error("Irregular interval at index {index}: expected {expected} min, found {found} min")]
    IrregularInterval {
        index: usize,
        expected: i64,
        found: i64,
    },

    /// Sample interval must divide a day.
    #[error("Invalid sample interval of {minutes} minutes")]
    InvalidInterval { minutes: u32 },

    /// A series required by the caller does not exist.
    #[error("Unknown series '{name}'")]
    UnknownSeries { name: String },
}

/// Dataset-level metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalAttributes {
    /// Processing level.
    pub level: ProcessingLevel,
    /// Sample interval in minutes.
    pub time_step: u32,
    /// Site name.
    pub site: String,
    /// Transforms applied, in order.
    pub functions: Vec<String>,
}

impl Default for GlobalAttributes {
    fn default() -> Self {
        Self {
            level: ProcessingLevel::L1,
            time_step: 30,
            site: String::new(),
            functions: Vec::new(),
        }
    }
}

/// Masked view of a series.
///
/// `values` has `NaN` wherever the sample is missing or flagged bad.
#[derive(Clone, Debug)]
pub struct SeriesView<'a> {
    /// Values with missing samples as `NaN`.
    pub values: Vec<f64>,
    /// Flags of the underlying series.
    pub flag: &'a [FlagCode],
}

impl SeriesView<'_> {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True if sample `i` is usable.
    #[inline]
    pub fn is_valid(&self, i: usize) -> bool {
        self.values[i].is_finite()
    }
}

/// Request to create (or replace) a derived series.
#[derive(Clone, Debug)]
pub struct NewSeries {
    name: String,
    data: Vec<f64>,
    flag: Option<Vec<FlagCode>>,
    inputs: Vec<String>,
    merge_inputs: bool,
    mask_code: FlagCode,
    attributes: SeriesAttributes,
}

impl NewSeries {
    /// New series with flags derived from the validity of `data`.
    pub fn new(name: impl Into<String>, data: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data,
            flag: None,
            inputs: Vec::new(),
            merge_inputs: false,
            mask_code: FlagCode::Missing,
            attributes: SeriesAttributes::default(),
        }
    }

    /// Use explicit flags instead of the validity mask.
    pub fn with_flags(mut self, flag: Vec<FlagCode>) -> Self {
        self.flag = Some(flag);
        self
    }

    /// Record the input series names.
    pub fn with_inputs(mut self, inputs: &[&str]) -> Self {
        self.inputs = inputs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Merge the flags of the recorded inputs (first rejection wins).
    pub fn merge_input_flags(mut self) -> Self {
        self.merge_inputs = true;
        self
    }

    /// Code assigned where the base flag is good but the data is invalid.
    pub fn with_mask_code(mut self, code: FlagCode) -> Self {
        self.mask_code = code;
        self
    }

    /// Set physical units.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.attributes.units = units.into();
        self
    }

    /// Set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.attributes.description = description.into();
        self
    }

    /// Set standard name.
    pub fn with_standard_name(mut self, standard_name: impl Into<String>) -> Self {
        self.attributes.standard_name = standard_name.into();
        self
    }
}

/// A processing-level dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    attributes: GlobalAttributes,
    timestamps: Vec<NaiveDateTime>,
    series: BTreeMap<String, Series>,
}

impl Dataset {
    /// Create an empty dataset on a validated time axis.
    ///
    /// # Errors
    /// - `EmptyTimeAxis` if no timestamps are given
    /// - `InvalidInterval` if `time_step` is zero or does not divide a day
    /// - `NonMonotonicTime` / `IrregularInterval` for a malformed axis
    pub fn new(timestamps: Vec<NaiveDateTime>, time_step: u32) -> Result<Self, DatasetError> {
        if timestamps.is_empty() {
            return Err(DatasetError::EmptyTimeAxis);
        }
        if time_step == 0 || 1440 % time_step != 0 {
            return Err(DatasetError::InvalidInterval { minutes: time_step });
        }

        let expected = i64::from(time_step);
        for i in 1..timestamps.len() {
            let found = (timestamps[i] - timestamps[i - 1]).num_minutes();
            if found <= 0 {
                return Err(DatasetError::NonMonotonicTime { index: i });
            }
            if found != expected {
                return Err(DatasetError::IrregularInterval {
                    index: i,
                    expected,
                    found,
                });
            }
        }

        Ok(Self {
            attributes: GlobalAttributes {
                time_step,
                ..Default::default()
            },
            timestamps,
            series: BTreeMap::new(),
        })
    }

    /// Build an L1 dataset from raw columns.
    ///
    /// Samples equal to the sentinel or non-finite are flagged
    /// [`FlagCode::Missing`].
    pub fn from_columns<I>(
        timestamps: Vec<NaiveDateTime>,
        time_step: u32,
        columns: I,
    ) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = (String, Vec<f64>)>,
    {
        let mut ds = Self::new(timestamps, time_step)?;
        for (name, data) in columns {
            ds.insert(Series::new(name, data))?;
        }
        Ok(ds)
    }

    /// Set the site name.
    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.attributes.site = site.into();
        self
    }

    // =========================================================================
    // Global attributes and time axis
    // =========================================================================

    /// Number of records.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Global attributes.
    pub fn attributes(&self) -> &GlobalAttributes {
        &self.attributes
    }

    /// Processing level.
    pub fn level(&self) -> ProcessingLevel {
        self.attributes.level
    }

    /// Sample interval in minutes.
    pub fn time_step(&self) -> u32 {
        self.attributes.time_step
    }

    /// Timestamps.
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// First timestamp.
    pub fn start(&self) -> NaiveDateTime {
        self.timestamps[0]
    }

    /// Last timestamp.
    pub fn end(&self) -> NaiveDateTime {
        self.timestamps[self.timestamps.len() - 1]
    }

    /// Number of time-of-day bins.
    pub fn bins_per_day(&self) -> usize {
        (1440 / self.attributes.time_step) as usize
    }

    /// Calendar month (1-12) of record `i`.
    #[inline]
    pub fn month(&self, i: usize) -> u32 {
        self.timestamps[i].month()
    }

    /// Calendar date of record `i`.
    #[inline]
    pub fn date(&self, i: usize) -> NaiveDate {
        self.timestamps[i].date()
    }

    /// Decimal hour of day of record `i`.
    #[inline]
    pub fn decimal_hour(&self, i: usize) -> f64 {
        let t = self.timestamps[i];
        f64::from(t.hour()) + f64::from(t.minute()) / 60.0 + f64::from(t.second()) / 3600.0
    }

    /// Time-of-day bin of record `i`, in `0..bins_per_day()`.
    #[inline]
    pub fn time_of_day_bin(&self, i: usize) -> usize {
        let t = self.timestamps[i];
        let minutes = t.hour() * 60 + t.minute();
        (minutes / self.attributes.time_step) as usize
    }

    /// Index of an exact timestamp.
    pub fn index_of(&self, t: NaiveDateTime) -> Option<usize> {
        self.timestamps.binary_search(&t).ok()
    }

    /// Sample interval in seconds.
    pub fn time_step_seconds(&self) -> f64 {
        f64::from(self.attributes.time_step) * 60.0
    }

    // =========================================================================
    // Series access
    // =========================================================================

    /// True if a series exists.
    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    /// Series names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|s| s.as_str())
    }

    /// Iterate over all series.
    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.values()
    }

    /// Borrow a series.
    pub fn series(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }

    /// Mutably borrow a series for in-place transforms.
    pub fn series_mut(&mut self, name: &str) -> Option<&mut Series> {
        self.series.get_mut(name)
    }

    /// Borrow a series or fail with `UnknownSeries`.
    pub fn require(&self, name: &str) -> Result<&Series, DatasetError> {
        self.series
            .get(name)
            .ok_or_else(|| DatasetError::UnknownSeries { name: name.to_string() })
    }

    /// Masked view of a series, or `None` if it does not exist.
    pub fn get(&self, name: &str) -> Option<SeriesView<'_>> {
        self.series.get(name).map(|s| SeriesView {
            values: s.masked(),
            flag: s.flag(),
        })
    }

    /// Insert a series, replacing any existing one of the same name.
    pub fn insert(&mut self, series: Series) -> Result<(), DatasetError> {
        if series.len() != self.len() {
            return Err(DatasetError::LengthMismatch {
                name: series.name().to_string(),
                expected: self.len(),
                found: series.len(),
            });
        }
        self.series.insert(series.name().to_string(), series);
        Ok(())
    }

    /// Insert a copy of a series under a new name.
    pub fn insert_as(&mut self, name: &str, series: &Series) -> Result<(), DatasetError> {
        let mut copy = series.clone();
        copy.rename(name);
        self.insert(copy)
    }

    /// Remove a series.
    pub fn remove(&mut self, name: &str) -> Option<Series> {
        self.series.remove(name)
    }

    /// Create or replace a derived series.
    ///
    /// The base flag is, in order of preference, the explicit flag, the
    /// merged input flags, or [`FlagCode::Good`]. Samples with a bad base
    /// flag are written as the sentinel; samples with a good base flag but
    /// invalid data get the request's mask code.
    ///
    /// Returns the number of samples masked by this creation (good base
    /// flag, invalid data).
    ///
    /// # Errors
    /// `LengthMismatch` if data or flags do not match the dataset length.
    pub fn create(&mut self, request: NewSeries) -> Result<usize, DatasetError> {
        let n = self.len();
        if request.data.len() != n {
            return Err(DatasetError::LengthMismatch {
                name: request.name,
                expected: n,
                found: request.data.len(),
            });
        }

        let base: Vec<FlagCode> = match request.flag {
            Some(flag) => {
                if flag.len() != n {
                    return Err(DatasetError::LengthMismatch {
                        name: request.name,
                        expected: n,
                        found: flag.len(),
                    });
                }
                flag
            }
            None if request.merge_inputs => self.merged_flags(&request.inputs),
            None => vec![FlagCode::Good; n],
        };

        let mut data = request.data;
        let mut flag = base;
        let mut n_masked = 0;
        for i in 0..n {
            if flag[i].is_bad() {
                data[i] = MISSING;
            } else if is_missing(data[i]) {
                data[i] = MISSING;
                flag[i] = request.mask_code;
                n_masked += 1;
            }
        }

        let mut attributes = request.attributes;
        attributes.inputs = request.inputs;

        if n_masked > 0 {
            debug!(series = %request.name, masked = n_masked, code = %request.mask_code, "masked samples");
        }

        let series = Series::from_checked(request.name, data, flag).with_attributes(attributes);
        self.series.insert(series.name().to_string(), series);
        Ok(n_masked)
    }

    /// Merge the flags of the named inputs; absent inputs are ignored.
    pub fn merged_flags(&self, inputs: &[String]) -> Vec<FlagCode> {
        let mut merged: Option<Vec<FlagCode>> = None;
        for name in inputs {
            let Some(s) = self.series.get(name) else {
                continue;
            };
            match merged.as_mut() {
                None => merged = Some(s.flag().to_vec()),
                Some(m) => {
                    for (acc, &f) in m.iter_mut().zip(s.flag()) {
                        *acc = acc.merge(f);
                    }
                }
            }
        }
        merged.unwrap_or_else(|| vec![FlagCode::Good; self.len()])
    }

    // =========================================================================
    // Level transitions and audit
    // =========================================================================

    /// Copy this dataset into a new processing level.
    ///
    /// `self` is left untouched, so earlier levels remain available for
    /// audit.
    pub fn to_level(&self, level: ProcessingLevel) -> Dataset {
        let mut next = self.clone();
        next.attributes.level = level;
        next
    }

    /// Append a transform name to the audit trail.
    pub fn record_function(&mut self, name: impl Into<String>) {
        self.attributes.functions.push(name.into());
    }

    /// Check the sentinel/flag pairing of every series.
    ///
    /// Returns the names of series violating the invariant.
    pub fn invariant_violations(&self) -> Vec<String> {
        self.series
            .values()
            .filter(|s| {
                s.len() != self.len()
                    || s.data()
                        .iter()
                        .zip(s.flag())
                        .any(|(&v, f)| is_missing(v) && f.is_good())
            })
            .map(|s| s.name().to_string())
            .collect()
    }
}
