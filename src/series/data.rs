//! A single named variable: data, flags and attributes.

use serde::{Deserialize, Serialize};

use crate::types::FlagCode;

/// Missing-data sentinel stored in the data array.
pub const MISSING: f64 = -9999.0;

/// Tolerance used when comparing against the sentinel.
const MISSING_TOL: f64 = 1e-6;

/// True when a stored value is the sentinel or not a finite number.
#[inline]
pub fn is_missing(value: f64) -> bool {
    !value.is_finite() || (value - MISSING).abs() < MISSING_TOL
}

/// Descriptive metadata carried by every series.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesAttributes {
    /// Physical units, e.g. "W/m2".
    pub units: String,
    /// Long description.
    pub description: String,
    /// CF-style standard name, if any.
    pub standard_name: String,
    /// Names of the series this one was derived from.
    pub inputs: Vec<String>,
    /// Free-form provenance notes appended by in-place transforms.
    pub notes: Vec<String>,
}

impl SeriesAttributes {
    /// Attributes with units and description set.
    pub fn new(units: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            units: units.into(),
            description: description.into(),
            ..Default::default()
        }
    }
}

/// A time-aligned variable.
///
/// `data` and `flag` always have the same length. A slot whose flag is bad
/// holds [`MISSING`]; every mutator keeps that pairing intact.
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    name: String,
    data: Vec<f64>,
    flag: Vec<FlagCode>,
    /// Descriptive metadata.
    pub attributes: SeriesAttributes,
}

impl Series {
    /// Create a series whose flags follow the validity of `data`.
    ///
    /// Non-finite values and the sentinel become [`MISSING`] with
    /// [`FlagCode::Missing`]; everything else is [`FlagCode::Good`].
    pub fn new(name: impl Into<String>, data: Vec<f64>) -> Self {
        let mut data = data;
        let flag = data
            .iter_mut()
            .map(|v| {
                if is_missing(*v) {
                    *v = MISSING;
                    FlagCode::Missing
                } else {
                    FlagCode::Good
                }
            })
            .collect();
        Self {
            name: name.into(),
            data,
            flag,
            attributes: SeriesAttributes::default(),
        }
    }

    /// Create a series from explicit data and flags.
    ///
    /// Returns `None` if the lengths differ. Bad flags force the sentinel
    /// into the data slot, and invalid data under a good flag is flagged
    /// [`FlagCode::Missing`].
    pub fn from_parts(name: impl Into<String>, data: Vec<f64>, flag: Vec<FlagCode>) -> Option<Self> {
        if data.len() != flag.len() {
            return None;
        }
        let mut series = Self {
            name: name.into(),
            data,
            flag,
            attributes: SeriesAttributes::default(),
        };
        for i in 0..series.data.len() {
            if series.flag[i].is_bad() {
                series.data[i] = MISSING;
            } else if is_missing(series.data[i]) {
                series.data[i] = MISSING;
                series.flag[i] = FlagCode::Missing;
            }
        }
        Some(series)
    }

    /// Assemble a series whose pairing has already been enforced.
    pub(crate) fn from_checked(name: impl Into<String>, data: Vec<f64>, flag: Vec<FlagCode>) -> Self {
        debug_assert_eq!(data.len(), flag.len());
        Self {
            name: name.into(),
            data,
            flag,
            attributes: SeriesAttributes::default(),
        }
    }

    /// Set attributes (builder style).
    pub fn with_attributes(mut self, attributes: SeriesAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the series has no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw data, including sentinels.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Per-sample flags.
    pub fn flag(&self) -> &[FlagCode] {
        &self.flag
    }

    /// Value at `i`, or `None` if the slot is missing or flagged bad.
    #[inline]
    pub fn value(&self, i: usize) -> Option<f64> {
        let v = self.data[i];
        if self.flag[i].is_good() && !is_missing(v) {
            Some(v)
        } else {
            None
        }
    }

    /// True if sample `i` holds a usable value.
    #[inline]
    pub fn is_valid(&self, i: usize) -> bool {
        self.value(i).is_some()
    }

    /// Number of usable samples.
    pub fn count_valid(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_valid(i)).count()
    }

    /// Number of missing samples.
    pub fn count_missing(&self) -> usize {
        self.len() - self.count_valid()
    }

    /// Data with missing samples replaced by `NaN`.
    ///
    /// Arithmetic on the returned vector propagates the mask.
    pub fn masked(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.value(i).unwrap_or(f64::NAN))
            .collect()
    }

    /// Reject sample `i` with `code`, unless it is already bad.
    ///
    /// Returns `true` if the sample changed.
    pub fn mask(&mut self, i: usize, code: FlagCode) -> bool {
        debug_assert!(code.is_bad(), "mask code must be bad, got {}", code);
        if self.flag[i].is_bad() {
            return false;
        }
        self.data[i] = MISSING;
        self.flag[i] = code;
        true
    }

    /// Replace a good sample with a recomputed value.
    ///
    /// Bad samples are left untouched. An invalid `value` masks the sample
    /// with `mask_code` instead. Returns `true` if the sample was written.
    pub fn update(&mut self, i: usize, value: f64, code: FlagCode, mask_code: FlagCode) -> bool {
        if self.flag[i].is_bad() {
            return false;
        }
        if is_missing(value) {
            self.data[i] = MISSING;
            self.flag[i] = mask_code;
        } else {
            self.data[i] = value;
            self.flag[i] = code;
        }
        true
    }

    /// Fill a missing sample.
    ///
    /// Only slots that are currently bad are written, and only with a valid
    /// `value`, so filling is re-entrant. Returns `true` if the slot was
    /// filled.
    pub fn fill(&mut self, i: usize, value: f64, code: FlagCode) -> bool {
        debug_assert!(code.is_good(), "fill code must be good, got {}", code);
        if self.is_valid(i) || is_missing(value) {
            return false;
        }
        self.data[i] = value;
        self.flag[i] = code;
        true
    }

    /// Record a provenance note.
    pub fn add_note(&mut self, note: impl Into<String>) {
        self.attributes.notes.push(note.into());
    }
}
