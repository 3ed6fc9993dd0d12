//! Time-of-day × month lookup tables.
//!
//! Climatologies and ratio surfaces are tables with one row per time-of-day
//! bin and one column per calendar month. A table with fewer bins than the
//! dataset (hourly climatology, half-hourly data) is indexed by scaling the
//! dataset's bin.

use chrono::{Datelike, NaiveDate};

use crate::series::Dataset;

/// `bins × 12` table of monthly values.
#[derive(Clone, Debug, PartialEq)]
pub struct MonthlyTable {
    rows: Vec<[f64; 12]>,
}

/// Day-of-year (0-based, fractional) of the middle of each month.
fn month_midpoints(year: i32) -> ([f64; 12], f64) {
    let leap = NaiveDate::from_ymd_opt(year, 2, 29).is_some();
    let days = [
        31.0,
        if leap { 29.0 } else { 28.0 },
        31.0,
        30.0,
        31.0,
        30.0,
        31.0,
        31.0,
        30.0,
        31.0,
        30.0,
        31.0,
    ];
    let mut mids = [0.0; 12];
    let mut start = 0.0;
    for (mid, len) in mids.iter_mut().zip(days) {
        *mid = start + len / 2.0;
        start += len;
    }
    (mids, start)
}

impl MonthlyTable {
    /// Table from its rows; `None` if there are none.
    pub fn new(rows: Vec<[f64; 12]>) -> Option<Self> {
        if rows.is_empty() {
            None
        } else {
            Some(Self { rows })
        }
    }

    /// Same value everywhere.
    pub fn constant(bins: usize, value: f64) -> Option<Self> {
        Self::new(vec![[value; 12]; bins])
    }

    /// Number of time-of-day bins.
    pub fn bins(&self) -> usize {
        self.rows.len()
    }

    /// Value at `bin` and `month` (1-12).
    pub fn value(&self, bin: usize, month: u32) -> f64 {
        let row = &self.rows[bin.min(self.rows.len() - 1)];
        row[(month.clamp(1, 12) - 1) as usize]
    }

    /// Table bin of record `i` of `ds`.
    pub fn bin_of(&self, ds: &Dataset, i: usize) -> usize {
        ds.time_of_day_bin(i) * self.bins() / ds.bins_per_day()
    }

    /// Value for record `i`, by its month.
    pub fn lookup(&self, ds: &Dataset, i: usize) -> f64 {
        self.value(self.bin_of(ds, i), ds.month(i))
    }

    /// Value for record `i`, interpolated linearly along day-of-year between
    /// month midpoints, wrapping from December to January.
    ///
    /// This is a simplification of a 2-D spline over the whole surface:
    /// only the seasonal axis is smoothed. Time of day is taken from the
    /// record's own bin, so the value steps at bin edges instead of
    /// blending neighbouring bins.
    pub fn interpolate(&self, ds: &Dataset, i: usize) -> f64 {
        let t = ds.timestamps()[i];
        let bin = self.bin_of(ds, i);
        let (mids, year_len) = month_midpoints(t.year());
        let doy = f64::from(t.ordinal0()) + ds.decimal_hour(i) / 24.0;

        // Bracketing months as 0-based indices with their midpoints
        let (m0, x0, m1, x1) = if doy < mids[0] {
            (11, mids[11] - year_len, 0, mids[0])
        } else if doy >= mids[11] {
            (11, mids[11], 0, mids[0] + year_len)
        } else {
            let k = mids.iter().rposition(|&m| m <= doy).unwrap_or(0);
            (k, mids[k], k + 1, mids[k + 1])
        };

        let v0 = self.value(bin, m0 as u32 + 1);
        let v1 = self.value(bin, m1 as u32 + 1);
        let w = (doy - x0) / (x1 - x0);
        v0 + w * (v1 - v0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDateTime};

    fn ramp() -> MonthlyTable {
        let row: [f64; 12] = std::array::from_fn(|m| (m + 1) as f64);
        MonthlyTable::new(vec![row; 24]).unwrap()
    }

    fn dataset_at(t: NaiveDateTime) -> Dataset {
        Dataset::new(vec![t, t + Duration::minutes(30)], 30).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(MonthlyTable::new(Vec::new()).is_none());
    }

    #[test]
    fn test_hourly_table_on_half_hourly_data() {
        let rows: Vec<[f64; 12]> = (0..24).map(|b| [b as f64; 12]).collect();
        let table = MonthlyTable::new(rows).unwrap();
        let ds = dataset_at(at(2024, 3, 1, 13));
        assert_eq!(table.bin_of(&ds, 0), 13);
        assert_eq!(table.bin_of(&ds, 1), 13);
        assert_relative_eq!(table.lookup(&ds, 0), 13.0);
    }

    #[test]
    fn test_interpolation_hits_month_midpoint() {
        let table = ramp();
        // 2023-03-16 12:00 is the middle of March (day 74.5)
        let ds = dataset_at(at(2023, 3, 16, 12));
        assert_relative_eq!(table.interpolate(&ds, 0), 3.0, epsilon = 1e-9);
        // Halfway between mid-March and mid-April
        let ds = dataset_at(at(2023, 3, 31, 12));
        let v = table.interpolate(&ds, 0);
        assert!(v > 3.0 && v < 4.0);
    }

    #[test]
    fn test_interpolation_keeps_time_of_day_bin() {
        let rows: Vec<[f64; 12]> = (0..24).map(|b| [b as f64; 12]).collect();
        let table = MonthlyTable::new(rows).unwrap();
        // 13:00 and 13:30 share the hourly bin; no blending towards 14:00
        let ds = dataset_at(at(2023, 3, 31, 13));
        assert_relative_eq!(table.interpolate(&ds, 0), 13.0, epsilon = 1e-12);
        assert_relative_eq!(table.interpolate(&ds, 1), 13.0, epsilon = 1e-12);
    }

    #[test]
    fn test_interpolation_wraps_year_end() {
        let table = ramp();
        // New Year: halfway between mid-December (12) and mid-January (1)
        let ds = dataset_at(at(2023, 1, 1, 0));
        assert_relative_eq!(table.interpolate(&ds, 0), 6.5, epsilon = 1e-9);
        let ds = dataset_at(at(2023, 12, 31, 0));
        let v = table.interpolate(&ds, 0);
        assert!(v < 12.0 && v > 6.5);
    }
}
