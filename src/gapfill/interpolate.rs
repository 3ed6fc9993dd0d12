//! Linear interpolation across short interior gaps.

use crate::series::{Dataset, DatasetError};
use crate::types::FlagCode;

/// Fill interior gaps of at most `max_gap` samples by linear interpolation
/// between the bracketing valid samples.
///
/// Longer gaps, and gaps touching either end of the record, are left
/// missing. Returns the number of samples filled.
pub fn interpolate_gaps(ds: &mut Dataset, name: &str, max_gap: usize) -> Result<usize, DatasetError> {
    let series = ds
        .series_mut(name)
        .ok_or_else(|| DatasetError::UnknownSeries {
            name: name.to_string(),
        })?;
    if max_gap == 0 {
        return Ok(0);
    }

    let n = series.len();
    let mut filled = 0;
    let mut left: Option<(usize, f64)> = None;
    let mut i = 0;
    while i < n {
        if let Some(v) = series.value(i) {
            left = Some((i, v));
            i += 1;
            continue;
        }
        // Start of a gap: find its end
        let start = i;
        while i < n && !series.is_valid(i) {
            i += 1;
        }
        let len = i - start;
        if let (Some((i0, v0)), true, true) = (left, i < n, len <= max_gap) {
            let Some(v1) = series.value(i) else {
                continue;
            };
            let span = (i - i0) as f64;
            for k in start..i {
                let w = (k - i0) as f64 / span;
                if series.fill(k, v0 + w * (v1 - v0), FlagCode::Interpolated) {
                    filled += 1;
                }
            }
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MISSING;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn dataset(values: Vec<f64>) -> Dataset {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let times = (0..values.len())
            .map(|i| t0 + Duration::minutes(30 * i as i64))
            .collect();
        Dataset::from_columns(times, 30, [("Ta".to_string(), values)]).unwrap()
    }

    #[test]
    fn test_short_gap_filled() {
        let mut ds = dataset(vec![10.0, MISSING, MISSING, 13.0]);
        assert_eq!(interpolate_gaps(&mut ds, "Ta", 2).unwrap(), 2);
        let ta = ds.series("Ta").unwrap();
        assert_relative_eq!(ta.data()[1], 11.0, epsilon = 1e-12);
        assert_relative_eq!(ta.data()[2], 12.0, epsilon = 1e-12);
        assert_eq!(ta.flag()[1], FlagCode::Interpolated);
    }

    #[test]
    fn test_long_and_edge_gaps_left() {
        let mut ds = dataset(vec![MISSING, 10.0, MISSING, MISSING, MISSING, 14.0, 15.0, MISSING, 16.0, MISSING]);
        assert_eq!(interpolate_gaps(&mut ds, "Ta", 2).unwrap(), 1);
        let ta = ds.series("Ta").unwrap();
        assert!(!ta.is_valid(0));
        assert!(!ta.is_valid(3));
        assert_relative_eq!(ta.data()[7], 15.5, epsilon = 1e-12);
        assert!(!ta.is_valid(9));
    }

    #[test]
    fn test_rerun_is_noop() {
        let mut ds = dataset(vec![1.0, MISSING, 3.0]);
        interpolate_gaps(&mut ds, "Ta", 1).unwrap();
        assert_eq!(interpolate_gaps(&mut ds, "Ta", 1).unwrap(), 0);
    }
}
