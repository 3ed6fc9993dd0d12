//! Monthly range check.

use crate::config::RangeCheck;
use crate::series::{Dataset, DatasetError};
use crate::types::FlagCode;

/// Mask good samples of `name` outside their month's bounds.
///
/// Returns the number of samples rejected.
pub fn range_check(
    ds: &mut Dataset,
    name: &str,
    check: &RangeCheck,
    code: FlagCode,
) -> Result<usize, DatasetError> {
    let months: Vec<u32> = (0..ds.len()).map(|i| ds.month(i)).collect();
    let series = ds
        .series_mut(name)
        .ok_or_else(|| DatasetError::UnknownSeries {
            name: name.to_string(),
        })?;

    let mut rejected = 0;
    for (i, &month) in months.iter().enumerate() {
        let Some(v) = series.value(i) else {
            continue;
        };
        let lower = check.lower.for_month(month);
        let upper = check.upper.for_month(month);
        if (v < lower || v > upper) && series.mask(i, code) {
            rejected += 1;
        }
    }
    Ok(rejected)
}
