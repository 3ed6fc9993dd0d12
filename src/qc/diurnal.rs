//! Diurnal outlier check.
//!
//! Samples are grouped by calendar month and time-of-day bin. Within each
//! group, a sample further than `num_sd[month]` standard deviations from the
//! group mean is rejected. Rejections shift the statistics, so the check is
//! repeated until a pass rejects nothing; the result is a fixed point and a
//! second run is a no-op.
//!
//! In a group with a heavy tail this rejects more than a single pass would:
//! once the largest outlier is gone the standard deviation shrinks and the
//! next-largest sample can fall outside the narrower band.

use crate::config::DiurnalCheck;
use crate::series::{Dataset, DatasetError};
use crate::types::FlagCode;

/// Running mean and standard deviation of one month × bin group.
#[derive(Clone, Copy, Debug, Default)]
struct GroupStats {
    count: usize,
    sum: f64,
    sum_sq_dev: f64,
}

impl GroupStats {
    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }

    /// Population standard deviation.
    fn sd(&self) -> f64 {
        (self.sum_sq_dev / self.count as f64).sqrt()
    }
}

/// Mask diurnal outliers of `name` in place.
///
/// Returns the number of samples rejected over all iterations.
pub fn diurnal_check(
    ds: &mut Dataset,
    name: &str,
    check: &DiurnalCheck,
    code: FlagCode,
) -> Result<usize, DatasetError> {
    let bins = ds.bins_per_day();
    let months: Vec<u32> = (0..ds.len()).map(|i| ds.month(i)).collect();
    let groups: Vec<usize> = (0..ds.len())
        .map(|i| (months[i] as usize - 1) * bins + ds.time_of_day_bin(i))
        .collect();
    let series = ds
        .series_mut(name)
        .ok_or_else(|| DatasetError::UnknownSeries {
            name: name.to_string(),
        })?;

    let mut total = 0;
    loop {
        let mut stats = vec![GroupStats::default(); 12 * bins];
        for (i, &g) in groups.iter().enumerate() {
            if let Some(v) = series.value(i) {
                stats[g].count += 1;
                stats[g].sum += v;
            }
        }
        for (i, &g) in groups.iter().enumerate() {
            if let Some(v) = series.value(i) {
                let d = v - stats[g].mean();
                stats[g].sum_sq_dev += d * d;
            }
        }

        let mut rejected = 0;
        for (i, &g) in groups.iter().enumerate() {
            let Some(v) = series.value(i) else {
                continue;
            };
            let limit = check.num_sd.for_month(months[i]) * stats[g].sd();
            if (v - stats[g].mean()).abs() > limit && series.mask(i, code) {
                rejected += 1;
            }
        }

        total += rejected;
        if rejected == 0 {
            break;
        }
    }
    Ok(total)
}
