//! Daily statistics from half-hourly series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::config::{DailyConfig, DailyStatistic};
use crate::series::{Dataset, MISSING, Series};

/// One value per calendar day for each configured output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DailySummary {
    /// Calendar days covered by the dataset.
    pub dates: Vec<NaiveDate>,
    /// Output name → daily values, [`MISSING`] where a day had too few
    /// good samples.
    pub series: BTreeMap<String, Vec<f64>>,
    /// Output name → good samples per day.
    pub counts: BTreeMap<String, Vec<usize>>,
}

/// Half-open record ranges of each calendar day.
fn day_ranges(ds: &Dataset) -> Vec<(NaiveDate, usize, usize)> {
    let mut ranges: Vec<(NaiveDate, usize, usize)> = Vec::new();
    for i in 0..ds.len() {
        let date = ds.date(i);
        match ranges.last_mut() {
            Some((d, _, end)) if *d == date => *end = i + 1,
            _ => ranges.push((date, i, i + 1)),
        }
    }
    ranges
}

fn reduce(values: &[f64], statistic: DailyStatistic) -> f64 {
    match statistic {
        DailyStatistic::Sum => values.iter().sum(),
        DailyStatistic::Mean => values.iter().sum::<f64>() / values.len() as f64,
        DailyStatistic::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        DailyStatistic::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

impl DailySummary {
    /// Aggregate `ds` into daily values.
    ///
    /// A day's value is [`MISSING`] unless at least
    /// `min_valid_fraction · bins_per_day` of its samples are good. Series
    /// absent from `ds` are skipped with a warning.
    pub fn from_dataset(ds: &Dataset, config: &DailyConfig) -> Self {
        let ranges = day_ranges(ds);
        let required = (config.min_valid_fraction.clamp(0.0, 1.0) * ds.bins_per_day() as f64).ceil() as usize;
        let required = required.max(1);

        let mut summary = DailySummary {
            dates: ranges.iter().map(|&(d, _, _)| d).collect(),
            ..Default::default()
        };

        for output in &config.series {
            let Some(series) = ds.series(&output.series) else {
                warn!(series = %output.series, "not present, daily statistic skipped");
                continue;
            };
            let (values, counts) = daily_values(series, &ranges, output.statistic, output.scale, required);
            let name = output.output_name();
            debug!(output = %name, days = values.len(), "daily statistic");
            summary.series.insert(name.clone(), values);
            summary.counts.insert(name, counts);
        }
        summary
    }

    /// Number of days.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Daily values of one output.
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(Vec::as_slice)
    }
}

fn daily_values(
    series: &Series,
    ranges: &[(NaiveDate, usize, usize)],
    statistic: DailyStatistic,
    scale: f64,
    required: usize,
) -> (Vec<f64>, Vec<usize>) {
    let mut values = Vec::with_capacity(ranges.len());
    let mut counts = Vec::with_capacity(ranges.len());
    let mut day = Vec::new();
    for &(_, start, end) in ranges {
        day.clear();
        day.extend((start..end).filter_map(|i| series.value(i)).map(|v| v * scale));
        counts.push(day.len());
        values.push(if day.len() >= required {
            reduce(&day, statistic)
        } else {
            MISSING
        });
    }
    (values, counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DailySeriesConfig;
    use approx::assert_relative_eq;
    use chrono::Duration;

    const TOL: f64 = 1e-10;

    /// Two full days of hourly data plus one sample of a third.
    fn dataset(fe: impl Fn(usize) -> f64) -> Dataset {
        let t0 = NaiveDate::from_ymd_opt(2024, 2, 28)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let n = 49;
        let times = (0..n).map(|i| t0 + Duration::minutes(60 * i as i64)).collect();
        Dataset::from_columns(times, 60, [("Fe".to_string(), (0..n).map(fe).collect())]).unwrap()
    }

    #[test]
    fn test_sum_with_scale() {
        let ds = dataset(|_| 100.0);
        let config = DailyConfig {
            min_valid_fraction: 1.0,
            series: vec![DailySeriesConfig::new("Fe", DailyStatistic::Sum).with_scale(3600.0 / 1e6)],
        };
        let summary = DailySummary::from_dataset(&ds, &config);
        assert_eq!(summary.len(), 3);
        let sums = summary.get("Fe_sum").unwrap();
        assert_relative_eq!(sums[0], 24.0 * 0.36, epsilon = TOL);
        // Leap day is a full day too
        assert_eq!(summary.dates[1], NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        // A single sample does not make a day
        assert_eq!(sums[2], MISSING);
        assert_eq!(summary.counts["Fe_sum"], vec![24, 24, 1]);
    }

    #[test]
    fn test_valid_fraction() {
        let ds = dataset(|i| if i < 6 { MISSING } else { i as f64 });
        let config = DailyConfig {
            min_valid_fraction: 0.75,
            series: vec![
                DailySeriesConfig::new("Fe", DailyStatistic::Min),
                DailySeriesConfig::new("Fe", DailyStatistic::Max),
                DailySeriesConfig::new("Fe", DailyStatistic::Mean),
            ],
        };
        let summary = DailySummary::from_dataset(&ds, &config);
        // 18 of 24 valid meets 0.75 exactly
        assert_relative_eq!(summary.get("Fe_min").unwrap()[0], 6.0, epsilon = TOL);
        assert_relative_eq!(summary.get("Fe_max").unwrap()[0], 23.0, epsilon = TOL);
        assert_relative_eq!(summary.get("Fe_mean").unwrap()[0], 14.5, epsilon = TOL);
    }

    #[test]
    fn test_absent_series_skipped() {
        let ds = dataset(|_| 1.0);
        let config = DailyConfig {
            min_valid_fraction: 0.5,
            series: vec![DailySeriesConfig::new("Fc", DailyStatistic::Sum)],
        };
        let summary = DailySummary::from_dataset(&ds, &config);
        assert!(summary.series.is_empty());
        assert_eq!(summary.len(), 3);
    }
}
