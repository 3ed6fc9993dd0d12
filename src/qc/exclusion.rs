//! User-specified exclusion windows.

use chrono::NaiveDateTime;

use crate::config::{DateWindow, HourWindow};
use crate::series::{Dataset, DatasetError};
use crate::types::FlagCode;

fn mask_where(
    ds: &mut Dataset,
    name: &str,
    code: FlagCode,
    excluded: impl Fn(NaiveDateTime) -> bool,
) -> Result<usize, DatasetError> {
    let hits: Vec<usize> = ds
        .timestamps()
        .iter()
        .enumerate()
        .filter(|(_, t)| excluded(**t))
        .map(|(i, _)| i)
        .collect();
    let series = ds
        .series_mut(name)
        .ok_or_else(|| DatasetError::UnknownSeries {
            name: name.to_string(),
        })?;
    Ok(hits.into_iter().filter(|&i| series.mask(i, code)).count())
}

/// Mask samples of `name` inside any of the absolute date windows.
pub fn exclude_dates(ds: &mut Dataset, name: &str, windows: &[DateWindow]) -> Result<usize, DatasetError> {
    if windows.is_empty() {
        return Ok(0);
    }
    mask_where(ds, name, FlagCode::ExcludedDate, |t| {
        windows.iter().any(|w| w.contains(t))
    })
}

/// Mask samples of `name` at the listed times of day within each window.
pub fn exclude_hours(ds: &mut Dataset, name: &str, windows: &[HourWindow]) -> Result<usize, DatasetError> {
    if windows.is_empty() {
        return Ok(0);
    }
    mask_where(ds, name, FlagCode::ExcludedHour, |t| {
        windows
            .iter()
            .any(|w| t >= w.start && t <= w.end && w.times.contains(&t.time()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveTime};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn dataset() -> Dataset {
        let times = (0..96).map(|i| t0() + Duration::minutes(30 * i)).collect();
        Dataset::from_columns(times, 30, [("Fsd".to_string(), vec![100.0; 96])]).unwrap()
    }

    #[test]
    fn test_exclude_dates() {
        let mut ds = dataset();
        let w = DateWindow::new(t0() + Duration::hours(1), t0() + Duration::hours(2));
        assert_eq!(exclude_dates(&mut ds, "Fsd", &[w]).unwrap(), 3);
        let fsd = ds.series("Fsd").unwrap();
        assert!(fsd.is_valid(1));
        assert_eq!(fsd.flag()[2], FlagCode::ExcludedDate);
        assert_eq!(fsd.flag()[4], FlagCode::ExcludedDate);
        assert!(fsd.is_valid(5));
        assert_eq!(exclude_dates(&mut ds, "Fsd", &[w]).unwrap(), 0);
    }

    #[test]
    fn test_exclude_hours() {
        let mut ds = dataset();
        let w = HourWindow {
            start: t0(),
            end: t0() + Duration::hours(23),
            times: vec![NaiveTime::from_hms_opt(12, 30, 0).unwrap()],
        };
        assert_eq!(exclude_hours(&mut ds, "Fsd", &[w]).unwrap(), 1);
        let fsd = ds.series("Fsd").unwrap();
        assert_eq!(fsd.flag()[25], FlagCode::ExcludedHour);
        // Second day lies outside the date window
        assert!(fsd.is_valid(48 + 25));
    }
}
