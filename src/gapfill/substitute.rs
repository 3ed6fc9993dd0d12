//! Direct substitution stages: external flux set, alternate site and
//! climatology.
//!
//! Every stage writes only slots that are still missing, so running a stage
//! twice is a no-op.

use tracing::{debug, warn};

use crate::config::AlternateSource;
use crate::series::{Dataset, DatasetError, Series};
use crate::types::FlagCode;

use super::MonthlyTable;

fn target_mut<'a>(ds: &'a mut Dataset, target: &str) -> Result<&'a mut Series, DatasetError> {
    ds.series_mut(target)
        .ok_or_else(|| DatasetError::UnknownSeries {
            name: target.to_string(),
        })
}

/// Fill missing slots of `target` from `series` in another dataset, matched
/// by timestamp, after passing each value through `adjust`.
fn fill_by_timestamp(
    ds: &mut Dataset,
    target: &str,
    source: &Dataset,
    series: &str,
    code: FlagCode,
    adjust: impl Fn(chrono::NaiveDateTime, f64) -> f64,
) -> Result<usize, DatasetError> {
    let Some(other) = source.series(series) else {
        warn!(target, source_series = series, "source series not found, stage skipped");
        return Ok(0);
    };
    let candidates: Vec<Option<f64>> = ds
        .timestamps()
        .iter()
        .map(|&t| {
            source
                .index_of(t)
                .and_then(|j| other.value(j))
                .map(|v| adjust(t, v))
        })
        .collect();

    let s = target_mut(ds, target)?;
    let filled = candidates
        .into_iter()
        .enumerate()
        .filter(|&(i, v)| v.is_some_and(|v| s.fill(i, v, code)))
        .count();
    Ok(filled)
}

/// Fill `target` from an externally gap-filled dataset.
pub fn fill_from_external(
    ds: &mut Dataset,
    target: &str,
    external: &Dataset,
    series: &str,
) -> Result<usize, DatasetError> {
    let filled = fill_by_timestamp(ds, target, external, series, FlagCode::ExternalGapFill, |_, v| v)?;
    debug!(target, filled, "external gap fill");
    Ok(filled)
}

/// Fill `target` from an alternate site, applying the source's
/// bias-correction polynomials.
///
/// Every window containing the timestamp is applied in turn, so
/// overlapping windows compose. Outside every window the value is used
/// as-is.
pub fn fill_from_alternate(
    ds: &mut Dataset,
    target: &str,
    alternate: &Dataset,
    source: &AlternateSource,
) -> Result<usize, DatasetError> {
    let series = source.series.as_deref().unwrap_or(target);
    let filled = fill_by_timestamp(ds, target, alternate, series, FlagCode::AlternateSite, |t, v| {
        source
            .transforms
            .iter()
            .filter(|w| t >= w.start && t <= w.end)
            .fold(v, |x, w| w.evaluate(x))
    })?;
    debug!(target, source = %source.source, filled, "alternate site fill");
    Ok(filled)
}

/// Fill `target` from a climatology table.
pub fn fill_from_climatology(ds: &mut Dataset, target: &str, table: &MonthlyTable) -> Result<usize, DatasetError> {
    let values: Vec<f64> = (0..ds.len()).map(|i| table.lookup(ds, i)).collect();
    let s = target_mut(ds, target)?;
    let filled = values
        .into_iter()
        .enumerate()
        .filter(|&(i, v)| s.fill(i, v, FlagCode::Climatology))
        .count();
    debug!(target, filled, "climatology fill");
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolynomialWindow;
    use crate::series::MISSING;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn dataset(start: NaiveDateTime, name: &str, values: Vec<f64>) -> Dataset {
        let times = (0..values.len())
            .map(|i| start + Duration::minutes(30 * i as i64))
            .collect();
        Dataset::from_columns(times, 30, [(name.to_string(), values)]).unwrap()
    }

    #[test]
    fn test_alternate_matches_by_timestamp() {
        let mut ds = dataset(t0(), "Ta", vec![10.0, MISSING, MISSING, 13.0]);
        // Alternate record starts one sample later
        let alt = dataset(t0() + Duration::minutes(30), "Ta", vec![21.0, MISSING, 23.0]);
        let before = alt.clone();

        let n = fill_from_alternate(&mut ds, "Ta", &alt, &AlternateSource::new("alt")).unwrap();
        assert_eq!(n, 1);
        let ta = ds.series("Ta").unwrap();
        assert_relative_eq!(ta.data()[1], 21.0);
        assert_eq!(ta.flag()[1], FlagCode::AlternateSite);
        assert_eq!(ta.flag()[2], FlagCode::Missing);
        // Good samples are not overwritten
        assert_relative_eq!(ta.data()[3], 13.0);
        assert_eq!(alt, before);
    }

    #[test]
    fn test_alternate_polynomial_window() {
        let mut ds = dataset(t0(), "Ta", vec![MISSING, MISSING]);
        let alt = dataset(t0(), "Ta_alt", vec![10.0, 10.0]);
        let source = AlternateSource::new("alt")
            .with_series("Ta_alt")
            .with_transform(PolynomialWindow {
                start: t0(),
                end: t0(),
                coefficients: vec![2.0, 1.0],
            });
        fill_from_alternate(&mut ds, "Ta", &alt, &source).unwrap();
        let ta = ds.series("Ta").unwrap();
        assert_relative_eq!(ta.data()[0], 21.0);
        assert_relative_eq!(ta.data()[1], 10.0);
    }

    #[test]
    fn test_overlapping_polynomial_windows_compose() {
        let mut ds = dataset(t0(), "Ta", vec![MISSING; 4]);
        let alt = dataset(t0(), "Ta", vec![10.0; 4]);
        let step = Duration::minutes(30);
        let source = AlternateSource::new("alt")
            .with_transform(PolynomialWindow {
                start: t0(),
                end: t0() + step,
                coefficients: vec![2.0, 1.0],
            })
            .with_transform(PolynomialWindow {
                start: t0() + step,
                end: t0() + step * 2,
                coefficients: vec![1.0, -5.0],
            });
        assert_eq!(fill_from_alternate(&mut ds, "Ta", &alt, &source).unwrap(), 4);

        let ta = ds.series("Ta").unwrap();
        assert_relative_eq!(ta.data()[0], 21.0);
        // Both windows, in order: 2*10 + 1 - 5
        assert_relative_eq!(ta.data()[1], 16.0);
        assert_relative_eq!(ta.data()[2], 5.0);
        assert_relative_eq!(ta.data()[3], 10.0);
    }

    #[test]
    fn test_climatology_is_reentrant() {
        let mut ds = dataset(t0(), "Fsd", vec![MISSING, 200.0]);
        let table = MonthlyTable::constant(48, 150.0).unwrap();
        assert_eq!(fill_from_climatology(&mut ds, "Fsd", &table).unwrap(), 1);
        assert_eq!(fill_from_climatology(&mut ds, "Fsd", &table).unwrap(), 0);
        let fsd = ds.series("Fsd").unwrap();
        assert_eq!(fsd.flag()[0], FlagCode::Climatology);
        assert_relative_eq!(fsd.data()[1], 200.0);
    }

    #[test]
    fn test_external_fill() {
        let mut ds = dataset(t0(), "Fe", vec![MISSING, 80.0]);
        let ext = dataset(t0(), "Fe_solo", vec![95.0, 70.0]);
        assert_eq!(fill_from_external(&mut ds, "Fe", &ext, "Fe_solo").unwrap(), 1);
        assert_eq!(ds.series("Fe").unwrap().flag()[0], FlagCode::ExternalGapFill);
        // Unknown source series is a skip, not an error
        assert_eq!(fill_from_external(&mut ds, "Fe", &ext, "nope").unwrap(), 0);
    }
}
