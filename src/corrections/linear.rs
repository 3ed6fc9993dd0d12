//! Linear and drift corrections of raw series.
//!
//! Applied at L2 after the QC checks, to the good samples inside each
//! correction window. Corrected samples are flagged
//! [`FlagCode::LinearCorrected`].

use chrono::NaiveDateTime;
use tracing::debug;

use crate::config::{LinearCorrection, LinearKind};
use crate::series::{Dataset, DatasetError};
use crate::types::FlagCode;

/// Fraction of the window elapsed at `t`, in `[0, 1]`.
fn window_fraction(start: NaiveDateTime, end: NaiveDateTime, t: NaiveDateTime) -> f64 {
    let span = (end - start).num_seconds();
    if span <= 0 {
        return 0.0;
    }
    (t - start).num_seconds() as f64 / span as f64
}

impl LinearCorrection {
    /// Corrected value of `x` at time `t`, or `None` outside the window.
    pub fn correct(&self, t: NaiveDateTime, x: f64) -> Option<f64> {
        if t < self.start || t > self.end {
            return None;
        }
        Some(match self.kind {
            LinearKind::Linear { slope, offset } => slope * x + offset,
            LinearKind::Drift {
                slope_start,
                offset_start,
                slope_end,
                offset_end,
            } => {
                let f = window_fraction(self.start, self.end, t);
                let slope = slope_start + f * (slope_end - slope_start);
                let offset = offset_start + f * (offset_end - offset_start);
                slope * x + offset
            }
            LinearKind::LocalDrift {
                rate_per_day,
                offset,
            } => {
                let days = (t - self.start).num_seconds() as f64 / 86_400.0;
                x + offset + rate_per_day * days
            }
        })
    }
}

/// Apply `corrections` to the good samples of series `name` in place.
///
/// Windows are applied in order, so overlapping windows compose. Returns the
/// number of samples corrected.
pub fn apply_linear_corrections(
    ds: &mut Dataset,
    name: &str,
    corrections: &[LinearCorrection],
) -> Result<usize, DatasetError> {
    if corrections.is_empty() {
        return Ok(0);
    }
    let times = ds.timestamps().to_vec();
    let series = ds
        .series_mut(name)
        .ok_or_else(|| DatasetError::UnknownSeries {
            name: name.to_string(),
        })?;

    let mut corrected = 0;
    for (i, &t) in times.iter().enumerate() {
        let mut touched = false;
        for c in corrections {
            let Some(x) = series.value(i) else {
                break;
            };
            if let Some(y) = c.correct(t, x) {
                series.update(i, y, FlagCode::LinearCorrected, FlagCode::Missing);
                touched = true;
            }
        }
        if touched {
            corrected += 1;
        }
    }

    if corrected > 0 {
        series.add_note(format!("linear correction applied to {corrected} samples"));
        debug!(series = name, corrected, "linear corrections applied");
    }
    Ok(corrected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MISSING;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    const TOL: f64 = 1e-10;

    fn t(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn dataset(values: Vec<f64>) -> Dataset {
        let n = values.len();
        let times = (0..n).map(|i| t(0) + Duration::minutes(30 * i as i64)).collect();
        Dataset::from_columns(times, 30, [("Ah".to_string(), values)]).unwrap()
    }

    #[test]
    fn test_linear_window() {
        let mut ds = dataset(vec![1.0, 2.0, MISSING, 4.0, 5.0]);
        let c = LinearCorrection {
            start: t(0) + Duration::minutes(30),
            end: t(0) + Duration::minutes(90),
            kind: LinearKind::Linear {
                slope: 2.0,
                offset: 1.0,
            },
        };
        let n = apply_linear_corrections(&mut ds, "Ah", &[c]).unwrap();
        assert_eq!(n, 2);

        let s = ds.series("Ah").unwrap();
        assert_relative_eq!(s.data()[0], 1.0, epsilon = TOL);
        assert_relative_eq!(s.data()[1], 5.0, epsilon = TOL);
        assert_eq!(s.flag()[1], FlagCode::LinearCorrected);
        assert_eq!(s.flag()[2], FlagCode::Missing);
        assert_relative_eq!(s.data()[3], 9.0, epsilon = TOL);
        assert_eq!(s.flag()[4], FlagCode::Good);
    }

    #[test]
    fn test_drift_interpolates_coefficients() {
        let c = LinearCorrection {
            start: t(0),
            end: t(10),
            kind: LinearKind::Drift {
                slope_start: 1.0,
                offset_start: 0.0,
                slope_end: 1.2,
                offset_end: 1.0,
            },
        };
        assert_relative_eq!(c.correct(t(0), 10.0).unwrap(), 10.0, epsilon = TOL);
        assert_relative_eq!(c.correct(t(5), 10.0).unwrap(), 11.0 + 0.5, epsilon = TOL);
        assert_relative_eq!(c.correct(t(10), 10.0).unwrap(), 13.0, epsilon = TOL);
        assert!(c.correct(t(11), 10.0).is_none());
    }

    #[test]
    fn test_local_drift() {
        let start = t(0);
        let c = LinearCorrection {
            start,
            end: start + Duration::days(10),
            kind: LinearKind::LocalDrift {
                rate_per_day: 0.1,
                offset: 0.5,
            },
        };
        assert_relative_eq!(c.correct(start, 10.0).unwrap(), 10.5, epsilon = TOL);
        assert_relative_eq!(
            c.correct(start + Duration::days(4), 10.0).unwrap(),
            10.9,
            epsilon = TOL
        );
    }

    #[test]
    fn test_unknown_series() {
        let mut ds = dataset(vec![1.0]);
        let c = LinearCorrection {
            start: t(0),
            end: t(1),
            kind: LinearKind::Linear {
                slope: 1.0,
                offset: 0.0,
            },
        };
        assert!(apply_linear_corrections(&mut ds, "Fc", &[c]).is_err());
    }
}
