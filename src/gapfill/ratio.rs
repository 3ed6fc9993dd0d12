//! Ratio-based flux reconstruction.
//!
//! ```text
//! Fe_gf = EF·Fa        evaporative fraction × available energy
//! Fh    = BR·Fe_gf     Bowen ratio
//! Fc    = WUE·Fe_gf    water use efficiency
//! ```
//!
//! The ratio surfaces are time-of-day × month tables interpolated along
//! day-of-year. Latent heat comes first because the other two depend on it.
//! Only missing slots of `Fe`, `Fh` and `Fc` are filled.

use tracing::{debug, warn};

use crate::config::RatioConfig;
use crate::series::{Dataset, DatasetError, NewSeries, names};
use crate::types::FlagCode;

use super::{GapFillSources, MonthlyTable};

/// Samples filled per flux.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RatioFill {
    pub fe: usize,
    pub fh: usize,
    pub fc: usize,
}

impl RatioFill {
    pub fn total(&self) -> usize {
        self.fe + self.fh + self.fc
    }
}

fn write_surface(ds: &mut Dataset, name: &str, table: &MonthlyTable, description: &str) -> Result<Vec<f64>, DatasetError> {
    let values: Vec<f64> = (0..ds.len()).map(|i| table.interpolate(ds, i)).collect();
    ds.create(
        NewSeries::new(name, values.clone())
            .with_units("-")
            .with_description(description),
    )?;
    Ok(values)
}

/// Fill missing slots of `target` from `values`.
fn fill_missing(ds: &mut Dataset, target: &str, values: impl Iterator<Item = f64>) -> usize {
    let Some(series) = ds.series_mut(target) else {
        debug!(target, "not present, ratio fill skipped");
        return 0;
    };
    values
        .enumerate()
        .filter(|&(i, v)| series.fill(i, v, FlagCode::Ratio))
        .count()
}

/// Reconstruct `Fe`, `Fh` and `Fc` from the ratio surfaces.
///
/// Requires available energy `Fa`. Surfaces missing from `sources` are
/// skipped with a warning; without the evaporative fraction nothing is
/// filled.
pub fn fill_from_ratios(
    ds: &mut Dataset,
    config: &RatioConfig,
    sources: &GapFillSources,
) -> Result<RatioFill, DatasetError> {
    let mut filled = RatioFill::default();
    let Some(fa) = ds.series(names::FA).map(|s| s.masked()) else {
        warn!(missing = names::FA, "available energy absent, ratio fill skipped");
        return Ok(filled);
    };
    let Some(ef_table) = sources.table(&config.evaporative_fraction) else {
        warn!(table = %config.evaporative_fraction, "evaporative fraction table not loaded, ratio fill skipped");
        return Ok(filled);
    };

    let ef = write_surface(ds, names::EF, ef_table, "Evaporative fraction surface")?;
    let fe_gf: Vec<f64> = ef.iter().zip(&fa).map(|(e, a)| e * a).collect();
    ds.create(
        NewSeries::new(names::FE_GF, fe_gf.clone())
            .with_inputs(&[names::FA, names::EF])
            .merge_input_flags()
            .with_mask_code(FlagCode::DerivedMasked)
            .with_units("W/m2")
            .with_description("Latent heat flux from evaporative fraction"),
    )?;
    filled.fe = fill_missing(ds, names::FE, fe_gf.iter().copied());

    let others = [
        (config.bowen_ratio.as_deref(), names::BR, names::FH, "Bowen ratio surface"),
        (
            config.water_use_efficiency.as_deref(),
            names::WUE,
            names::FC,
            "Water use efficiency surface",
        ),
    ];
    for (key, surface, target, description) in others {
        let Some(key) = key else {
            continue;
        };
        let Some(table) = sources.table(key) else {
            warn!(table = key, target, "ratio table not loaded, skipped");
            continue;
        };
        let ratio = write_surface(ds, surface, table, description)?;
        let n = fill_missing(ds, target, ratio.iter().zip(&fe_gf).map(|(r, e)| r * e));
        if target == names::FH {
            filled.fh = n;
        } else {
            filled.fc = n;
        }
    }

    debug!(fe = filled.fe, fh = filled.fh, fc = filled.fc, "ratio fill");
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MISSING;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn dataset() -> Dataset {
        let t0 = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let times = (0..3).map(|i| t0 + Duration::minutes(30 * i)).collect();
        Dataset::from_columns(
            times,
            30,
            [
                ("Fa".to_string(), vec![400.0, 400.0, MISSING]),
                ("Fe".to_string(), vec![MISSING, 150.0, MISSING]),
                ("Fh".to_string(), vec![MISSING, 100.0, MISSING]),
                ("Fc".to_string(), vec![MISSING, -0.5, MISSING]),
            ],
        )
        .unwrap()
    }

    fn sources() -> GapFillSources {
        GapFillSources::new()
            .with_table("ef", MonthlyTable::constant(48, 0.5).unwrap())
            .with_table("br", MonthlyTable::constant(48, 0.8).unwrap())
            .with_table("wue", MonthlyTable::constant(48, -0.004).unwrap())
    }

    fn config() -> RatioConfig {
        RatioConfig {
            evaporative_fraction: "ef".into(),
            bowen_ratio: Some("br".into()),
            water_use_efficiency: Some("wue".into()),
        }
    }

    #[test]
    fn test_ratio_chain() {
        let mut ds = dataset();
        let filled = fill_from_ratios(&mut ds, &config(), &sources()).unwrap();
        assert_eq!(filled, RatioFill { fe: 1, fh: 1, fc: 1 });

        let fe = ds.series("Fe").unwrap();
        assert_relative_eq!(fe.data()[0], 200.0, epsilon = 1e-9);
        assert_eq!(fe.flag()[0], FlagCode::Ratio);
        assert_relative_eq!(fe.data()[1], 150.0);
        // No available energy, nothing to reconstruct from
        assert_eq!(fe.flag()[2], FlagCode::Missing);

        assert_relative_eq!(ds.series("Fh").unwrap().data()[0], 160.0, epsilon = 1e-9);
        assert_relative_eq!(ds.series("Fc").unwrap().data()[0], -0.8, epsilon = 1e-9);
        for name in ["EF", "BR", "WUE", "Fe_gf"] {
            assert!(ds.contains(name), "{name} not written");
        }
        assert!(ds.invariant_violations().is_empty());
    }

    #[test]
    fn test_missing_ef_table_skips() {
        let mut ds = dataset();
        let filled = fill_from_ratios(&mut ds, &config(), &GapFillSources::new()).unwrap();
        assert_eq!(filled.total(), 0);
        assert!(!ds.contains("EF"));
    }
}
