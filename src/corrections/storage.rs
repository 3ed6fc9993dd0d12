//! Storage corrections and available energy.
//!
//! # Soil heat storage
//!
//! Heat flux plates sit below the surface, so the heat stored in the layer
//! above them is added back:
//!
//! ```text
//! Cs = (1 − oc)·bd·Cd + oc·bd·Co + Sws·ρw·Cw      J/m³/K
//! S  = Cs·(ΔTs/Δt)·d                             W/m²
//! Fg = Fg_plate + S
//! ```
//!
//! # CO₂ storage
//!
//! With a single-point CO₂ measurement at height `zms` and a well mixed
//! column below it:
//!
//! ```text
//! Fc_storage = zms·ρd·ΔC/Δt
//! Fc         = Fc + Fc_storage
//! ```
//!
//! The first difference of every series is zero; the time difference is the
//! dataset's fixed sample interval.

use tracing::debug;

use crate::config::{Co2StorageConfig, ConfigError, SoilConfig, SoilParameters};
use crate::physics::constants::{CD_SOIL, CO_SOIL, CW, RHO_WATER};
use crate::pipeline::traits::owned;
use crate::pipeline::{PipelineError, Transform, TransformOutcome};
use crate::series::{Dataset, DatasetError, NewSeries, names};
use crate::types::FlagCode;

use super::pointwise;

/// First differences with a leading zero.
fn first_difference(x: &[f64]) -> Vec<f64> {
    let mut d = Vec::with_capacity(x.len());
    if !x.is_empty() {
        d.push(0.0);
    }
    d.extend(x.windows(2).map(|w| w[1] - w[0]));
    d
}

/// Volumetric heat capacity of the soil layer (J/m³/K).
pub fn soil_heat_capacity(params: &SoilParameters, sws: f64) -> f64 {
    let bd = params.bulk_density;
    let oc = params.organic_content;
    (1.0 - oc) * bd * CD_SOIL + oc * bd * CO_SOIL + sws * RHO_WATER * CW
}

/// Add the flux `correction` to the good samples of `target` in place.
///
/// Returns the number of samples masked because the corrected value was
/// invalid.
fn correct_in_place(
    ds: &mut Dataset,
    target: &str,
    correction: &[f64],
) -> Result<usize, PipelineError> {
    let series = ds
        .series_mut(target)
        .ok_or_else(|| DatasetError::UnknownSeries {
            name: target.to_string(),
        })?;
    let mut masked = 0;
    for (i, s) in correction.iter().enumerate() {
        let Some(v) = series.value(i) else {
            continue;
        };
        let corrected = v + s;
        series.update(i, corrected, FlagCode::StorageCorrected, FlagCode::StorageMasked);
        if !corrected.is_finite() {
            masked += 1;
        }
    }
    Ok(masked)
}

// =============================================================================
// Soil heat storage
// =============================================================================

/// Correct the ground heat flux for storage above the plates.
#[derive(Clone, Debug)]
pub struct SoilHeatStorage {
    params: SoilParameters,
    fg: String,
    ts: String,
    sws: Vec<String>,
}

impl SoilHeatStorage {
    pub fn new(params: SoilParameters, cfg: &SoilConfig) -> Self {
        Self {
            params,
            fg: cfg.fg.clone(),
            ts: cfg.ts.clone(),
            sws: cfg.sws.clone(),
        }
    }

    /// Resolve the soil properties from configuration.
    pub fn from_config(cfg: &SoilConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(cfg.parameters()?, cfg))
    }

    /// Soil water content per sample.
    ///
    /// No probes: the default. One probe: its values. Several: the mean of
    /// the valid probes. Samples without a valid value use the default.
    fn soil_water(&self, ds: &Dataset) -> Vec<f64> {
        let default = self.params.sws_default;
        let probes: Vec<_> = self.sws.iter().filter_map(|n| ds.series(n)).collect();
        (0..ds.len())
            .map(|i| {
                let (sum, count) = probes
                    .iter()
                    .filter_map(|s| s.value(i))
                    .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
                if count == 0 { default } else { sum / count as f64 }
            })
            .collect()
    }
}

impl Transform for SoilHeatStorage {
    fn name(&self) -> &'static str {
        "SoilHeatStorage"
    }

    fn description(&self) -> &str {
        "Ground heat flux corrected for storage above the flux plates"
    }

    fn requires(&self) -> Vec<String> {
        vec![self.fg.clone(), self.ts.clone()]
    }

    fn produces(&self) -> Vec<String> {
        vec![self.fg.clone(), names::FG_STORAGE.into(), names::CS.into()]
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let ts = ds.require(&self.ts)?.masked();
        let dts = first_difference(&ts);
        let dt = ds.time_step_seconds();

        let cs: Vec<f64> = self
            .soil_water(ds)
            .into_iter()
            .map(|sws| soil_heat_capacity(&self.params, sws))
            .collect();
        let storage: Vec<f64> = cs
            .iter()
            .zip(&dts)
            .map(|(c, d)| c * (d / dt) * self.params.depth)
            .collect();

        let inputs = [self.fg.as_str(), self.ts.as_str()];
        let mut masked = ds.create(
            NewSeries::new(names::CS, cs)
                .with_inputs(&inputs)
                .with_units("J/m3/K")
                .with_description("Volumetric heat capacity of the soil"),
        )?;
        masked += ds.create(
            NewSeries::new(names::FG_STORAGE, storage.clone())
                .with_inputs(&inputs)
                .merge_input_flags()
                .with_mask_code(FlagCode::StorageMasked)
                .with_units("W/m2")
                .with_description("Soil heat storage above the flux plates"),
        )?;
        masked += correct_in_place(ds, &self.fg, &storage)?;
        if let Some(fg) = ds.series_mut(&self.fg) {
            fg.add_note("corrected for soil heat storage");
        }

        debug!(series = %self.fg, masked, "soil heat storage applied");
        Ok(TransformOutcome::Applied {
            outputs: self.produces(),
            masked,
        })
    }
}

// =============================================================================
// CO2 storage
// =============================================================================

/// Correct the CO₂ flux for storage below the measurement height.
#[derive(Clone, Debug)]
pub struct Co2Storage {
    zms: f64,
    cc: String,
    fc: String,
}

impl Co2Storage {
    pub fn new(zms: f64, cc: impl Into<String>, fc: impl Into<String>) -> Self {
        Self {
            zms,
            cc: cc.into(),
            fc: fc.into(),
        }
    }

    /// `cc` is the CO₂ concentration series.
    pub fn from_config(cfg: &Co2StorageConfig, cc: &str) -> Result<Self, ConfigError> {
        let zms = cfg.zms.ok_or_else(|| ConfigError::missing("co2_storage", "zms"))?;
        Ok(Self::new(zms, cc, cfg.fc.clone()))
    }
}

impl Transform for Co2Storage {
    fn name(&self) -> &'static str {
        "Co2Storage"
    }

    fn description(&self) -> &str {
        "CO2 flux corrected for storage below the measurement height"
    }

    fn requires(&self) -> Vec<String> {
        vec![self.fc.clone(), self.cc.clone(), names::RHOD.into()]
    }

    fn produces(&self) -> Vec<String> {
        vec![self.fc.clone(), names::FC_STORAGE.into()]
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let dc = first_difference(&ds.require(&self.cc)?.masked());
        let rhod = ds.require(names::RHOD)?.masked();
        let dt = ds.time_step_seconds();
        let storage: Vec<f64> = rhod
            .iter()
            .zip(&dc)
            .map(|(r, d)| self.zms * r * d / dt)
            .collect();

        let mut masked = ds.create(
            NewSeries::new(names::FC_STORAGE, storage.clone())
                .with_inputs(&[self.fc.as_str(), self.cc.as_str(), names::RHOD])
                .merge_input_flags()
                .with_mask_code(FlagCode::StorageMasked)
                .with_units("mg/m2/s")
                .with_description("CO2 storage below the measurement height"),
        )?;
        masked += correct_in_place(ds, &self.fc, &storage)?;

        debug!(series = %self.fc, masked, "CO2 storage applied");
        Ok(TransformOutcome::Applied {
            outputs: self.produces(),
            masked,
        })
    }
}

// =============================================================================
// Available energy
// =============================================================================

/// Available energy `Fa = Fn − Fg`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AvailableEnergy;

impl Transform for AvailableEnergy {
    fn name(&self) -> &'static str {
        "AvailableEnergy"
    }

    fn description(&self) -> &str {
        "Available energy from net radiation and ground heat flux"
    }

    fn requires(&self) -> Vec<String> {
        owned(&[names::FN, names::FG])
    }

    fn produces(&self) -> Vec<String> {
        owned(&[names::FA])
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let data = pointwise(ds, [names::FN, names::FG], |[fn_, fg]| fn_ - fg)?;
        let masked = ds.create(
            NewSeries::new(names::FA, data)
                .with_inputs(&[names::FN, names::FG])
                .merge_input_flags()
                .with_mask_code(FlagCode::DerivedMasked)
                .with_units("W/m2")
                .with_description("Available energy"),
        )?;
        Ok(TransformOutcome::applied(&[names::FA], masked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MISSING;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    const TOL: f64 = 1e-10;

    fn dataset(columns: Vec<(&str, Vec<f64>)>) -> Dataset {
        let n = columns[0].1.len();
        let t0 = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let times = (0..n).map(|i| t0 + Duration::minutes(30 * i as i64)).collect();
        Dataset::from_columns(
            times,
            30,
            columns.into_iter().map(|(k, v)| (k.to_string(), v)),
        )
        .unwrap()
    }

    fn soil() -> SoilConfig {
        SoilConfig::new(0.08, 1500.0, 0.05, 0.2)
    }

    #[test]
    fn test_heat_capacity() {
        let p = soil().parameters().unwrap();
        let expected = 0.95 * 1500.0 * 840.0 + 0.05 * 1500.0 * 1920.0 + 0.2 * 1000.0 * 4180.0;
        assert_relative_eq!(soil_heat_capacity(&p, 0.2), expected, epsilon = TOL);
    }

    #[test]
    fn test_soil_heat_storage_default_moisture() {
        let mut ds = dataset(vec![
            ("Fg", vec![10.0, 12.0, 14.0, MISSING]),
            ("Ts", vec![20.0, 20.5, 20.5, 21.0]),
        ]);
        let t = SoilHeatStorage::from_config(&soil()).unwrap();
        t.apply(&mut ds).unwrap();

        let p = soil().parameters().unwrap();
        let cs = soil_heat_capacity(&p, 0.2);
        let fg = ds.series("Fg").unwrap();
        // First sample: zero temperature change
        assert_relative_eq!(fg.data()[0], 10.0, epsilon = TOL);
        assert_eq!(fg.flag()[0], FlagCode::StorageCorrected);
        assert_relative_eq!(fg.data()[1], 12.0 + cs * (0.5 / 1800.0) * 0.08, epsilon = 1e-9);
        assert_relative_eq!(fg.data()[2], 14.0, epsilon = TOL);
        // Missing plate value stays missing with its original flag
        assert_eq!(fg.flag()[3], FlagCode::Missing);

        assert!(ds.contains("Fg_storage"));
        assert_relative_eq!(ds.series("Cs").unwrap().data()[0], cs, epsilon = 1e-9);
        assert!(ds.invariant_violations().is_empty());
    }

    #[test]
    fn test_soil_water_probe_average() {
        let ds = dataset(vec![
            ("Fg", vec![10.0; 3]),
            ("Ts", vec![20.0; 3]),
            ("Sws_a", vec![0.1, 0.1, MISSING]),
            ("Sws_b", vec![0.3, MISSING, MISSING]),
        ]);
        let t = SoilHeatStorage::from_config(&soil().with_probes(&["Sws_a", "Sws_b"])).unwrap();
        let sws = t.soil_water(&ds);
        assert_relative_eq!(sws[0], 0.2, epsilon = TOL);
        assert_relative_eq!(sws[1], 0.1, epsilon = TOL);
        assert_relative_eq!(sws[2], 0.2, epsilon = TOL);
    }

    #[test]
    fn test_soil_parameters_clamped() {
        let p = SoilConfig::new(0.9, 3000.0, 1.5, 2.0).parameters().unwrap();
        assert_eq!(p.depth, 0.5);
        assert_eq!(p.bulk_density, 2500.0);
        assert_eq!(p.organic_content, 1.0);
        assert_eq!(p.sws_default, 1.0);
    }

    #[test]
    fn test_co2_storage() {
        let mut ds = dataset(vec![
            ("Fc", vec![-0.5, -0.5, -0.5]),
            ("Cc", vec![700.0, 709.0, MISSING]),
            ("rhod", vec![1.2, 1.2, 1.2]),
        ]);
        let t = Co2Storage::from_config(&Co2StorageConfig::new(4.0), "Cc").unwrap();
        t.apply(&mut ds).unwrap();

        let fc = ds.series("Fc").unwrap();
        assert_relative_eq!(fc.data()[0], -0.5, epsilon = TOL);
        assert_relative_eq!(fc.data()[1], -0.5 + 4.0 * 1.2 * 9.0 / 1800.0, epsilon = TOL);
        assert_eq!(fc.flag()[1], FlagCode::StorageCorrected);
        // Concentration missing: storage undefined, flux masked
        assert_eq!(fc.flag()[2], FlagCode::StorageMasked);
        assert!(ds.invariant_violations().is_empty());
    }

    #[test]
    fn test_co2_storage_requires_height() {
        assert!(Co2Storage::from_config(&Co2StorageConfig::default(), "Cc").is_err());
    }

    #[test]
    fn test_available_energy() {
        let mut ds = dataset(vec![("Fn", vec![400.0, MISSING]), ("Fg", vec![50.0, 40.0])]);
        AvailableEnergy.apply(&mut ds).unwrap();
        let fa = ds.series("Fa").unwrap();
        assert_relative_eq!(fa.data()[0], 350.0, epsilon = TOL);
        assert!(!fa.is_valid(1));
    }
}
