//! Derived meteorological variables.
//!
//! Air densities, latent heat, moist specific heat and humidity measures are
//! needed by the flux assembly and the density correction; they are computed
//! once per level from air temperature, absolute humidity and pressure.

use crate::config::MetInputs;
use crate::physics::meteorology as mf;
use crate::pipeline::traits::owned;
use crate::pipeline::{PipelineError, Transform, TransformOutcome};
use crate::series::{Dataset, NewSeries, names};
use crate::types::FlagCode;

use super::pointwise;

/// Vapour pressure, densities, latent heat, specific heat and humidity.
#[derive(Clone, Debug, Default)]
pub struct MeteorologicalVariables {
    met: MetInputs,
}

impl MeteorologicalVariables {
    pub fn new(met: MetInputs) -> Self {
        Self { met }
    }
}

type MetFn = fn(f64, f64, f64) -> f64;

impl Transform for MeteorologicalVariables {
    fn name(&self) -> &'static str {
        "MeteorologicalVariables"
    }

    fn description(&self) -> &str {
        "Moist-air densities, latent heat and humidity from Ta, Ah and ps"
    }

    fn requires(&self) -> Vec<String> {
        vec![self.met.ta.clone(), self.met.ah.clone(), self.met.ps.clone()]
    }

    fn produces(&self) -> Vec<String> {
        owned(&[
            names::E,
            names::ESAT,
            names::VPD,
            names::RHOD,
            names::RHOM,
            names::LV,
            names::CPM,
            names::Q,
            names::MR,
        ])
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let (ta, ah, ps) = (self.met.ta.as_str(), self.met.ah.as_str(), self.met.ps.as_str());

        let full: [(&str, MetFn, &str, &str); 5] = [
            (names::RHOD, mf::dry_air_density, "kg/m3", "Dry air density"),
            (names::RHOM, mf::moist_air_density, "kg/m3", "Moist air density"),
            (names::CPM, mf::moist_specific_heat, "J/kg/K", "Specific heat of moist air"),
            (names::Q, mf::specific_humidity, "kg/kg", "Specific humidity"),
            (names::MR, mf::mixing_ratio, "kg/kg", "Water vapour mixing ratio"),
        ];

        let mut masked = 0;
        for (name, f, units, description) in full {
            let data = pointwise(ds, [ta, ah, ps], |[t, a, p]| f(t, a, p))?;
            masked += ds.create(
                NewSeries::new(name, data)
                    .with_inputs(&[ta, ah, ps])
                    .merge_input_flags()
                    .with_mask_code(FlagCode::DerivedMasked)
                    .with_units(units)
                    .with_description(description),
            )?;
        }

        let e = pointwise(ds, [ah, ta], |[a, t]| mf::vapour_pressure(a, t))?;
        masked += ds.create(
            NewSeries::new(names::E, e)
                .with_inputs(&[ah, ta])
                .merge_input_flags()
                .with_mask_code(FlagCode::DerivedMasked)
                .with_units("kPa")
                .with_description("Vapour pressure"),
        )?;

        let vpd = pointwise(ds, [ta, ah], |[t, a]| mf::vapour_pressure_deficit(t, a))?;
        masked += ds.create(
            NewSeries::new(names::VPD, vpd)
                .with_inputs(&[ta, ah])
                .merge_input_flags()
                .with_mask_code(FlagCode::DerivedMasked)
                .with_units("kPa")
                .with_description("Vapour pressure deficit"),
        )?;

        let esat = pointwise(ds, [ta], |[t]| mf::saturation_vapour_pressure(t))?;
        masked += ds.create(
            NewSeries::new(names::ESAT, esat)
                .with_inputs(&[ta])
                .merge_input_flags()
                .with_mask_code(FlagCode::DerivedMasked)
                .with_units("kPa")
                .with_description("Saturation vapour pressure"),
        )?;

        let lv = pointwise(ds, [ta], |[t]| mf::latent_heat(t))?;
        masked += ds.create(
            NewSeries::new(names::LV, lv)
                .with_inputs(&[ta])
                .merge_input_flags()
                .with_mask_code(FlagCode::DerivedMasked)
                .with_units("J/kg")
                .with_description("Latent heat of vaporisation"),
        )?;

        Ok(TransformOutcome::Applied {
            outputs: self.produces(),
            masked,
        })
    }
}

/// Air temperature from the sonic virtual temperature.
#[derive(Clone, Debug, Default)]
pub struct AirTemperatureFromSonic {
    met: MetInputs,
}

impl AirTemperatureFromSonic {
    pub fn new(met: MetInputs) -> Self {
        Self { met }
    }
}

impl Transform for AirTemperatureFromSonic {
    fn name(&self) -> &'static str {
        "AirTemperatureFromSonic"
    }

    fn description(&self) -> &str {
        "Air temperature from sonic virtual temperature and specific humidity"
    }

    fn requires(&self) -> Vec<String> {
        vec![self.met.tv.clone(), names::Q.to_string()]
    }

    fn produces(&self) -> Vec<String> {
        owned(&[names::TA_SONIC])
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let tv = self.met.tv.as_str();
        let data = pointwise(ds, [tv, names::Q], |[t, q]| mf::temperature_from_virtual(t, q))?;
        let masked = ds.create(
            NewSeries::new(names::TA_SONIC, data)
                .with_inputs(&[tv, names::Q])
                .merge_input_flags()
                .with_mask_code(FlagCode::TaFromTvMasked)
                .with_units("C")
                .with_description("Air temperature from sonic virtual temperature"),
        )?;
        Ok(TransformOutcome::applied(&[names::TA_SONIC], masked))
    }
}

/// Absolute humidity from a humidity probe's vapour pressure and air
/// temperature.
#[derive(Clone, Debug, PartialEq)]
pub struct AbsoluteHumidity {
    e: String,
    ta: String,
    ah: String,
}

impl Default for AbsoluteHumidity {
    fn default() -> Self {
        Self::new(names::E, names::TA_HMP, names::AH_HMP)
    }
}

impl AbsoluteHumidity {
    /// Vapour pressure (kPa) and temperature (°C) in, absolute humidity
    /// (g/m³) out.
    pub fn new(e: impl Into<String>, ta: impl Into<String>, ah: impl Into<String>) -> Self {
        Self {
            e: e.into(),
            ta: ta.into(),
            ah: ah.into(),
        }
    }
}

impl Transform for AbsoluteHumidity {
    fn name(&self) -> &'static str {
        "AbsoluteHumidity"
    }

    fn description(&self) -> &str {
        "Absolute humidity from vapour pressure and air temperature"
    }

    fn requires(&self) -> Vec<String> {
        vec![self.e.clone(), self.ta.clone()]
    }

    fn produces(&self) -> Vec<String> {
        vec![self.ah.clone()]
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let (e, ta) = (self.e.as_str(), self.ta.as_str());
        let data = pointwise(ds, [e, ta], |[e, t]| mf::absolute_humidity(e, t))?;
        let masked = ds.create(
            NewSeries::new(self.ah.as_str(), data)
                .with_inputs(&[ta, e])
                .merge_input_flags()
                .with_mask_code(FlagCode::DerivedMasked)
                .with_units("g/m3")
                .with_description("Absolute humidity"),
        )?;
        Ok(TransformOutcome::applied(&[self.ah.as_str()], masked))
    }
}
