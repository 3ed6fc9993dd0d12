//! Webb-Pearman-Leuning density correction.
//!
//! Open-path gas analysers measure densities, so a sensible or latent heat
//! flux changes the measured density of H₂O and CO₂ without any transport of
//! those gases. The correction adds the dilution and thermal expansion terms
//! back (Webb et al. 1980).
//!
//! Flux form, with `σ = (Ah/1000)/ρd` and `TaK = Ta + 273.15`:
//!
//! ```text
//! Fe = Fe_raw + 1.61·σ·Fe_raw + (1 + 1.61σ)·(Ah/1000)·Lv·(Fh/(ρm·Cpm))/TaK
//! Fc = Fc_raw + 1.61·(Cc/ρd)·(Fe/Lv) + (1 + 1.61σ)·(Cc/TaK)·Fh/(ρm·Cpm)
//! ```
//!
//! Covariance form:
//!
//! ```text
//! wT    = Fh/(ρm·Cpm)
//! wA'   = (1 + 1.61σ)·(wA + (Ah/TaK)·wT)        g/m²/s
//! Fe    = Lv·wA'/1000
//! Fc    = wC + 1.61·(Cc/ρd)·(wA'/1000) + (1 + 1.61σ)·(Cc/TaK)·wT
//! ```
//!
//! Both forms need the actual (not virtual) sensible heat flux, so this
//! transform requires `Fh`, which only [`VirtualHeatFlux`](super::VirtualHeatFlux)
//! produces.

use tracing::warn;

use crate::config::{MetInputs, WplForm};
use crate::physics::constants::{C_TO_K, MU};
use crate::pipeline::traits::owned;
use crate::pipeline::{PipelineError, Transform, TransformOutcome};
use crate::series::{Dataset, NewSeries, names};
use crate::types::FlagCode;

use super::fluxes::CovarianceSource;

/// Thermodynamic state shared by both corrections.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AirState {
    /// Air temperature (°C).
    pub ta: f64,
    /// Absolute humidity (g/m³).
    pub ah: f64,
    /// Dry air density (kg/m³).
    pub rhod: f64,
    /// Moist air density (kg/m³).
    pub rhom: f64,
    /// Latent heat of vaporisation (J/kg).
    pub lv: f64,
    /// Specific heat of moist air (J/kg/K).
    pub cpm: f64,
}

impl AirState {
    #[inline]
    fn sigma(&self) -> f64 {
        (self.ah / 1000.0) / self.rhod
    }

    /// Kinematic heat flux from the sensible heat flux.
    #[inline]
    fn kinematic_heat(&self, fh: f64) -> f64 {
        fh / (self.rhom * self.cpm)
    }
}

/// WPL-corrected latent heat flux, flux form.
pub fn wpl_latent_flux(fe_raw: f64, fh: f64, air: &AirState) -> f64 {
    let sigma = air.sigma();
    let ta_k = air.ta + C_TO_K;
    fe_raw
        + MU * sigma * fe_raw
        + (1.0 + MU * sigma) * (air.ah / 1000.0) * air.lv * air.kinematic_heat(fh) / ta_k
}

/// WPL-corrected CO₂ flux, flux form. `fe` is the corrected latent heat flux.
pub fn wpl_co2_flux(fc_raw: f64, fe: f64, fh: f64, cc: f64, air: &AirState) -> f64 {
    let sigma = air.sigma();
    let ta_k = air.ta + C_TO_K;
    fc_raw
        + MU * (cc / air.rhod) * (fe / air.lv)
        + (1.0 + MU * sigma) * (cc / ta_k) * air.kinematic_heat(fh)
}

/// WPL-corrected water vapour covariance (g/m²/s), covariance form.
pub fn wpl_vapour_covariance(wa: f64, fh: f64, air: &AirState) -> f64 {
    let ta_k = air.ta + C_TO_K;
    (1.0 + MU * air.sigma()) * (wa + (air.ah / ta_k) * air.kinematic_heat(fh))
}

/// WPL-corrected CO₂ flux, covariance form. `wa_wpl` is the corrected
/// vapour covariance.
pub fn wpl_co2_covariance(wc: f64, wa_wpl: f64, fh: f64, cc: f64, air: &AirState) -> f64 {
    let ta_k = air.ta + C_TO_K;
    wc + MU * (cc / air.rhod) * (wa_wpl / 1000.0)
        + (1.0 + MU * air.sigma()) * (cc / ta_k) * air.kinematic_heat(fh)
}

/// Density correction of the latent heat and CO₂ fluxes.
#[derive(Clone, Debug, Default)]
pub struct DensityCorrection {
    form: WplForm,
    met: MetInputs,
    source: CovarianceSource,
}

impl DensityCorrection {
    pub fn new(form: WplForm, met: MetInputs, source: CovarianceSource) -> Self {
        Self { form, met, source }
    }

    /// Series every output depends on.
    fn state_inputs(&self) -> [&str; 7] {
        [
            names::FH,
            &self.met.ta,
            &self.met.ah,
            names::RHOD,
            names::RHOM,
            names::LV,
            names::CPM,
        ]
    }

    fn vapour_input(&self) -> &str {
        match self.form {
            WplForm::Flux => names::FE_RAW,
            WplForm::Covariance => self.source.wa(),
        }
    }

    fn co2_input(&self) -> &str {
        match self.form {
            WplForm::Flux => names::FC_RAW,
            WplForm::Covariance => self.source.wc(),
        }
    }

    fn states(&self, ds: &Dataset) -> Result<Vec<Option<AirState>>, PipelineError> {
        let [_, ta, ah, rhod, rhom, lv, cpm] = self.state_inputs();
        let cols = [ta, ah, rhod, rhom, lv, cpm]
            .into_iter()
            .map(|name| ds.require(name).map(|s| s.masked()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((0..ds.len())
            .map(|i| {
                let s = AirState {
                    ta: cols[0][i],
                    ah: cols[1][i],
                    rhod: cols[2][i],
                    rhom: cols[3][i],
                    lv: cols[4][i],
                    cpm: cols[5][i],
                };
                (s.ta.is_finite() && s.ah.is_finite()).then_some(s)
            })
            .collect())
    }
}

impl Transform for DensityCorrection {
    fn name(&self) -> &'static str {
        "DensityCorrection"
    }

    fn description(&self) -> &str {
        match self.form {
            WplForm::Flux => "WPL density correction (flux form)",
            WplForm::Covariance => "WPL density correction (covariance form)",
        }
    }

    fn requires(&self) -> Vec<String> {
        let mut req = owned(&self.state_inputs());
        req.push(self.vapour_input().to_string());
        req
    }

    fn produces(&self) -> Vec<String> {
        match self.form {
            WplForm::Flux => owned(&[names::FE, names::FC]),
            WplForm::Covariance => owned(&[names::FE, names::FC, names::WA_WPL]),
        }
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let states = self.states(ds)?;
        let fh = ds.require(names::FH)?.masked();
        let vapour = ds.require(self.vapour_input())?.masked();
        let state_inputs = self.state_inputs();
        let nan = f64::NAN;

        let mut outputs = vec![names::FE];
        let mut masked = 0;

        // Latent heat
        let (fe, wa_wpl): (Vec<f64>, Option<Vec<f64>>) = match self.form {
            WplForm::Flux => (
                (0..ds.len())
                    .map(|i| states[i].map_or(nan, |s| wpl_latent_flux(vapour[i], fh[i], &s)))
                    .collect(),
                None,
            ),
            WplForm::Covariance => {
                let wa: Vec<f64> = (0..ds.len())
                    .map(|i| states[i].map_or(nan, |s| wpl_vapour_covariance(vapour[i], fh[i], &s)))
                    .collect();
                let fe = ds
                    .require(names::LV)?
                    .masked()
                    .iter()
                    .zip(&wa)
                    .map(|(lv, w)| lv * w / 1000.0)
                    .collect();
                (fe, Some(wa))
            }
        };

        let mut vapour_inputs = state_inputs.to_vec();
        vapour_inputs.push(self.vapour_input());

        if let Some(wa) = &wa_wpl {
            masked += ds.create(
                NewSeries::new(names::WA_WPL, wa.clone())
                    .with_inputs(&vapour_inputs)
                    .merge_input_flags()
                    .with_mask_code(FlagCode::DensityMasked)
                    .with_units("g/m2/s")
                    .with_description("WPL corrected water vapour covariance"),
            )?;
            outputs.push(names::WA_WPL);
        }
        masked += ds.create(
            NewSeries::new(names::FE, fe.clone())
                .with_inputs(&vapour_inputs)
                .merge_input_flags()
                .with_mask_code(FlagCode::DensityMasked)
                .with_units("W/m2")
                .with_description("Latent heat flux, WPL corrected")
                .with_standard_name("surface_upward_latent_heat_flux"),
        )?;

        // CO2
        let co2 = self.co2_input();
        if !(ds.contains(co2) && ds.contains(&self.met.cc)) {
            warn!(transform = self.name(), input = co2, cc = %self.met.cc, "CO2 flux not corrected");
            return Ok(TransformOutcome::applied(&outputs, masked));
        }
        let raw = ds.require(co2)?.masked();
        let cc = ds.require(&self.met.cc)?.masked();
        let fc: Vec<f64> = (0..ds.len())
            .map(|i| {
                states[i].map_or(nan, |s| match &wa_wpl {
                    None => wpl_co2_flux(raw[i], fe[i], fh[i], cc[i], &s),
                    Some(wa) => wpl_co2_covariance(raw[i], wa[i], fh[i], cc[i], &s),
                })
            })
            .collect();

        let mut co2_inputs = vapour_inputs;
        co2_inputs.push(co2);
        co2_inputs.push(&self.met.cc);
        masked += ds.create(
            NewSeries::new(names::FC, fc)
                .with_inputs(&co2_inputs)
                .merge_input_flags()
                .with_mask_code(FlagCode::DensityMasked)
                .with_units("mg/m2/s")
                .with_description("CO2 flux, WPL corrected"),
        )?;
        outputs.push(names::FC);

        Ok(TransformOutcome::applied(&outputs, masked))
    }
}
