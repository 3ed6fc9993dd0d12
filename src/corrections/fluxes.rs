//! Flux assembly from covariances.
//!
//! # Physics
//!
//! ```text
//! Fhv    = ρm·Cpd·w'T'               sonic (virtual) sensible heat flux, W/m²
//! Fe_raw = Lv·w'ρv'/1000             latent heat flux before WPL, W/m²
//! Fc_raw = w'ρc'                     CO₂ flux before WPL, mg/m²/s
//! Fm     = ρm·√(u'w'² + v'w'²)       momentum flux, kg/m/s²
//! u*     = (u'w'² + v'w'²)^¼         friction velocity, m/s
//! ```
//!
//! The sonic temperature is a virtual temperature, so `Fhv` overstates the
//! sensible heat flux by the humidity flux contribution. [`VirtualHeatFlux`]
//! removes it (Schotanus et al. 1983):
//!
//! ```text
//! Fh = (Ta/Tv)·(Fhv − ρm·Cpm·(0.51·Rd·Ta²/p)·(Fe_raw/Lv))
//! ```
//!
//! with temperatures in K and `p` in Pa. This must run before the density
//! correction, which consumes `Fh`.

use tracing::warn;

use crate::config::MetInputs;
use crate::physics::constants::{C_TO_K, CPD, RD};
use crate::physics::meteorology::friction_velocity;
use crate::pipeline::traits::owned;
use crate::pipeline::{PipelineError, Transform, TransformOutcome};
use crate::series::{Dataset, NewSeries, names};
use crate::types::FlagCode;

use super::pointwise;

/// Which covariances feed the flux assembly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CovarianceSource {
    /// Rotated covariances.
    #[default]
    Rotated,
    /// Rotated and Massman-corrected covariances.
    SpectrallyCorrected,
}

impl CovarianceSource {
    pub fn wt(self) -> &'static str {
        match self {
            CovarianceSource::Rotated => names::WT,
            CovarianceSource::SpectrallyCorrected => names::WT_M,
        }
    }

    pub fn wa(self) -> &'static str {
        match self {
            CovarianceSource::Rotated => names::WA,
            CovarianceSource::SpectrallyCorrected => names::WA_M,
        }
    }

    pub fn wc(self) -> &'static str {
        match self {
            CovarianceSource::Rotated => names::WC,
            CovarianceSource::SpectrallyCorrected => names::WC_M,
        }
    }

    pub fn uw(self) -> &'static str {
        match self {
            CovarianceSource::Rotated => names::UW,
            CovarianceSource::SpectrallyCorrected => names::UW_M,
        }
    }

    pub fn vw(self) -> &'static str {
        match self {
            CovarianceSource::Rotated => names::VW,
            CovarianceSource::SpectrallyCorrected => names::VW_M,
        }
    }
}

// =============================================================================
// Flux assembly
// =============================================================================

/// Convert covariances to fluxes.
#[derive(Clone, Copy, Debug, Default)]
pub struct CalculateFluxes {
    source: CovarianceSource,
}

impl CalculateFluxes {
    pub fn new(source: CovarianceSource) -> Self {
        Self { source }
    }
}

impl Transform for CalculateFluxes {
    fn name(&self) -> &'static str {
        "CalculateFluxes"
    }

    fn description(&self) -> &str {
        "Sensible, latent, CO2 and momentum fluxes from covariances"
    }

    fn requires(&self) -> Vec<String> {
        owned(&[
            self.source.wt(),
            self.source.uw(),
            self.source.vw(),
            names::RHOM,
            names::LV,
        ])
    }

    fn produces(&self) -> Vec<String> {
        owned(&[names::FHV, names::FE_RAW, names::FC_RAW, names::FM, names::USTAR])
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let src = self.source;
        let mut masked = 0;
        let mut outputs = Vec::new();

        let fhv = pointwise(ds, [src.wt(), names::RHOM], |[wt, rhom]| rhom * CPD * wt)?;
        masked += ds.create(
            NewSeries::new(names::FHV, fhv)
                .with_inputs(&[src.wt(), names::RHOM])
                .merge_input_flags()
                .with_mask_code(FlagCode::DerivedMasked)
                .with_units("W/m2")
                .with_description("Virtual sensible heat flux"),
        )?;
        outputs.push(names::FHV);

        if ds.contains(src.wa()) {
            let fe = pointwise(ds, [src.wa(), names::LV], |[wa, lv]| lv * wa / 1000.0)?;
            masked += ds.create(
                NewSeries::new(names::FE_RAW, fe)
                    .with_inputs(&[src.wa(), names::LV])
                    .merge_input_flags()
                    .with_mask_code(FlagCode::DerivedMasked)
                    .with_units("W/m2")
                    .with_description("Latent heat flux, not density corrected"),
            )?;
            outputs.push(names::FE_RAW);
        } else {
            warn!(series = names::FE_RAW, missing = src.wa(), "latent heat flux not calculated");
        }

        if ds.contains(src.wc()) {
            let fc = pointwise(ds, [src.wc()], |[wc]| wc)?;
            masked += ds.create(
                NewSeries::new(names::FC_RAW, fc)
                    .with_inputs(&[src.wc()])
                    .merge_input_flags()
                    .with_mask_code(FlagCode::DerivedMasked)
                    .with_units("mg/m2/s")
                    .with_description("CO2 flux, not density corrected"),
            )?;
            outputs.push(names::FC_RAW);
        } else {
            warn!(series = names::FC_RAW, missing = src.wc(), "CO2 flux not calculated");
        }

        let momentum = [src.uw(), src.vw(), names::RHOM];
        let fm = pointwise(ds, momentum, |[uw, vw, rhom]| rhom * (uw * uw + vw * vw).sqrt())?;
        masked += ds.create(
            NewSeries::new(names::FM, fm)
                .with_inputs(&momentum)
                .merge_input_flags()
                .with_mask_code(FlagCode::DerivedMasked)
                .with_units("kg/m/s2")
                .with_description("Momentum flux"),
        )?;
        outputs.push(names::FM);

        let ustar = pointwise(ds, [src.uw(), src.vw()], |[uw, vw]| friction_velocity(uw, vw))?;
        masked += ds.create(
            NewSeries::new(names::USTAR, ustar)
                .with_inputs(&[src.uw(), src.vw()])
                .merge_input_flags()
                .with_mask_code(FlagCode::DerivedMasked)
                .with_units("m/s")
                .with_description("Friction velocity"),
        )?;
        outputs.push(names::USTAR);

        Ok(TransformOutcome::applied(&outputs, masked))
    }
}

// =============================================================================
// Virtual to actual sensible heat flux
// =============================================================================

/// Sensible heat flux from the sonic (virtual) heat flux.
#[allow(clippy::too_many_arguments)]
pub fn actual_heat_flux(fhv: f64, fe: f64, ta: f64, tv: f64, ps: f64, rhom: f64, cpm: f64, lv: f64) -> f64 {
    let ta_k = ta + C_TO_K;
    let tv_k = tv + C_TO_K;
    let humidity_term = rhom * cpm * (0.51 * RD * ta_k * ta_k / (ps * 1000.0)) * (fe / lv);
    (ta_k / tv_k) * (fhv - humidity_term)
}

/// Virtual to actual sensible heat flux conversion.
#[derive(Clone, Debug, Default)]
pub struct VirtualHeatFlux {
    met: MetInputs,
}

impl VirtualHeatFlux {
    pub fn new(met: MetInputs) -> Self {
        Self { met }
    }

    fn inputs(&self) -> [&str; 8] {
        [
            names::FHV,
            names::FE_RAW,
            &self.met.ta,
            &self.met.tv,
            &self.met.ps,
            names::RHOM,
            names::CPM,
            names::LV,
        ]
    }
}

impl Transform for VirtualHeatFlux {
    fn name(&self) -> &'static str {
        "VirtualHeatFlux"
    }

    fn description(&self) -> &str {
        "Convert sonic virtual heat flux to sensible heat flux"
    }

    fn requires(&self) -> Vec<String> {
        owned(&self.inputs())
    }

    fn produces(&self) -> Vec<String> {
        owned(&[names::FH])
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let inputs = self.inputs();
        let fh = pointwise(ds, inputs, |[fhv, fe, ta, tv, ps, rhom, cpm, lv]| {
            actual_heat_flux(fhv, fe, ta, tv, ps, rhom, cpm, lv)
        })?;
        let masked = ds.create(
            NewSeries::new(names::FH, fh)
                .with_inputs(&inputs)
                .merge_input_flags()
                .with_mask_code(FlagCode::VirtualHeatMasked)
                .with_units("W/m2")
                .with_description("Sensible heat flux"),
        )?;
        Ok(TransformOutcome::applied(&[names::FH], masked))
    }
}

// =============================================================================
// Net radiation
// =============================================================================

/// Net radiation from the four radiation components.
#[derive(Clone, Copy, Debug, Default)]
pub struct NetRadiation;

const RADIATION: [&str; 4] = [names::FSD, names::FSU, names::FLD, names::FLU];

impl Transform for NetRadiation {
    fn name(&self) -> &'static str {
        "NetRadiation"
    }

    fn description(&self) -> &str {
        "Net radiation (Fsd - Fsu) + (Fld - Flu)"
    }

    fn requires(&self) -> Vec<String> {
        owned(&RADIATION)
    }

    fn produces(&self) -> Vec<String> {
        owned(&[names::FN])
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let fn_ = pointwise(ds, RADIATION, |[fsd, fsu, fld, flu]| (fsd - fsu) + (fld - flu))?;
        let masked = ds.create(
            NewSeries::new(names::FN, fn_)
                .with_inputs(&RADIATION)
                .merge_input_flags()
                .with_mask_code(FlagCode::DerivedMasked)
                .with_units("W/m2")
                .with_description("Net radiation"),
        )?;
        Ok(TransformOutcome::applied(&[names::FN], masked))
    }
}

// =============================================================================
// CO₂ flux units
// =============================================================================

/// Molar mass of CO₂ (g/mol).
const CO2_MOLAR_MASS: f64 = 44.0;

/// Convert `Fc` from mg/m²/s to µmol/m²/s as net ecosystem exchange, and
/// its negation as net ecosystem production.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConvertCo2Flux;

impl Transform for ConvertCo2Flux {
    fn name(&self) -> &'static str {
        "ConvertCo2Flux"
    }

    fn description(&self) -> &str {
        "NEE and NEP in umol/m2/s from Fc"
    }

    fn requires(&self) -> Vec<String> {
        owned(&[names::FC])
    }

    fn produces(&self) -> Vec<String> {
        owned(&[names::NEE, names::NEP])
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let nee = pointwise(ds, [names::FC], |[fc]| fc * 1000.0 / CO2_MOLAR_MASS)?;
        let nep: Vec<f64> = nee.iter().map(|x| -x).collect();
        let mut masked = 0;
        for (name, data, description) in [
            (names::NEE, nee, "Net ecosystem exchange"),
            (names::NEP, nep, "Net ecosystem production"),
        ] {
            masked += ds.create(
                NewSeries::new(name, data)
                    .with_inputs(&[names::FC])
                    .merge_input_flags()
                    .with_mask_code(FlagCode::DerivedMasked)
                    .with_units("umol/m2/s")
                    .with_description(description),
            )?;
        }
        Ok(TransformOutcome::applied(&[names::NEE, names::NEP], masked))
    }
}
