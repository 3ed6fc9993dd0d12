//! Two-pass Massman frequency-response correction.
//!
//! Finite sensor path lengths, the sonic/gas-analyser separation and block
//! averaging all remove covariance at high and low frequencies. Following
//! Massman (2000, 2001) the attenuation factor for a covariance is
//!
//! ```text
//! r = (b^α / (b^α + 1)) · (b^α / (b^α + p^α)) · (1 / (p^α + 1))
//! b = 2π·fx·τ_b          (block averaging, τ_b = T_b / 2.8)
//! p = 2π·fx·τ_e          (path averaging and separation)
//! fx = nx·u / z
//! ```
//!
//! with stability-dependent spectral peak `nx` and shape `α`:
//!
//! | Regime         | nx (momentum)            | nx (scalar)             | α     |
//! |----------------|--------------------------|-------------------------|-------|
//! | z/L ≤ 0        | 0.079                    | 0.085                   | 0.925 |
//! | z/L > 0        | 0.079·(1 + 7.9 z/L)^0.75 | 2.0 − 1.915/(1 + 0.5 z/L) | 1     |
//!
//! The stability parameter itself depends on the corrected covariances, so
//! the correction is applied twice: once to estimate `u*` and `L`, then again
//! from those estimates to the raw covariances.
//!
//! # References
//!
//! - Massman (2000): A simple method for estimating frequency response
//!   corrections for eddy covariance systems. Agric. For. Meteorol. 104.
//! - Massman (2001): Reply to comment by Rannik. Agric. For. Meteorol. 107.

use std::f64::consts::PI;

use tracing::{debug, warn};

use crate::config::{MassmanParameters, MetInputs};
use crate::physics::meteorology::{friction_velocity, obukhov_length};
use crate::pipeline::traits::owned;
use crate::pipeline::{PipelineError, Transform, TransformOutcome};
use crate::series::{Dataset, NewSeries, names};
use crate::types::FlagCode;

// =============================================================================
// Transfer functions
// =============================================================================

/// Spectral coefficients for one stability regime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StabilityCoefficients {
    pub nx_momentum: f64,
    pub nx_scalar: f64,
    pub alpha: f64,
}

/// Spectral coefficients at stability parameter `zol = z/L`.
///
/// Returns `None` for a non-finite `zol`.
pub fn stability_coefficients(zol: f64) -> Option<StabilityCoefficients> {
    if !zol.is_finite() {
        return None;
    }
    Some(if zol > 0.0 {
        StabilityCoefficients {
            nx_momentum: 0.079 * (1.0 + 7.9 * zol).powf(0.75),
            nx_scalar: 2.0 - 1.915 / (1.0 + 0.5 * zol),
            alpha: 1.0,
        }
    } else {
        StabilityCoefficients {
            nx_momentum: 0.079,
            nx_scalar: 0.085,
            alpha: 0.925,
        }
    })
}

/// Massman transfer function (fraction of covariance retained).
#[inline]
pub fn transfer_function(b: f64, p: f64, alpha: f64) -> f64 {
    let ba = b.powf(alpha);
    let pa = p.powf(alpha);
    (ba / (ba + 1.0)) * (ba / (ba + pa)) * (1.0 / (pa + 1.0))
}

/// Attenuation factors for one sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attenuation {
    /// Momentum covariances.
    pub momentum: f64,
    /// Sonic temperature covariance.
    pub heat: f64,
    /// Gas analyser covariances (H₂O, CO₂).
    pub gas: f64,
}

impl Attenuation {
    const INVALID: Attenuation = Attenuation {
        momentum: f64::NAN,
        heat: f64::NAN,
        gas: f64::NAN,
    };
}

/// Attenuation factors at mean wind speed `u` and stability `zol`.
///
/// Zero, negative or missing wind speed gives `NaN` factors.
pub fn attenuation(params: &MassmanParameters, u: f64, zol: f64) -> Attenuation {
    let Some(coef) = stability_coefficients(zol) else {
        return Attenuation::INVALID;
    };
    if !(u.is_finite() && u > 0.0) {
        return Attenuation::INVALID;
    }

    let tau_momentum = (params.lw_vert / (5.7 * u)).powi(2) + (params.lw_hor / (2.8 * u)).powi(2);
    let tau_heat = (params.lw_vert / (8.4 * u)).powi(2) + (params.l_tv / (4.0 * u)).powi(2);
    let tau_gas = (params.lw_vert / (8.4 * u)).powi(2)
        + (params.l_irga / (4.0 * u)).powi(2)
        + (params.l_lat / (1.1 * u)).powi(2)
        + (params.l_long / (1.05 * u)).powi(2);
    let tau_b = params.averaging_period / 2.8;

    let fx_momentum = coef.nx_momentum * u / params.zmd;
    let fx_scalar = coef.nx_scalar * u / params.zmd;

    let b_momentum = 2.0 * PI * fx_momentum * tau_b;
    let b_scalar = 2.0 * PI * fx_scalar * tau_b;

    Attenuation {
        momentum: transfer_function(b_momentum, 2.0 * PI * fx_momentum * tau_momentum, coef.alpha),
        heat: transfer_function(b_scalar, 2.0 * PI * fx_scalar * tau_heat, coef.alpha),
        gas: transfer_function(b_scalar, 2.0 * PI * fx_scalar * tau_gas, coef.alpha),
    }
}

// =============================================================================
// Two-pass correction for one sample
// =============================================================================

/// Raw inputs for one sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralInput {
    pub u: f64,
    pub uw: f64,
    pub vw: f64,
    pub wt: f64,
    pub wa: f64,
    pub wc: f64,
    pub ta: f64,
    pub ah: f64,
    pub ps: f64,
}

/// Corrected covariances, friction velocity and Obukhov length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralOutput {
    pub uw: f64,
    pub vw: f64,
    pub wt: f64,
    pub wa: f64,
    pub wc: f64,
    pub ustar: f64,
    pub obukhov: f64,
}

/// Apply both passes of the correction to one sample.
pub fn correct_sample(params: &MassmanParameters, x: &SpectralInput) -> SpectralOutput {
    let stability = |ustar: f64, wt: f64| params.zmd / obukhov_length(x.ta, x.ah, x.ps, ustar, wt);

    // Pass 1: momentum and heat only
    let zol = stability(friction_velocity(x.uw, x.vw), x.wt);
    let a1 = attenuation(params, x.u, zol);
    let uw1 = x.uw / a1.momentum;
    let vw1 = x.vw / a1.momentum;
    let wt1 = x.wt / a1.heat;

    // Pass 2: everything, from the raw covariances
    let zol = stability(friction_velocity(uw1, vw1), wt1);
    let a2 = attenuation(params, x.u, zol);
    let uw = x.uw / a2.momentum;
    let vw = x.vw / a2.momentum;
    let wt = x.wt / a2.heat;

    let ustar = friction_velocity(uw, vw);
    SpectralOutput {
        uw,
        vw,
        wt,
        wa: x.wa / a2.gas,
        wc: x.wc / a2.gas,
        ustar,
        obukhov: obukhov_length(x.ta, x.ah, x.ps, ustar, wt),
    }
}

// =============================================================================
// Transform
// =============================================================================

/// Massman spectral correction of the rotated covariances.
#[derive(Clone, Debug)]
pub struct SpectralCorrection {
    params: MassmanParameters,
    met: MetInputs,
}

impl SpectralCorrection {
    pub fn new(params: MassmanParameters, met: MetInputs) -> Self {
        Self { params, met }
    }

    fn base_inputs(&self) -> [&str; 7] {
        [
            names::U,
            names::UW,
            names::VW,
            names::WT,
            &self.met.ta,
            &self.met.ah,
            &self.met.ps,
        ]
    }
}

impl Transform for SpectralCorrection {
    fn name(&self) -> &'static str {
        "SpectralCorrection"
    }

    fn description(&self) -> &str {
        "Two-pass Massman frequency response correction"
    }

    fn requires(&self) -> Vec<String> {
        owned(&self.base_inputs())
    }

    fn produces(&self) -> Vec<String> {
        owned(&[
            names::UW_M,
            names::VW_M,
            names::WT_M,
            names::WA_M,
            names::WC_M,
            names::USTAR_M,
            names::L_M,
        ])
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let base = self.base_inputs();
        let column = |name: &str| match ds.series(name) {
            Some(s) => s.masked(),
            None => vec![f64::NAN; ds.len()],
        };
        let [u, uw, vw, wt, ta, ah, ps] = base.map(&column);
        let has_wa = ds.contains(names::WA);
        let has_wc = ds.contains(names::WC);
        let wa = column(names::WA);
        let wc = column(names::WC);

        let out: Vec<SpectralOutput> = (0..ds.len())
            .map(|i| {
                correct_sample(
                    &self.params,
                    &SpectralInput {
                        u: u[i],
                        uw: uw[i],
                        vw: vw[i],
                        wt: wt[i],
                        wa: wa[i],
                        wc: wc[i],
                        ta: ta[i],
                        ah: ah[i],
                        ps: ps[i],
                    },
                )
            })
            .collect();

        // A run where every sample with good inputs failed to find a
        // stability solution cannot be corrected at all.
        let inputs_good = ds.merged_flags(&owned(&base));
        let any_good = inputs_good.iter().any(|f| f.is_good());
        let any_stable = out.iter().any(|o| o.obukhov.is_finite());
        if any_good && !any_stable {
            return Err(PipelineError::NoValidStability {
                transform: self.name().to_string(),
            });
        }

        let mut masked = 0;
        let mut outputs = Vec::new();
        let mut write = |ds: &mut Dataset,
                         name: &'static str,
                         data: Vec<f64>,
                         extra: Option<&str>,
                         units: &str|
         -> Result<(), PipelineError> {
            let mut inputs: Vec<&str> = base.to_vec();
            inputs.extend(extra);
            masked += ds.create(
                NewSeries::new(name, data)
                    .with_inputs(&inputs)
                    .merge_input_flags()
                    .with_mask_code(FlagCode::SpectralMasked)
                    .with_units(units)
                    .with_description("Massman frequency response corrected"),
            )?;
            outputs.push(name);
            Ok(())
        };

        write(ds, names::UW_M, out.iter().map(|o| o.uw).collect(), None, "m2/s2")?;
        write(ds, names::VW_M, out.iter().map(|o| o.vw).collect(), None, "m2/s2")?;
        write(ds, names::WT_M, out.iter().map(|o| o.wt).collect(), None, "K m/s")?;
        write(ds, names::USTAR_M, out.iter().map(|o| o.ustar).collect(), None, "m/s")?;
        write(ds, names::L_M, out.iter().map(|o| o.obukhov).collect(), None, "m")?;
        if has_wa {
            write(ds, names::WA_M, out.iter().map(|o| o.wa).collect(), Some(names::WA), "g/m2/s")?;
        } else {
            warn!(series = names::WA_M, missing = names::WA, "humidity covariance not corrected");
        }
        if has_wc {
            write(ds, names::WC_M, out.iter().map(|o| o.wc).collect(), Some(names::WC), "mg/m2/s")?;
        } else {
            warn!(series = names::WC_M, missing = names::WC, "CO2 covariance not corrected");
        }

        debug!(masked, "spectral correction complete");
        Ok(TransformOutcome::applied(&outputs, masked))
    }
}
