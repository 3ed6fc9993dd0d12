//! Moist-air thermodynamics and surface-layer scaling.
//!
//! Point functions used by the derived-variable, spectral and density
//! corrections. All functions take plain `f64` and return `NaN` for
//! physically meaningless inputs so that masking happens downstream.
//!
//! # Units
//!
//! - Temperature: °C
//! - Absolute humidity: g/m³
//! - Pressure: kPa
//! - Densities: kg/m³
//! - Heat capacities: J/kg/K
//!
//! # Example
//!
//! ```
//! use fluxqc::physics::meteorology::{dry_air_density, latent_heat, vapour_pressure};
//!
//! let e = vapour_pressure(10.0, 20.0);
//! assert!((e - 1.353).abs() < 1e-3);
//! let rhod = dry_air_density(20.0, 10.0, 101.325);
//! assert!(rhod > 1.1 && rhod < 1.2);
//! assert!((latent_heat(20.0) - 2.4536e6).abs() < 1.0);
//! ```

use std::f64::consts::FRAC_PI_2;

use super::constants::{C_TO_K, CPD, CPV, EPSILON, G, KARMAN, LV_0, LV_SLOPE, RD, RV};

/// Vapour pressure (kPa) from absolute humidity and temperature.
#[inline]
pub fn vapour_pressure(ah: f64, ta: f64) -> f64 {
    (ah / 1000.0) * RV * (ta + C_TO_K) / 1000.0
}

/// Saturation vapour pressure over water (kPa), Tetens form.
#[inline]
pub fn saturation_vapour_pressure(ta: f64) -> f64 {
    0.6106 * (17.27 * ta / (ta + 237.3)).exp()
}

/// Dry air partial density (kg/m³).
#[inline]
pub fn dry_air_density(ta: f64, ah: f64, ps: f64) -> f64 {
    let e = vapour_pressure(ah, ta);
    1000.0 * (ps - e) / (RD * (ta + C_TO_K))
}

/// Moist air density (kg/m³): dry air plus water vapour.
#[inline]
pub fn moist_air_density(ta: f64, ah: f64, ps: f64) -> f64 {
    dry_air_density(ta, ah, ps) + ah / 1000.0
}

/// Latent heat of vaporisation (J/kg).
#[inline]
pub fn latent_heat(ta: f64) -> f64 {
    LV_0 - LV_SLOPE * ta
}

/// Water vapour mixing ratio (kg/kg).
#[inline]
pub fn mixing_ratio(ta: f64, ah: f64, ps: f64) -> f64 {
    let e = vapour_pressure(ah, ta);
    EPSILON * e / (ps - e)
}

/// Specific humidity (kg/kg).
#[inline]
pub fn specific_humidity(ta: f64, ah: f64, ps: f64) -> f64 {
    let mr = mixing_ratio(ta, ah, ps);
    mr / (1.0 + mr)
}

/// Specific heat of moist air (J/kg/K).
#[inline]
pub fn moist_specific_heat(ta: f64, ah: f64, ps: f64) -> f64 {
    let q = specific_humidity(ta, ah, ps);
    (1.0 - q) * CPD + q * CPV
}

/// Vapour pressure deficit (kPa).
#[inline]
pub fn vapour_pressure_deficit(ta: f64, ah: f64) -> f64 {
    saturation_vapour_pressure(ta) - vapour_pressure(ah, ta)
}

/// Air temperature (°C) from sonic virtual temperature (°C).
#[inline]
pub fn temperature_from_virtual(tv: f64, q: f64) -> f64 {
    (tv + C_TO_K) / (1.0 + 0.61 * q) - C_TO_K
}

/// Friction velocity from the two momentum covariances.
///
/// `u* = (uw² + vw²)^¼`
#[inline]
pub fn friction_velocity(uw: f64, vw: f64) -> f64 {
    (uw * uw + vw * vw).sqrt().sqrt()
}

/// Obukhov length (m).
///
/// `L = −Tv·u*³ / (k·g·w'T')` with `Tv` the virtual temperature in K.
/// Returns `NaN` when the heat flux covariance is zero.
pub fn obukhov_length(ta: f64, ah: f64, ps: f64, ustar: f64, wt: f64) -> f64 {
    let q = specific_humidity(ta, ah, ps);
    let tv = (ta + C_TO_K) * (1.0 + 0.61 * q);
    let l = -tv * ustar.powi(3) / (KARMAN * G * wt);
    if l.is_finite() { l } else { f64::NAN }
}

/// Absolute humidity (g/m³) from vapour pressure (kPa) and temperature.
///
/// Inverse of [`vapour_pressure`].
#[inline]
pub fn absolute_humidity(e: f64, ta: f64) -> f64 {
    e * 1.0e6 / (RV * (ta + C_TO_K))
}

// =============================================================================
// Surface-layer similarity
// =============================================================================

/// Integrated Businger-Dyer stability function for momentum at `zeta = z/L`.
pub fn psi_momentum(zeta: f64) -> f64 {
    if zeta < 0.0 {
        let x = (1.0 - 16.0 * zeta).powf(0.25);
        2.0 * ((1.0 + x) / 2.0).ln() + ((1.0 + x * x) / 2.0).ln() - 2.0 * x.atan() + FRAC_PI_2
    } else {
        -5.0 * zeta
    }
}

/// Friction velocity from the log-wind profile at stability `zeta`.
///
/// `u* = k·u / (ln(z/z0) − ψm(ζ) + ψm(ζ·z0/z))`, `NaN` when the profile
/// has no positive solution.
pub fn log_profile_ustar(u: f64, zmd: f64, z0: f64, zeta: f64) -> f64 {
    let denominator = (zmd / z0).ln() - psi_momentum(zeta) + psi_momentum(zeta * z0 / zmd);
    let ustar = KARMAN * u / denominator;
    if ustar.is_finite() && ustar > 0.0 { ustar } else { f64::NAN }
}

/// Stability parameter `ζ = z/L` implied by a sensible heat flux (W/m²).
///
/// `L = −ρm·Cpm·Tv·u*³ / (k·g·Fh)`; written as `z/L` so that a zero heat
/// flux gives neutral stability rather than an infinite length.
pub fn stability_parameter(ta: f64, ah: f64, ps: f64, fh: f64, ustar: f64, zmd: f64) -> f64 {
    let q = specific_humidity(ta, ah, ps);
    let tv = (ta + C_TO_K) * (1.0 + 0.61 * q);
    let rho_cp = moist_air_density(ta, ah, ps) * moist_specific_heat(ta, ah, ps);
    -zmd * KARMAN * G * fh / (rho_cp * tv * ustar.powi(3))
}

const WEGSTEIN_MAX_ITERATIONS: usize = 50;
const WEGSTEIN_TOLERANCE: f64 = 1e-8;
const ZETA_LIMITS: (f64, f64) = (-10.0, 10.0);

/// Friction velocity (m/s) from sensible heat flux and mean wind speed.
///
/// Solves `ζ = z/L(u*(ζ))` for the stability parameter with Wegstein's
/// accelerated fixed-point iteration, starting from neutral, and returns
/// the log-profile `u*` at the solution. Returns `NaN` when the inputs are
/// unusable or the iteration does not settle, e.g. when turbulence
/// collapses under strong stable stratification.
pub fn ustar_from_heat_flux(
    ta: f64,
    ah: f64,
    ps: f64,
    fh: f64,
    u: f64,
    zmd: f64,
    z0: f64,
) -> f64 {
    if !(u > 0.0 && z0 > 0.0 && zmd > z0) || [ta, ah, ps, fh].iter().any(|v| !v.is_finite()) {
        return f64::NAN;
    }
    let g = |zeta: f64| {
        let ustar = log_profile_ustar(u, zmd, z0, zeta);
        stability_parameter(ta, ah, ps, fh, ustar, zmd)
    };

    let (lo, hi) = ZETA_LIMITS;
    let (mut x0, mut g0) = (0.0, g(0.0));
    let mut x1 = g0.clamp(lo, hi);
    for _ in 0..WEGSTEIN_MAX_ITERATIONS {
        let g1 = g(x1);
        if !g1.is_finite() {
            return f64::NAN;
        }
        if (g1 - x1).abs() < WEGSTEIN_TOLERANCE {
            return log_profile_ustar(u, zmd, z0, x1);
        }
        let slope = if x1 != x0 { (g1 - g0) / (x1 - x0) } else { 0.0 };
        let x2 = if (slope - 1.0).abs() > f64::EPSILON {
            let w = slope / (slope - 1.0);
            w * x1 + (1.0 - w) * g1
        } else {
            g1
        };
        (x0, g0) = (x1, g1);
        x1 = x2.clamp(lo, hi);
    }
    f64::NAN
}
