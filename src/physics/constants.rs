//! Physical constants for near-surface atmospheric and soil physics.
//!
//! # References
//!
//! - Stull (1988): An Introduction to Boundary Layer Meteorology.
//! - Campbell & Norman (1998): An Introduction to Environmental Biophysics.

/// Offset between °C and K.
pub const C_TO_K: f64 = 273.15;

/// Gravitational acceleration (m/s²).
pub const G: f64 = 9.81;

/// von Kármán constant.
pub const KARMAN: f64 = 0.4;

/// Gas constant for dry air (J/kg/K).
pub const RD: f64 = 287.04;

/// Gas constant for water vapour (J/kg/K).
pub const RV: f64 = 461.5;

/// Specific heat of dry air at constant pressure (J/kg/K).
pub const CPD: f64 = 1004.67;

/// Specific heat of water vapour at constant pressure (J/kg/K).
pub const CPV: f64 = 1875.0;

/// Ratio of molecular masses of water vapour and dry air.
pub const EPSILON: f64 = 0.622;

/// Ratio of molecular masses of dry air and water vapour, as used in the
/// WPL terms (`μ = Md/Mv`).
pub const MU: f64 = 1.61;

/// Latent heat of vaporisation at 0 °C (J/kg).
pub const LV_0: f64 = 2.501e6;

/// Temperature dependence of the latent heat of vaporisation (J/kg/K).
pub const LV_SLOPE: f64 = 2370.0;

// Soil heat capacity terms

/// Specific heat of dry mineral soil (J/kg/K).
pub const CD_SOIL: f64 = 840.0;

/// Specific heat of soil organic matter (J/kg/K).
pub const CO_SOIL: f64 = 1920.0;

/// Specific heat of liquid water (J/kg/K).
pub const CW: f64 = 4180.0;

/// Density of liquid water (kg/m³).
pub const RHO_WATER: f64 = 1000.0;
