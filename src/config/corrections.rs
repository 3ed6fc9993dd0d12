//! Instrument and site parameters for the physical corrections.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::series::names;
use crate::types::FlagCode;

// =============================================================================
// Massman spectral correction
// =============================================================================

/// Massman correction settings.
///
/// `zmd`, `angle`, `csat_arm` and `irga_arm` are site specific and have no
/// sensible default. The path lengths default to a CSAT3 sonic with an
/// open-path LI-7500.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MassmanConfig {
    /// Measurement height above displacement height (m).
    pub zmd: Option<f64>,
    /// Horizontal angle between sonic and gas analyser (degrees).
    pub angle: Option<f64>,
    /// Sonic arm length from the tower (m).
    pub csat_arm: Option<f64>,
    /// Gas analyser arm length from the tower (m).
    pub irga_arm: Option<f64>,
    /// Vertical sonic path length (m).
    pub lw_vert: f64,
    /// Horizontal sonic path length (m).
    pub lw_hor: f64,
    /// Sonic virtual temperature path length (m).
    pub l_tv: f64,
    /// Gas analyser path length (m).
    pub l_irga: f64,
    /// Block averaging period (s).
    pub averaging_period: f64,
}

impl Default for MassmanConfig {
    fn default() -> Self {
        Self {
            zmd: None,
            angle: None,
            csat_arm: None,
            irga_arm: None,
            lw_vert: 0.115,
            lw_hor: 0.058,
            l_tv: 0.115,
            l_irga: 0.125,
            averaging_period: 1800.0,
        }
    }
}

impl MassmanConfig {
    /// Settings with the site geometry filled in.
    pub fn new(zmd: f64, angle: f64, csat_arm: f64, irga_arm: f64) -> Self {
        Self {
            zmd: Some(zmd),
            angle: Some(angle),
            csat_arm: Some(csat_arm),
            irga_arm: Some(irga_arm),
            ..Default::default()
        }
    }

    /// Resolve into a complete parameter set.
    pub fn parameters(&self) -> Result<MassmanParameters, ConfigError> {
        let zmd = self.zmd.ok_or_else(|| ConfigError::missing("massman", "zmd"))?;
        let angle = self.angle.ok_or_else(|| ConfigError::missing("massman", "angle"))?;
        let csat_arm = self
            .csat_arm
            .ok_or_else(|| ConfigError::missing("massman", "csat_arm"))?;
        let irga_arm = self
            .irga_arm
            .ok_or_else(|| ConfigError::missing("massman", "irga_arm"))?;

        if zmd <= 0.0 || !zmd.is_finite() {
            return Err(ConfigError::InvalidParameter {
                key: "massman.zmd".to_string(),
                message: format!("must be positive, got {zmd}"),
            });
        }

        let angle_rad = angle.to_radians();
        Ok(MassmanParameters {
            zmd,
            l_lat: angle_rad.sin() * irga_arm,
            l_long: csat_arm - angle_rad.cos() * irga_arm,
            lw_vert: self.lw_vert,
            lw_hor: self.lw_hor,
            l_tv: self.l_tv,
            l_irga: self.l_irga,
            averaging_period: self.averaging_period,
        })
    }
}

/// Resolved Massman parameters, with the sensor separation split into
/// lateral and longitudinal components.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MassmanParameters {
    pub zmd: f64,
    pub l_lat: f64,
    pub l_long: f64,
    pub lw_vert: f64,
    pub lw_hor: f64,
    pub l_tv: f64,
    pub l_irga: f64,
    pub averaging_period: f64,
}

// =============================================================================
// Storage corrections
// =============================================================================

/// Soil heat storage settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilConfig {
    /// Ground heat flux plate series (corrected in place).
    pub fg: String,
    /// Soil temperature series (°C).
    pub ts: String,
    /// Soil water content probes (m³/m³); averaged when more than one.
    pub sws: Vec<String>,
    /// Depth of the heat flux plates (m).
    pub depth: Option<f64>,
    /// Soil bulk density (kg/m³).
    pub bulk_density: Option<f64>,
    /// Organic fraction (0-1).
    pub organic_content: Option<f64>,
    /// Soil water content used when no probe value is available (m³/m³).
    pub sws_default: Option<f64>,
}

impl Default for SoilConfig {
    fn default() -> Self {
        Self {
            fg: names::FG.to_string(),
            ts: names::TS.to_string(),
            sws: Vec::new(),
            depth: None,
            bulk_density: None,
            organic_content: None,
            sws_default: None,
        }
    }
}

impl SoilConfig {
    /// Settings with all soil properties given.
    pub fn new(depth: f64, bulk_density: f64, organic_content: f64, sws_default: f64) -> Self {
        Self {
            depth: Some(depth),
            bulk_density: Some(bulk_density),
            organic_content: Some(organic_content),
            sws_default: Some(sws_default),
            ..Default::default()
        }
    }

    /// Use soil water content probes.
    pub fn with_probes(mut self, probes: &[&str]) -> Self {
        self.sws = probes.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Resolve and clamp soil properties to their physical ranges.
    pub fn parameters(&self) -> Result<SoilParameters, ConfigError> {
        let depth = self.depth.ok_or_else(|| ConfigError::missing("soil", "depth"))?;
        let bulk_density = self
            .bulk_density
            .ok_or_else(|| ConfigError::missing("soil", "bulk_density"))?;
        let organic_content = self
            .organic_content
            .ok_or_else(|| ConfigError::missing("soil", "organic_content"))?;
        let sws_default = self
            .sws_default
            .ok_or_else(|| ConfigError::missing("soil", "sws_default"))?;

        Ok(SoilParameters {
            depth: depth.clamp(0.0, 0.5),
            bulk_density: bulk_density.clamp(1200.0, 2500.0),
            organic_content: organic_content.clamp(0.0, 1.0),
            sws_default: sws_default.clamp(0.0, 1.0),
        })
    }
}

/// Resolved, clamped soil properties.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoilParameters {
    pub depth: f64,
    pub bulk_density: f64,
    pub organic_content: f64,
    pub sws_default: f64,
}

/// CO₂ storage settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Co2StorageConfig {
    /// Height of the CO₂ measurement (m).
    pub zms: Option<f64>,
    /// CO₂ flux series corrected in place.
    pub fc: String,
}

impl Default for Co2StorageConfig {
    fn default() -> Self {
        Self {
            zms: None,
            fc: names::FC.to_string(),
        }
    }
}

impl Co2StorageConfig {
    pub fn new(zms: f64) -> Self {
        Self {
            zms: Some(zms),
            ..Default::default()
        }
    }
}

// =============================================================================
// Surface layer
// =============================================================================

/// Site roughness used to derive ustar from the sensible heat flux.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceLayerConfig {
    /// Measurement height above displacement height (m).
    pub zmd: Option<f64>,
    /// Momentum roughness length (m).
    pub z0: Option<f64>,
    /// Mean horizontal wind speed series (m/s).
    pub wind_speed: String,
}

impl Default for SurfaceLayerConfig {
    fn default() -> Self {
        Self {
            zmd: None,
            z0: None,
            wind_speed: names::U.to_string(),
        }
    }
}

impl SurfaceLayerConfig {
    pub fn new(zmd: f64, z0: f64) -> Self {
        Self {
            zmd: Some(zmd),
            z0: Some(z0),
            ..Default::default()
        }
    }

    /// Read the wind speed from a different series.
    pub fn with_wind_speed(mut self, wind_speed: impl Into<String>) -> Self {
        self.wind_speed = wind_speed.into();
        self
    }

    /// Resolve `(zmd, z0)`, requiring `0 < z0 < zmd`.
    pub fn parameters(&self) -> Result<(f64, f64), ConfigError> {
        let zmd = self
            .zmd
            .ok_or_else(|| ConfigError::missing("surface_layer", "zmd"))?;
        let z0 = self
            .z0
            .ok_or_else(|| ConfigError::missing("surface_layer", "z0"))?;
        if !(z0 > 0.0 && zmd > z0 && zmd.is_finite()) {
            return Err(ConfigError::InvalidParameter {
                key: "surface_layer".to_string(),
                message: format!("need 0 < z0 < zmd, got z0 = {z0}, zmd = {zmd}"),
            });
        }
        Ok((zmd, z0))
    }
}

// =============================================================================
// Instrument diagnostics
// =============================================================================

/// Diagnostic check for one instrument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentDiagnostic {
    /// Self-diagnostic series; non-zero means the sample is suspect.
    pub diagnostic: String,
    /// Further series whose bad flags count as a diagnostic failure.
    #[serde(default)]
    pub extra: Vec<String>,
    /// Series whose flags stand in for the diagnostic when it is absent.
    #[serde(default)]
    pub fallback: Vec<String>,
    /// Series invalidated when the combined diagnostic fails.
    pub variables: Vec<String>,
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl InstrumentDiagnostic {
    /// CSAT3 sonic anemometer.
    pub fn sonic() -> Self {
        Self {
            diagnostic: names::DIAG_CSAT.to_string(),
            extra: Vec::new(),
            fallback: strings(&[names::UX, names::UY, names::UZ, names::TV]),
            variables: strings(&[
                names::UX,
                names::UY,
                names::UZ,
                "Ws_CSAT",
                "Wd_CSAT",
                names::TV,
                names::UZT,
                names::UXT,
                names::UYT,
                names::UZA,
                names::UXA,
                names::UYA,
                names::UZC,
                names::UXC,
                names::UYC,
                names::UXUZ,
                names::UYUZ,
                names::UXUY,
                names::UXUX,
                names::UYUY,
            ]),
        }
    }

    /// LI-7500 open-path gas analyser.
    pub fn irga() -> Self {
        Self {
            diagnostic: names::DIAG_IRGA.to_string(),
            extra: strings(&[names::AGC_IRGA, names::AH_IRGA_SD, names::CC_IRGA_SD]),
            fallback: strings(&[names::AH_IRGA, names::CC_IRGA]),
            variables: strings(&[
                names::AH_IRGA,
                names::CC_IRGA,
                "AhAh",
                "CcCc",
                names::UZA,
                names::UXA,
                names::UYA,
                names::UZC,
                names::UXC,
                names::UYC,
            ]),
        }
    }
}

/// Diagnostic checks run at L2.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticConfig {
    pub sonic: Option<InstrumentDiagnostic>,
    pub irga: Option<InstrumentDiagnostic>,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            sonic: Some(InstrumentDiagnostic::sonic()),
            irga: Some(InstrumentDiagnostic::irga()),
        }
    }
}

impl DiagnosticConfig {
    /// No diagnostic checks.
    pub fn disabled() -> Self {
        Self {
            sonic: None,
            irga: None,
        }
    }

    /// Configured instruments with their failure codes.
    pub fn instruments(&self) -> impl Iterator<Item = (&InstrumentDiagnostic, FlagCode)> {
        self.sonic
            .iter()
            .map(|d| (d, FlagCode::SonicDiagnostic))
            .chain(self.irga.iter().map(|d| (d, FlagCode::IrgaDiagnostic)))
    }
}
