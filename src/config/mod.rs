//! Control parameters.
//!
//! The pipeline never parses a control file. Collaborators build a
//! [`ControlConfig`] directly, or deserialize it with any serde format, and
//! hand it to [`FluxPipeline`](crate::pipeline::FluxPipeline).
//!
//! Parameters that a transform cannot run without are `Option`s. A missing
//! one is reported as a [`ConfigError`] when the transform is resolved; the
//! transform is then skipped and the rest of the run continues.
//!
//! # Example
//!
//! ```
//! use fluxqc::config::{ControlConfig, RangeCheck, VariableConfig};
//!
//! let config = ControlConfig::default()
//!     .with_site("Howard Springs")
//!     .with_variable("Fe", VariableConfig::default().with_range(RangeCheck::new(-100.0, 600.0)));
//!
//! assert!(config.variables["Fe"].range.is_some());
//! ```

mod corrections;
mod levels;
mod variable;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::series::names;

pub use corrections::{
    Co2StorageConfig, DiagnosticConfig, InstrumentDiagnostic, MassmanConfig, MassmanParameters,
    SoilConfig, SoilParameters, SurfaceLayerConfig,
};
pub use levels::{
    DailyConfig, DailySeriesConfig, DailyStatistic, ExternalFluxConfig, L3Config, L4Config,
    RatioConfig, WplForm,
};
pub use variable::{
    AlternateSource, DateWindow, DiurnalCheck, GapFillConfig, HourWindow, LinearCorrection,
    LinearKind, PolynomialWindow, RangeCheck, VariableConfig, WindDirectionOffset,
};

/// Errors in the control parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A parameter required by a transform is absent.
    #[error("Missing parameter '{key}' in [{section}]")]
    MissingParameter { section: String, key: String },

    /// A parameter is present but unusable.
    #[error("Invalid parameter '{key}': {message}")]
    InvalidParameter { key: String, message: String },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::MissingParameter`].
    pub fn missing(section: &str, key: &str) -> Self {
        ConfigError::MissingParameter {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

/// Names of the meteorological inputs shared by several transforms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetInputs {
    /// Air temperature (°C).
    pub ta: String,
    /// Absolute humidity (g/m³).
    pub ah: String,
    /// Surface pressure (kPa).
    pub ps: String,
    /// CO₂ concentration (mg/m³).
    pub cc: String,
    /// Sonic virtual temperature (°C).
    pub tv: String,
}

impl Default for MetInputs {
    fn default() -> Self {
        Self {
            ta: names::TA.to_string(),
            ah: names::AH.to_string(),
            ps: names::PS.to_string(),
            cc: names::CC.to_string(),
            tv: names::TV.to_string(),
        }
    }
}

/// Complete set of control parameters for one site.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Site name written to the dataset attributes.
    pub site: String,
    /// Per-variable QC, correction and gap-fill settings.
    pub variables: BTreeMap<String, VariableConfig>,
    /// Meteorological input names.
    pub met: MetInputs,
    /// Instrument diagnostic checks.
    pub diagnostics: DiagnosticConfig,
    /// Massman spectral correction.
    pub massman: Option<MassmanConfig>,
    /// Soil heat storage.
    pub soil: Option<SoilConfig>,
    /// CO₂ storage.
    pub co2_storage: Option<Co2StorageConfig>,
    /// Roughness parameters for ustar from the sensible heat flux.
    pub surface_layer: Option<SurfaceLayerConfig>,
    /// Friction velocity threshold (m/s) for the ustar filter.
    pub ustar_threshold: Option<f64>,
    /// L3 transform chain.
    pub l3: L3Config,
    /// L4 gap filling.
    pub l4: L4Config,
}

impl ControlConfig {
    /// Set the site name.
    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = site.into();
        self
    }

    /// Add or replace the settings of one variable.
    pub fn with_variable(mut self, name: impl Into<String>, variable: VariableConfig) -> Self {
        self.variables.insert(name.into(), variable);
        self
    }

    /// Enable the Massman spectral correction.
    pub fn with_massman(mut self, massman: MassmanConfig) -> Self {
        self.massman = Some(massman);
        self
    }

    /// Enable the soil heat storage correction.
    pub fn with_soil(mut self, soil: SoilConfig) -> Self {
        self.soil = Some(soil);
        self
    }

    /// Enable the CO₂ storage correction.
    pub fn with_co2_storage(mut self, co2: Co2StorageConfig) -> Self {
        self.co2_storage = Some(co2);
        self
    }

    /// Set the surface-layer roughness parameters.
    pub fn with_surface_layer(mut self, surface_layer: SurfaceLayerConfig) -> Self {
        self.surface_layer = Some(surface_layer);
        self
    }

    /// Set the friction velocity threshold.
    pub fn with_ustar_threshold(mut self, threshold: f64) -> Self {
        self.ustar_threshold = Some(threshold);
        self
    }

    /// Replace the L3 settings.
    pub fn with_l3(mut self, l3: L3Config) -> Self {
        self.l3 = l3;
        self
    }

    /// Replace the L4 settings.
    pub fn with_l4(mut self, l4: L4Config) -> Self {
        self.l4 = l4;
        self
    }

    /// Check per-variable parameters for malformed values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, variable) in &self.variables {
            variable.validate(name)?;
        }
        if let Some(threshold) = self.ustar_threshold
            && !(threshold.is_finite() && threshold >= 0.0)
        {
            return Err(ConfigError::InvalidParameter {
                key: "ustar_threshold".to_string(),
                message: format!("must be a non-negative number, got {threshold}"),
            });
        }
        Ok(())
    }
}
