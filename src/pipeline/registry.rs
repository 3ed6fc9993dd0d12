//! Transform descriptors and their resolution against the control
//! parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ConfigError, ControlConfig, WindDirectionOffset};
use crate::corrections::{
    AbsoluteHumidity, AirTemperatureFromSonic, AvailableEnergy, AverageSeries, CalculateFluxes,
    Co2Storage, ConvertCo2Flux, CoordinateRotation, CorrectWindDirection, CovarianceSource,
    DensityCorrection, InvertSign, MergeSeries, MeteorologicalVariables, NetRadiation,
    SoilHeatStorage, SpectralCorrection, UstarFromHeatFlux, VirtualHeatFlux,
};
use crate::qc::{FluxGapCoordination, QcChecks, UstarFilter};

use super::error::PipelineError;
use super::traits::Transform;

/// One step of the L3 chain, as written in the control parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TransformKind {
    CorrectWindDirection { series: String, offsets: Vec<WindDirectionOffset> },
    InvertSign { series: String },
    MeteorologicalVariables,
    AirTemperatureFromSonic,
    AbsoluteHumidity,
    MergeSeries { destination: String, sources: Vec<String> },
    AverageSeries { destination: String, sources: Vec<String> },
    CoordinateRotation,
    SpectralCorrection,
    CalculateFluxes,
    VirtualHeatFlux,
    DensityCorrection,
    NetRadiation,
    ConvertCo2Flux,
    UstarFromHeatFlux,
    SoilHeatStorage,
    Co2Storage,
    AvailableEnergy,
    UstarFilter,
    QcChecks,
    FluxGapCoordination,
}

/// Descriptors that take no parameters, in declaration order.
const PARAMETERLESS: [TransformKind; 17] = [
    TransformKind::MeteorologicalVariables,
    TransformKind::AirTemperatureFromSonic,
    TransformKind::AbsoluteHumidity,
    TransformKind::CoordinateRotation,
    TransformKind::SpectralCorrection,
    TransformKind::CalculateFluxes,
    TransformKind::VirtualHeatFlux,
    TransformKind::DensityCorrection,
    TransformKind::NetRadiation,
    TransformKind::ConvertCo2Flux,
    TransformKind::UstarFromHeatFlux,
    TransformKind::SoilHeatStorage,
    TransformKind::Co2Storage,
    TransformKind::AvailableEnergy,
    TransformKind::UstarFilter,
    TransformKind::QcChecks,
    TransformKind::FluxGapCoordination,
];

impl TransformKind {
    /// The default L3 chain: derived meteorology, rotation, flux assembly,
    /// heat flux conversion, WPL, net radiation, storage, available energy,
    /// a QC pass and flux-gap coordination.
    pub fn standard_l3() -> Vec<TransformKind> {
        vec![
            TransformKind::MeteorologicalVariables,
            TransformKind::CoordinateRotation,
            TransformKind::CalculateFluxes,
            TransformKind::VirtualHeatFlux,
            TransformKind::DensityCorrection,
            TransformKind::NetRadiation,
            TransformKind::SoilHeatStorage,
            TransformKind::AvailableEnergy,
            TransformKind::QcChecks,
            TransformKind::FluxGapCoordination,
        ]
    }

    /// Registry name, matching the resolved transform's `name()`.
    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::CorrectWindDirection { .. } => "CorrectWindDirection",
            TransformKind::InvertSign { .. } => "InvertSign",
            TransformKind::MeteorologicalVariables => "MeteorologicalVariables",
            TransformKind::AirTemperatureFromSonic => "AirTemperatureFromSonic",
            TransformKind::AbsoluteHumidity => "AbsoluteHumidity",
            TransformKind::MergeSeries { .. } => "MergeSeries",
            TransformKind::AverageSeries { .. } => "AverageSeries",
            TransformKind::CoordinateRotation => "CoordinateRotation",
            TransformKind::SpectralCorrection => "SpectralCorrection",
            TransformKind::CalculateFluxes => "CalculateFluxes",
            TransformKind::VirtualHeatFlux => "VirtualHeatFlux",
            TransformKind::DensityCorrection => "DensityCorrection",
            TransformKind::NetRadiation => "NetRadiation",
            TransformKind::ConvertCo2Flux => "ConvertCo2Flux",
            TransformKind::UstarFromHeatFlux => "UstarFromHeatFlux",
            TransformKind::SoilHeatStorage => "SoilHeatStorage",
            TransformKind::Co2Storage => "Co2Storage",
            TransformKind::AvailableEnergy => "AvailableEnergy",
            TransformKind::UstarFilter => "UstarFilter",
            TransformKind::QcChecks => "QcChecks",
            TransformKind::FluxGapCoordination => "FluxGapCoordination",
        }
    }

    /// Build the transform for this descriptor.
    ///
    /// `source` selects which covariances the flux assembly and density
    /// correction read.
    ///
    /// # Errors
    /// A parameter the transform cannot run without is absent.
    pub fn resolve(
        &self,
        config: &ControlConfig,
        source: CovarianceSource,
    ) -> Result<Box<dyn Transform>, ConfigError> {
        let met = config.met.clone();
        let transform: Box<dyn Transform> = match self {
            TransformKind::CorrectWindDirection { series, offsets } => {
                Box::new(CorrectWindDirection::new(series.clone(), offsets.clone()))
            }
            TransformKind::InvertSign { series } => Box::new(InvertSign::new(series.clone())),
            TransformKind::MeteorologicalVariables => Box::new(MeteorologicalVariables::new(met)),
            TransformKind::AirTemperatureFromSonic => Box::new(AirTemperatureFromSonic::new(met)),
            TransformKind::AbsoluteHumidity => Box::new(AbsoluteHumidity::default()),
            TransformKind::MergeSeries {
                destination,
                sources,
            } => Box::new(MergeSeries::from_names(destination.clone(), sources.clone())),
            TransformKind::AverageSeries {
                destination,
                sources,
            } => Box::new(AverageSeries::from_names(destination.clone(), sources.clone())),
            TransformKind::CoordinateRotation => Box::new(CoordinateRotation),
            TransformKind::SpectralCorrection => {
                let massman = config
                    .massman
                    .as_ref()
                    .ok_or_else(|| ConfigError::missing("massman", "zmd"))?;
                Box::new(SpectralCorrection::new(massman.parameters()?, met))
            }
            TransformKind::CalculateFluxes => Box::new(CalculateFluxes::new(source)),
            TransformKind::VirtualHeatFlux => Box::new(VirtualHeatFlux::new(met)),
            TransformKind::DensityCorrection => {
                Box::new(DensityCorrection::new(config.l3.wpl_form, met, source))
            }
            TransformKind::NetRadiation => Box::new(NetRadiation),
            TransformKind::ConvertCo2Flux => Box::new(ConvertCo2Flux),
            TransformKind::UstarFromHeatFlux => {
                let surface = config
                    .surface_layer
                    .as_ref()
                    .ok_or_else(|| ConfigError::missing("surface_layer", "zmd"))?;
                Box::new(UstarFromHeatFlux::new(met, surface)?)
            }
            TransformKind::SoilHeatStorage => {
                let soil = config
                    .soil
                    .as_ref()
                    .ok_or_else(|| ConfigError::missing("soil", "depth"))?;
                Box::new(SoilHeatStorage::from_config(soil)?)
            }
            TransformKind::Co2Storage => {
                let co2 = config
                    .co2_storage
                    .as_ref()
                    .ok_or_else(|| ConfigError::missing("co2_storage", "zms"))?;
                Box::new(Co2Storage::from_config(co2, &config.met.cc)?)
            }
            TransformKind::AvailableEnergy => Box::new(AvailableEnergy),
            TransformKind::UstarFilter => {
                let threshold = config
                    .ustar_threshold
                    .ok_or_else(|| ConfigError::missing("ustar", "ustar_threshold"))?;
                Box::new(UstarFilter::new(threshold))
            }
            TransformKind::QcChecks => Box::new(QcChecks::new(config)),
            TransformKind::FluxGapCoordination => Box::new(FluxGapCoordination::default()),
        };
        Ok(transform)
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransformKind {
    type Err = PipelineError;

    /// Look up a parameterless descriptor by name. `MergeSeries`,
    /// `AverageSeries`, `CorrectWindDirection` and `InvertSign` need their
    /// parameters and cannot be named alone.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PARAMETERLESS
            .iter()
            .find(|kind| kind.name() == s)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownTransform { name: s.to_string() })
    }
}

/// Resolve a descriptor list into transforms.
///
/// If the list contains a spectral correction that resolves, the flux
/// assembly and density correction read the spectrally corrected
/// covariances. Descriptors whose parameters are missing are logged and
/// left out.
pub fn resolve_chain(kinds: &[TransformKind], config: &ControlConfig) -> Vec<Box<dyn Transform>> {
    let spectral = kinds.contains(&TransformKind::SpectralCorrection)
        && config
            .massman
            .as_ref()
            .is_some_and(|m| m.parameters().is_ok());
    let source = if spectral {
        CovarianceSource::SpectrallyCorrected
    } else {
        CovarianceSource::Rotated
    };
    debug!(?source, "covariance source selected");

    kinds
        .iter()
        .filter_map(|kind| match kind.resolve(config, source) {
            Ok(transform) => Some(transform),
            Err(e) => {
                warn!(transform = kind.name(), error = %e, "transform skipped");
                None
            }
        })
        .collect()
}
