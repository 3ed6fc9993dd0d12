//! Physical corrections applied at L2 and L3.
//!
//! - [`adjust`]: wind direction bearing offsets, sign inversion
//! - [`rotation`]: two-step coordinate rotation of wind and covariances
//! - [`massman`]: two-pass Massman spectral correction
//! - [`fluxes`]: covariance to flux assembly, virtual heat flux conversion,
//!   net radiation, CO₂ flux as NEE and NEP
//! - [`wpl`]: Webb-Pearman-Leuning density correction
//! - [`storage`]: soil heat and CO₂ storage, available energy
//! - [`met`]: derived meteorological variables, air temperature from sonic,
//!   absolute humidity from a humidity probe
//! - [`surface`]: friction velocity from surface-layer similarity
//! - [`linear`]: linear and drift corrections of raw series
//! - [`merge`]: merging and averaging of redundant series
//!
//! Every L3 correction is a [`Transform`](crate::pipeline::Transform). New
//! series go through [`Dataset::create`] with merged input flags, so a value
//! is masked with the transform's own reason code only when its inputs were
//! good.

pub mod adjust;
pub mod fluxes;
pub mod linear;
pub mod massman;
pub mod merge;
pub mod met;
pub mod rotation;
pub mod storage;
pub mod surface;
pub mod wpl;

pub use adjust::{CorrectWindDirection, InvertSign};
pub use fluxes::{CalculateFluxes, ConvertCo2Flux, CovarianceSource, NetRadiation, VirtualHeatFlux};
pub use linear::apply_linear_corrections;
pub use massman::{SpectralCorrection, transfer_function};
pub use merge::{AverageSeries, MergeSeries};
pub use met::{AbsoluteHumidity, AirTemperatureFromSonic, MeteorologicalVariables};
pub use rotation::{CoordinateRotation, RotationMatrix};
pub use storage::{AvailableEnergy, Co2Storage, SoilHeatStorage};
pub use surface::UstarFromHeatFlux;
pub use wpl::{DensityCorrection, wpl_co2_flux, wpl_latent_flux};

use crate::series::{Dataset, DatasetError};

/// Evaluate `f` sample by sample over the masked views of `inputs`.
///
/// Missing samples reach `f` as `NaN`.
pub(crate) fn pointwise<const K: usize>(
    ds: &Dataset,
    inputs: [&str; K],
    f: impl Fn([f64; K]) -> f64,
) -> Result<Vec<f64>, DatasetError> {
    let mut columns = Vec::with_capacity(K);
    for name in inputs {
        columns.push(ds.require(name)?.masked());
    }
    Ok((0..ds.len())
        .map(|i| f(std::array::from_fn(|k| columns[k][i])))
        .collect())
}
