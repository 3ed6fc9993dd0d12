//! Atmospheric and soil physics shared by the corrections.
//!
//! - [`constants`]: gas constants, specific heats, soil heat capacities
//! - [`meteorology`]: moist-air point functions and surface-layer scaling

pub mod constants;
pub mod meteorology;

pub use meteorology::{
    dry_air_density, friction_velocity, latent_heat, moist_air_density, moist_specific_heat,
    obukhov_length, specific_humidity, vapour_pressure,
};
