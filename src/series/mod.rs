//! Series and dataset model.
//!
//! A [`Series`] is one named variable with three parallel parts: `data`
//! (with [`MISSING`] as the no-data sentinel), a per-sample [`FlagCode`]
//! and descriptive attributes. A [`Dataset`] holds the series of one
//! processing level on a shared fixed-interval time axis.
//!
//! [`FlagCode`]: crate::types::FlagCode

mod data;
mod dataset;
pub mod names;

pub use data::{MISSING, Series, SeriesAttributes, is_missing};
pub use dataset::{Dataset, DatasetError, GlobalAttributes, NewSeries, SeriesView};
