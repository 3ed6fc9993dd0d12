//! # fluxqc
//!
//! Quality control, physical correction and gap filling of eddy-covariance
//! flux tower data.
//!
//! A half-hourly [`Dataset`] moves through four processing levels:
//! - **L1**: raw observations
//! - **L2**: range, diurnal, diagnostic and exclusion checks; linear corrections
//! - **L3**: coordinate rotation, Massman spectral correction, flux assembly,
//!   WPL density correction, storage and available energy
//! - **L4**: gap filling from external, alternate-site, climatology and ratio
//!   sources, then interpolation of short gaps
//!
//! Every sample carries a [`FlagCode`]. Only good samples are ever modified,
//! so the first rejection reason recorded for a sample is the one kept.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, NaiveDate};
//! use fluxqc::config::{ControlConfig, GapFillConfig, RangeCheck, VariableConfig};
//! use fluxqc::gapfill::GapFillSources;
//! use fluxqc::{Dataset, FlagCode, FluxPipeline};
//!
//! let t0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let times = (0..4).map(|i| t0 + Duration::minutes(30 * i)).collect();
//! let l1 = Dataset::from_columns(times, 30, [("Fh".to_string(), vec![10.0, 900.0, 12.0, 11.0])]).unwrap();
//!
//! let config = ControlConfig::default()
//!     .with_variable(
//!         "Fh",
//!         VariableConfig::default()
//!             .with_range(RangeCheck::new(-200.0, 600.0))
//!             .with_gap_fill(GapFillConfig::default()),
//!     );
//! let run = FluxPipeline::new(config).unwrap().run(l1, &GapFillSources::new()).unwrap();
//!
//! assert_eq!(run.l2.series("Fh").unwrap().flag()[1], FlagCode::RangeL2);
//! assert_eq!(run.l4.series("Fh").unwrap().flag()[1], FlagCode::Interpolated);
//! ```

pub mod aggregate;
pub mod config;
pub mod corrections;
pub mod gapfill;
pub mod io;
pub mod physics;
pub mod pipeline;
pub mod qc;
pub mod series;
pub mod types;

// Re-export main types for convenience
pub use aggregate::DailySummary;
pub use config::{ConfigError, ControlConfig};
pub use gapfill::{GapFillReport, GapFillSources, MonthlyTable};
pub use io::{SourceCache, SourceFileError};
pub use pipeline::{
    FluxPipeline, Pipeline, PipelineError, PipelineRun, Transform, TransformKind, TransformOutcome,
};
pub use qc::QcReport;
pub use series::{Dataset, DatasetError, MISSING, Series};
pub use types::{FlagCode, ProcessingLevel};
