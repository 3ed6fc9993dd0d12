//! Pipeline error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::io::SourceFileError;
use crate::series::DatasetError;

/// Run-aborting pipeline errors.
///
/// Missing inputs and masked samples are not errors: they are logged and
/// recorded in the flags. These variants cover structural problems only.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Structural dataset problem (length mismatch, bad time axis).
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Malformed control parameters.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A source file could not be loaded.
    #[error("Source error: {0}")]
    Source(#[from] SourceFileError),

    /// A transform requires a series that only a later transform produces.
    #[error("Transform '{transform}' requires '{series}', which is only produced later by '{producer}'")]
    OrderViolation {
        transform: String,
        series: String,
        producer: String,
    },

    /// No sample yielded a finite Obukhov length.
    #[error("Transform '{transform}' found no valid stability solution in the whole run")]
    NoValidStability { transform: String },

    /// A transform name that the registry does not know.
    #[error("Unknown transform '{name}'")]
    UnknownTransform { name: String },
}
