//! Transform chain and level runner.
//!
//! - [`Transform`]: one named step with declared inputs and outputs
//! - [`TransformKind`]: serializable descriptor resolved against the
//!   control parameters
//! - [`Pipeline`]: ordered chain with static order validation
//! - [`FluxPipeline`]: L1 → L4 runner producing a [`PipelineRun`]

mod chain;
mod error;
mod registry;
mod runner;
pub mod traits;

pub use chain::{Pipeline, TransformRecord};
pub use error::PipelineError;
pub use registry::{TransformKind, resolve_chain};
pub use runner::{FluxPipeline, PipelineRun, RunReport};
pub use traits::{Transform, TransformOutcome};
