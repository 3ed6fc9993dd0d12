//! Transform trait.
//!
//! Every step of the L3 chain is a [`Transform`]: a named operation with a
//! declared set of required and produced series. The declarations drive the
//! static order validation in [`Pipeline`](super::Pipeline) and the
//! missing-input skip at run time.

use crate::series::Dataset;

use super::error::PipelineError;

// =============================================================================
// TransformOutcome
// =============================================================================

/// What a transform did to the dataset.
#[derive(Clone, Debug, PartialEq)]
pub enum TransformOutcome {
    /// Outputs were written.
    Applied {
        /// Series created or updated.
        outputs: Vec<String>,
        /// Samples newly masked by this transform.
        masked: usize,
    },
    /// Nothing was written.
    Skipped {
        /// Why the transform did not run.
        reason: String,
    },
}

impl TransformOutcome {
    /// Applied outcome.
    pub fn applied(outputs: &[&str], masked: usize) -> Self {
        TransformOutcome::Applied {
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            masked,
        }
    }

    /// Skipped outcome.
    pub fn skipped(reason: impl Into<String>) -> Self {
        TransformOutcome::Skipped {
            reason: reason.into(),
        }
    }

    /// True if outputs were written.
    pub fn is_applied(&self) -> bool {
        matches!(self, TransformOutcome::Applied { .. })
    }
}

// =============================================================================
// Transform Trait
// =============================================================================

/// A named dataset transform.
///
/// Implementations may assume every series in [`requires`](Self::requires)
/// is present when [`apply`](Self::apply) is called; the runner skips the
/// transform otherwise. Optional inputs are looked up inside `apply`.
pub trait Transform {
    /// Identifier used in logs and the dataset audit trail.
    fn name(&self) -> &'static str;

    /// Short description.
    fn description(&self) -> &str;

    /// Series that must exist before the transform can run.
    fn requires(&self) -> Vec<String>;

    /// Series the transform creates or updates.
    fn produces(&self) -> Vec<String>;

    /// Apply the transform to `ds` in place.
    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError>;

    /// Required series absent from `ds`.
    fn missing_inputs(&self, ds: &Dataset) -> Vec<String> {
        self.requires()
            .into_iter()
            .filter(|name| !ds.contains(name))
            .collect()
    }
}

/// Turn a list of `&str` into owned names.
pub(crate) fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
