//! Friction velocity filter.
//!
//! Under low turbulence the eddy covariance CO₂ flux underestimates the
//! surface exchange; those samples are rejected.

use crate::pipeline::{PipelineError, Transform, TransformOutcome};
use crate::series::{Dataset, DatasetError, names};
use crate::types::FlagCode;

/// Mask `Fc` where `ustar` is below a threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct UstarFilter {
    threshold: f64,
    ustar: String,
    target: String,
}

impl UstarFilter {
    /// Filter `Fc` on `ustar`.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            ustar: names::USTAR.to_string(),
            target: names::FC.to_string(),
        }
    }

    /// Filter a different series.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

impl Transform for UstarFilter {
    fn name(&self) -> &'static str {
        "UstarFilter"
    }

    fn description(&self) -> &str {
        "Reject fluxes under low turbulence"
    }

    fn requires(&self) -> Vec<String> {
        vec![self.ustar.clone(), self.target.clone()]
    }

    fn produces(&self) -> Vec<String> {
        vec![self.target.clone()]
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let ustar = ds.require(&self.ustar)?.masked();
        let target = ds
            .series_mut(&self.target)
            .ok_or_else(|| DatasetError::UnknownSeries {
                name: self.target.clone(),
            })?;

        let masked = ustar
            .iter()
            .enumerate()
            .filter(|(_, u)| **u < self.threshold)
            .filter(|(i, _)| target.mask(*i, FlagCode::UstarFiltered))
            .count();

        Ok(TransformOutcome::Applied {
            outputs: self.produces(),
            masked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MISSING;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_low_ustar_rejected() {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let times = (0..4).map(|i| t0 + Duration::minutes(30 * i)).collect();
        let mut ds = Dataset::from_columns(
            times,
            30,
            [
                ("ustar".to_string(), vec![0.05, 0.3, MISSING, 0.2]),
                ("Fc".to_string(), vec![0.2, -0.4, 0.1, -0.2]),
            ],
        )
        .unwrap();

        let outcome = UstarFilter::new(0.2).apply(&mut ds).unwrap();
        assert!(outcome.is_applied());
        let fc = ds.series("Fc").unwrap();
        assert_eq!(fc.flag()[0], FlagCode::UstarFiltered);
        assert!(fc.is_valid(1));
        // Missing ustar is not evidence of low turbulence
        assert!(fc.is_valid(2));
        // Threshold itself passes
        assert!(fc.is_valid(3));
    }
}
