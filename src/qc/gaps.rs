//! Flux-gap coordination.
//!
//! Energy balance and ratio gap filling assume the turbulent fluxes describe
//! the same half hours, so wherever one of them is missing the others are
//! rejected too.

use tracing::debug;

use crate::pipeline::traits::owned;
use crate::pipeline::{PipelineError, Transform, TransformOutcome};
use crate::series::{Dataset, names};
use crate::types::FlagCode;

/// Mask every flux where any of the coordinated fluxes is missing.
#[derive(Clone, Debug, PartialEq)]
pub struct FluxGapCoordination {
    fluxes: Vec<String>,
}

impl Default for FluxGapCoordination {
    fn default() -> Self {
        Self {
            fluxes: owned(&[names::FE, names::FH, names::FC]),
        }
    }
}

impl FluxGapCoordination {
    pub fn new(fluxes: &[&str]) -> Self {
        Self {
            fluxes: owned(fluxes),
        }
    }
}

impl Transform for FluxGapCoordination {
    fn name(&self) -> &'static str {
        "FluxGapCoordination"
    }

    fn description(&self) -> &str {
        "Reject all turbulent fluxes where any one is missing"
    }

    fn requires(&self) -> Vec<String> {
        Vec::new()
    }

    fn produces(&self) -> Vec<String> {
        self.fluxes.clone()
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let present: Vec<&String> = self.fluxes.iter().filter(|f| ds.contains(f)).collect();
        if present.len() < 2 {
            return Ok(TransformOutcome::skipped("fewer than two fluxes present"));
        }

        let gaps: Vec<bool> = (0..ds.len())
            .map(|i| {
                present
                    .iter()
                    .filter_map(|f| ds.series(f))
                    .any(|s| !s.is_valid(i))
            })
            .collect();

        let mut masked = 0;
        let mut outputs = Vec::new();
        for name in present {
            let Some(series) = ds.series_mut(name) else {
                continue;
            };
            for (i, _) in gaps.iter().enumerate().filter(|(_, g)| **g) {
                if series.mask(i, FlagCode::FluxGapCoordinated) {
                    masked += 1;
                }
            }
            outputs.push(name.clone());
        }

        debug!(masked, "flux gaps coordinated");
        Ok(TransformOutcome::Applied { outputs, masked })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MISSING;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_companion_fluxes_masked() {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let times = (0..3).map(|i| t0 + Duration::minutes(30 * i)).collect();
        let mut ds = Dataset::from_columns(
            times,
            30,
            [
                ("Fe".to_string(), vec![100.0, MISSING, 100.0]),
                ("Fh".to_string(), vec![50.0, 50.0, 50.0]),
                ("Fc".to_string(), vec![-0.3, -0.3, MISSING]),
            ],
        )
        .unwrap();

        let t = FluxGapCoordination::default();
        let outcome = t.apply(&mut ds).unwrap();
        assert_eq!(
            outcome,
            TransformOutcome::Applied {
                outputs: owned(&["Fe", "Fh", "Fc"]),
                masked: 4,
            }
        );
        let fh = ds.series("Fh").unwrap();
        assert!(fh.is_valid(0));
        assert_eq!(fh.flag()[1], FlagCode::FluxGapCoordinated);
        assert_eq!(fh.flag()[2], FlagCode::FluxGapCoordinated);
        assert_eq!(ds.series("Fe").unwrap().flag()[1], FlagCode::Missing);

        // Second application is a no-op
        match t.apply(&mut ds).unwrap() {
            TransformOutcome::Applied { masked, .. } => assert_eq!(masked, 0),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
