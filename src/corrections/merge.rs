//! Merging and averaging redundant series.

use tracing::warn;

use crate::pipeline::{PipelineError, Transform, TransformOutcome};
use crate::series::{Dataset, MISSING, NewSeries, Series};
use crate::types::FlagCode;

fn present<'a>(ds: &'a Dataset, sources: &[String]) -> Vec<&'a Series> {
    sources.iter().filter_map(|name| ds.series(name)).collect()
}

/// Missing-input report shared by both transforms: a merge can run as long
/// as one source exists.
fn missing_all(ds: &Dataset, sources: &[String]) -> Vec<String> {
    if sources.iter().any(|s| ds.contains(s)) {
        Vec::new()
    } else {
        sources.to_vec()
    }
}

/// Take each sample from the first source holding a good value.
///
/// Values from any source but the first are flagged
/// [`FlagCode::MergedSecondary`]. Where no source is good, the first
/// source's flag is kept.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeSeries {
    destination: String,
    sources: Vec<String>,
}

impl MergeSeries {
    pub fn new(destination: impl Into<String>, sources: &[&str]) -> Self {
        Self {
            destination: destination.into(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_names(destination: String, sources: Vec<String>) -> Self {
        Self {
            destination,
            sources,
        }
    }
}

impl Transform for MergeSeries {
    fn name(&self) -> &'static str {
        "MergeSeries"
    }

    fn description(&self) -> &str {
        "Merge series in order of precedence"
    }

    fn requires(&self) -> Vec<String> {
        self.sources.clone()
    }

    fn produces(&self) -> Vec<String> {
        vec![self.destination.clone()]
    }

    fn missing_inputs(&self, ds: &Dataset) -> Vec<String> {
        missing_all(ds, &self.sources)
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let sources = present(ds, &self.sources);
        if sources.len() < self.sources.len() {
            warn!(destination = %self.destination, found = sources.len(), configured = self.sources.len(), "merging with missing sources");
        }
        let n = ds.len();
        let mut data = vec![MISSING; n];
        let mut flag = vec![FlagCode::Missing; n];
        let is_primary = |s: &Series| self.sources.first().is_some_and(|p| p == s.name());

        for i in 0..n {
            if let Some((s, v)) = sources.iter().find_map(|s| s.value(i).map(|v| (s, v))) {
                data[i] = v;
                flag[i] = if is_primary(s) {
                    s.flag()[i]
                } else {
                    FlagCode::MergedSecondary
                };
            } else if let Some(first) = sources.first() {
                flag[i] = first.flag()[i];
            }
        }

        let attributes = sources
            .first()
            .map(|s| s.attributes.clone())
            .unwrap_or_default();
        let inputs: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        let mut request = NewSeries::new(self.destination.as_str(), data)
            .with_flags(flag)
            .with_inputs(&inputs)
            .with_units(attributes.units)
            .with_description(format!("Merged from {}", inputs.join(", ")));
        if !attributes.standard_name.is_empty() {
            request = request.with_standard_name(attributes.standard_name);
        }
        ds.create(request)?;

        Ok(TransformOutcome::Applied {
            outputs: self.produces(),
            masked: 0,
        })
    }
}

/// Element-wise mean of the valid sources.
///
/// The result is [`FlagCode::Good`] wherever at least one source is valid,
/// otherwise [`FlagCode::Missing`].
#[derive(Clone, Debug, PartialEq)]
pub struct AverageSeries {
    destination: String,
    sources: Vec<String>,
}

impl AverageSeries {
    pub fn new(destination: impl Into<String>, sources: &[&str]) -> Self {
        Self {
            destination: destination.into(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_names(destination: String, sources: Vec<String>) -> Self {
        Self {
            destination,
            sources,
        }
    }
}

impl Transform for AverageSeries {
    fn name(&self) -> &'static str {
        "AverageSeries"
    }

    fn description(&self) -> &str {
        "Average of the valid sources"
    }

    fn requires(&self) -> Vec<String> {
        self.sources.clone()
    }

    fn produces(&self) -> Vec<String> {
        vec![self.destination.clone()]
    }

    fn missing_inputs(&self, ds: &Dataset) -> Vec<String> {
        missing_all(ds, &self.sources)
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let sources = present(ds, &self.sources);
        let data: Vec<f64> = (0..ds.len())
            .map(|i| {
                let (sum, count) = sources
                    .iter()
                    .filter_map(|s| s.value(i))
                    .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
                if count == 0 { MISSING } else { sum / count as f64 }
            })
            .collect();

        let units = sources
            .first()
            .map(|s| s.attributes.units.clone())
            .unwrap_or_default();
        let inputs: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        ds.create(
            NewSeries::new(self.destination.as_str(), data)
                .with_inputs(&inputs)
                .with_units(units)
                .with_description(format!("Average of {}", inputs.join(", "))),
        )?;

        Ok(TransformOutcome::Applied {
            outputs: self.produces(),
            masked: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn dataset() -> Dataset {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let times = (0..3).map(|i| t0 + Duration::minutes(30 * i)).collect();
        Dataset::from_columns(
            times,
            30,
            [
                ("Ta_HMP".to_string(), vec![20.0, MISSING, MISSING]),
                ("Ta_CSAT".to_string(), vec![21.0, 22.0, MISSING]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_merge_precedence() {
        let mut ds = dataset();
        let t = MergeSeries::new("Ta", &["Ta_HMP", "Ta_CSAT"]);
        t.apply(&mut ds).unwrap();

        let ta = ds.series("Ta").unwrap();
        assert_relative_eq!(ta.data()[0], 20.0);
        assert_eq!(ta.flag()[0], FlagCode::Good);
        assert_relative_eq!(ta.data()[1], 22.0);
        assert_eq!(ta.flag()[1], FlagCode::MergedSecondary);
        assert_eq!(ta.flag()[2], FlagCode::Missing);
        assert!(ds.invariant_violations().is_empty());
    }

    #[test]
    fn test_merge_runs_with_partial_sources() {
        let ds = dataset();
        let t = MergeSeries::new("Ta", &["Ta_missing", "Ta_CSAT"]);
        assert!(t.missing_inputs(&ds).is_empty());
        let t = MergeSeries::new("Ta", &["a", "b"]);
        assert_eq!(t.missing_inputs(&ds).len(), 2);
    }

    #[test]
    fn test_average() {
        let mut ds = dataset();
        AverageSeries::new("Ta", &["Ta_HMP", "Ta_CSAT"])
            .apply(&mut ds)
            .unwrap();
        let ta = ds.series("Ta").unwrap();
        assert_relative_eq!(ta.data()[0], 20.5);
        assert_relative_eq!(ta.data()[1], 22.0);
        assert_eq!(ta.flag()[1], FlagCode::Good);
        assert_eq!(ta.flag()[2], FlagCode::Missing);
    }
}
