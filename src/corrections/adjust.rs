//! In-place adjustments of raw series before the physics runs.
//!
//! Wind direction from a sonic mounted off its nominal bearing, and series
//! logged with the opposite sign convention. Only good samples change and
//! their flags are kept.

use tracing::debug;

use crate::config::WindDirectionOffset;
use crate::pipeline::{PipelineError, Transform, TransformOutcome};
use crate::series::{Dataset, DatasetError, Series};
use crate::types::FlagCode;

/// Rewrite every good sample of `series` with `f(i, x)`, keeping its flag.
fn rewrite_good(series: &mut Series, f: impl Fn(usize, f64) -> f64) -> usize {
    let mut changed = 0;
    for i in 0..series.len() {
        let Some(x) = series.value(i) else {
            continue;
        };
        let flag = series.flag()[i];
        if series.update(i, f(i, x), flag, FlagCode::Missing) {
            changed += 1;
        }
    }
    changed
}

fn series_mut<'a>(ds: &'a mut Dataset, name: &str) -> Result<&'a mut Series, DatasetError> {
    ds.series_mut(name).ok_or_else(|| DatasetError::UnknownSeries {
        name: name.to_string(),
    })
}

/// Add per-window bearing offsets to a wind direction, then wrap to
/// `[0, 360)`.
///
/// Overlapping windows add up. Samples outside every window are still
/// wrapped.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrectWindDirection {
    series: String,
    offsets: Vec<WindDirectionOffset>,
}

impl CorrectWindDirection {
    pub fn new(series: impl Into<String>, offsets: Vec<WindDirectionOffset>) -> Self {
        Self {
            series: series.into(),
            offsets,
        }
    }
}

impl Transform for CorrectWindDirection {
    fn name(&self) -> &'static str {
        "CorrectWindDirection"
    }

    fn description(&self) -> &str {
        "Wind direction corrected for sensor bearing"
    }

    fn requires(&self) -> Vec<String> {
        vec![self.series.clone()]
    }

    fn produces(&self) -> Vec<String> {
        vec![self.series.clone()]
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let times = ds.timestamps().to_vec();
        let series = series_mut(ds, &self.series)?;
        let offsets = &self.offsets;
        let changed = rewrite_good(series, |i, wd| {
            let offset: f64 = offsets.iter().map(|w| w.at(times[i])).sum();
            (wd + offset).rem_euclid(360.0)
        });
        if !offsets.is_empty() {
            series.add_note(format!("bearing offsets applied in {} windows", offsets.len()));
        }
        debug!(series = %self.series, changed, "wind direction corrected");
        Ok(TransformOutcome::applied(&[self.series.as_str()], 0))
    }
}

/// Flip the sign of a series.
#[derive(Clone, Debug, PartialEq)]
pub struct InvertSign {
    series: String,
}

impl InvertSign {
    pub fn new(series: impl Into<String>) -> Self {
        Self {
            series: series.into(),
        }
    }
}

impl Transform for InvertSign {
    fn name(&self) -> &'static str {
        "InvertSign"
    }

    fn description(&self) -> &str {
        "Sign convention flipped"
    }

    fn requires(&self) -> Vec<String> {
        vec![self.series.clone()]
    }

    fn produces(&self) -> Vec<String> {
        vec![self.series.clone()]
    }

    fn apply(&self, ds: &mut Dataset) -> Result<TransformOutcome, PipelineError> {
        let series = series_mut(ds, &self.series)?;
        let changed = rewrite_good(series, |_, x| -x);
        series.add_note("sign inverted");
        debug!(series = %self.series, changed, "sign inverted");
        Ok(TransformOutcome::applied(&[self.series.as_str()], 0))
    }
}
