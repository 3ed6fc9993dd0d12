//! Instrument self-diagnostic check.
//!
//! Each instrument reports a diagnostic word that is zero when the sample is
//! sound. A non-zero or missing word, or a rejected companion series (gain
//! control, raw standard deviations), invalidates every variable measured by
//! that instrument. Where the diagnostic series was not logged, the flags of
//! the instrument's key variables stand in for it.

use tracing::{debug, warn};

use crate::config::InstrumentDiagnostic;
use crate::series::Dataset;
use crate::types::FlagCode;

/// Per-sample diagnostic failure mask, or `None` if the instrument left no
/// usable record in `ds`.
pub fn diagnostic_failures(ds: &Dataset, instrument: &InstrumentDiagnostic) -> Option<Vec<bool>> {
    let n = ds.len();
    let mut failed = match ds.series(&instrument.diagnostic) {
        Some(diag) => (0..n).map(|i| diag.value(i) != Some(0.0)).collect(),
        None => {
            let fallback: Vec<_> = instrument
                .fallback
                .iter()
                .filter_map(|name| ds.series(name))
                .collect();
            if fallback.is_empty() {
                return None;
            }
            debug!(diagnostic = %instrument.diagnostic, "diagnostic absent, using variable flags");
            (0..n)
                .map(|i| fallback.iter().any(|s| s.flag()[i].is_bad()))
                .collect::<Vec<bool>>()
        }
    };

    for extra in instrument.extra.iter().filter_map(|name| ds.series(name)) {
        for (f, flag) in failed.iter_mut().zip(extra.flag()) {
            *f |= flag.is_bad();
        }
    }
    Some(failed)
}

/// Invalidate the instrument's variables where its diagnostic failed.
///
/// Returns the number of samples rejected across all variables.
pub fn diagnostic_check(ds: &mut Dataset, instrument: &InstrumentDiagnostic, code: FlagCode) -> usize {
    let Some(failed) = diagnostic_failures(ds, instrument) else {
        warn!(diagnostic = %instrument.diagnostic, "no diagnostic or key variables present, check skipped");
        return 0;
    };

    let mut rejected = 0;
    for name in &instrument.variables {
        let Some(series) = ds.series_mut(name) else {
            continue;
        };
        for (i, _) in failed.iter().enumerate().filter(|(_, f)| **f) {
            if series.mask(i, code) {
                rejected += 1;
            }
        }
    }
    if rejected > 0 {
        debug!(diagnostic = %instrument.diagnostic, rejected, "diagnostic rejections");
    }
    rejected
}
