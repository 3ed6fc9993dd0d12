//! Processing levels.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::flag::FlagCode;

/// Processing level of a dataset.
///
/// Levels are ordered: a level transition always moves forward and is
/// produced by copying the previous level's dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProcessingLevel {
    /// Raw, time-stamped, missing-flagged.
    #[default]
    L1,
    /// Range, diurnal and diagnostic filtered.
    L2,
    /// Physically corrected fluxes.
    L3,
    /// Gap-filled.
    L4,
}

impl ProcessingLevel {
    /// The level that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            ProcessingLevel::L1 => Some(ProcessingLevel::L2),
            ProcessingLevel::L2 => Some(ProcessingLevel::L3),
            ProcessingLevel::L3 => Some(ProcessingLevel::L4),
            ProcessingLevel::L4 => None,
        }
    }

    /// Reason code used by the range check at this level.
    pub fn range_code(self) -> FlagCode {
        match self {
            ProcessingLevel::L1 | ProcessingLevel::L2 => FlagCode::RangeL2,
            ProcessingLevel::L3 => FlagCode::RangeL3,
            ProcessingLevel::L4 => FlagCode::RangeL4,
        }
    }

    /// Reason code used by the diurnal check at this level.
    pub fn diurnal_code(self) -> FlagCode {
        match self {
            ProcessingLevel::L1 | ProcessingLevel::L2 => FlagCode::DiurnalL2,
            ProcessingLevel::L3 => FlagCode::DiurnalL3,
            ProcessingLevel::L4 => FlagCode::DiurnalL4,
        }
    }
}

impl fmt::Display for ProcessingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessingLevel::L1 => "L1",
            ProcessingLevel::L2 => "L2",
            ProcessingLevel::L3 => "L3",
            ProcessingLevel::L4 => "L4",
        };
        f.write_str(s)
    }
}
