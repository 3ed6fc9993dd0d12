//! Strongly-typed domain types shared across the pipeline.
//!
//! - [`FlagCode`]: closed enumeration of per-sample quality reason codes
//! - [`ProcessingLevel`]: L1 to L4 dataset level
//! - [`MonthlyValues`]: constant or month-indexed control parameters
//!
//! # Example
//!
//! ```
//! use fluxqc::types::{FlagCode, ProcessingLevel};
//!
//! let code = ProcessingLevel::L3.range_code();
//! assert_eq!(code, FlagCode::RangeL3);
//! assert!(code.is_bad());
//! ```

mod flag;
mod level;
mod monthly;

pub use flag::FlagCode;
pub use level::ProcessingLevel;
pub use monthly::MonthlyValues;
