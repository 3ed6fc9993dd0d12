//! Aggregation of processed datasets.
//!
//! Daily energy and carbon budgets are the usual end product of an L4 run;
//! see [`DailyConfig::budget`](crate::config::DailyConfig::budget).

mod daily;

pub use daily::DailySummary;
