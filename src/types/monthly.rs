//! Month-indexed parameter values.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// A parameter that is either constant or has one value per calendar month.
///
/// Control files commonly give range bounds and diurnal thresholds as a
/// single number or as a list of twelve, January first.
///
/// # Example
///
/// ```
/// use fluxqc::types::MonthlyValues;
///
/// let bound = MonthlyValues::constant(100.0);
/// assert_eq!(bound.for_month(7), 100.0);
///
/// let seasonal = MonthlyValues::monthly([1.0, 2.0, 3.0, 4.0, 5.0, 6.0,
///                                        7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
/// assert_eq!(seasonal.for_month(3), 3.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MonthlyValues {
    /// Same value in every month.
    Constant(f64),
    /// One value per month, January first.
    Monthly(Vec<f64>),
}

impl MonthlyValues {
    /// Constant value for all months.
    pub fn constant(value: f64) -> Self {
        MonthlyValues::Constant(value)
    }

    /// Twelve monthly values.
    pub fn monthly(values: [f64; 12]) -> Self {
        MonthlyValues::Monthly(values.to_vec())
    }

    /// Value for a 1-based calendar month.
    ///
    /// A monthly list shorter than twelve repeats its last entry.
    pub fn for_month(&self, month: u32) -> f64 {
        match self {
            MonthlyValues::Constant(v) => *v,
            MonthlyValues::Monthly(values) => {
                let idx = (month.clamp(1, 12) - 1) as usize;
                values
                    .get(idx)
                    .or_else(|| values.last())
                    .copied()
                    .unwrap_or(f64::NAN)
            }
        }
    }

    /// Check that a monthly list is non-empty and at most twelve long.
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        match self {
            MonthlyValues::Constant(_) => Ok(()),
            MonthlyValues::Monthly(values) if values.is_empty() || values.len() > 12 => {
                Err(ConfigError::InvalidParameter {
                    key: name.to_string(),
                    message: format!("expected 1 to 12 monthly values, got {}", values.len()),
                })
            }
            MonthlyValues::Monthly(_) => Ok(()),
        }
    }
}

impl From<f64> for MonthlyValues {
    fn from(value: f64) -> Self {
        MonthlyValues::Constant(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_list_repeats_last() {
        let v = MonthlyValues::Monthly(vec![1.0, 2.0]);
        assert_eq!(v.for_month(1), 1.0);
        assert_eq!(v.for_month(2), 2.0);
        assert_eq!(v.for_month(11), 2.0);
    }

    #[test]
    fn test_validate() {
        assert!(MonthlyValues::Monthly(vec![]).validate("x").is_err());
        assert!(MonthlyValues::Monthly(vec![0.0; 13]).validate("x").is_err());
        assert!(MonthlyValues::constant(3.0).validate("x").is_ok());
    }
}
