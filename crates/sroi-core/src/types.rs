use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SroiError;
use crate::SroiResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%).
pub type Rate = Decimal;

/// Adjustment factors and user-entered discount rates, expressed as
/// percentages (20 = 20%). Convert with [`percent_to_rate`] before use.
pub type Percent = Decimal;

/// Ratios such as SROI (1.2 = 1.2 : 1)
pub type Multiple = Decimal;

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Upper bound on an outcome's duration and on the payback horizon, in years.
pub const MAX_PROJECTION_YEARS: u32 = 1000;

/// Convert a percentage into a decimal rate (20 -> 0.20).
pub fn percent_to_rate(pct: Percent) -> Rate {
    pct / ONE_HUNDRED
}

/// Clamp a percentage into [0, 100].
pub fn clamp_percent(pct: Percent) -> Percent {
    pct.max(Decimal::ZERO).min(ONE_HUNDRED)
}

/// Sum `values`, failing with `InvalidInput` on `field` instead of overflowing.
pub fn checked_total<I>(values: I, field: &str) -> SroiResult<Money>
where
    I: IntoIterator<Item = Money>,
{
    values.into_iter().try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v).ok_or_else(|| out_of_range(field))
    })
}

/// Error for a result that does not fit in a `Decimal`.
pub(crate) fn out_of_range(field: &str) -> SroiError {
    SroiError::InvalidInput {
        field: field.into(),
        reason: "Result exceeds the decimal range".into(),
    }
}

/// One swept input: name and min/max/step range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityVariable {
    pub name: String,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percent_to_rate() {
        assert_eq!(percent_to_rate(dec!(20)), dec!(0.20));
        assert_eq!(percent_to_rate(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(dec!(-5)), Decimal::ZERO);
        assert_eq!(clamp_percent(dec!(150)), dec!(100));
        assert_eq!(clamp_percent(dec!(42.5)), dec!(42.5));
    }
}
