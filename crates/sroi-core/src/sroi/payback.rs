use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SroiError;
use crate::types::{out_of_range, Money};
use crate::SroiResult;

/// Which undiscounted benefit the payback walk accumulates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaybackBasis {
    /// `quantity * unit_value * dropoff_factor`: gross cash recovery, ignoring
    /// deadweight, attribution and displacement
    #[default]
    Gross,
    /// Adjusted value after deadweight, attribution and displacement
    Net,
}

/// Years until cumulative benefit covers the investment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaybackPeriod {
    /// Break-even reached inside the project horizon
    WithinHorizon { years: u32 },
    /// Horizon exhausted; linear extrapolation from the average annual benefit
    Extrapolated { years: u32 },
    /// No benefit to extrapolate from
    Never,
}

impl PaybackPeriod {
    pub fn years(&self) -> Option<u32> {
        match self {
            PaybackPeriod::WithinHorizon { years } | PaybackPeriod::Extrapolated { years } => {
                Some(*years)
            }
            PaybackPeriod::Never => None,
        }
    }
}

/// Walk the per-year benefits of the project horizon (index 0 = year 1)
/// until the running total reaches `total_cost`.
///
/// When the horizon runs out first, the remaining gap is covered at the
/// horizon's average annual benefit:
/// `horizon + ceil((total_cost - cumulative) / (cumulative / horizon))`.
pub fn payback_period(yearly_benefits: &[Money], total_cost: Money) -> SroiResult<PaybackPeriod> {
    if yearly_benefits.is_empty() {
        return Err(SroiError::InvalidInput {
            field: "project_duration_years".into(),
            reason: "Payback horizon must cover at least one year".into(),
        });
    }

    let mut cumulative = Decimal::ZERO;
    for (idx, benefit) in yearly_benefits.iter().enumerate() {
        cumulative = cumulative
            .checked_add(*benefit)
            .ok_or_else(|| out_of_range("cumulative_benefit"))?;
        if cumulative >= total_cost {
            return Ok(PaybackPeriod::WithinHorizon {
                years: idx as u32 + 1,
            });
        }
    }

    let horizon = yearly_benefits.len() as u32;
    let average_annual_benefit = cumulative / Decimal::from(horizon);
    if average_annual_benefit <= Decimal::ZERO {
        return Err(SroiError::DegenerateExtrapolation {
            average_annual_benefit,
        });
    }

    // A tiny average benefit against a large gap overflows the year count
    let extra_years = (total_cost - cumulative)
        .checked_div(average_annual_benefit)
        .and_then(|years| years.ceil().to_u32())
        .and_then(|extra| extra.checked_add(horizon))
        .ok_or(SroiError::DegenerateExtrapolation {
            average_annual_benefit,
        })?;

    Ok(PaybackPeriod::Extrapolated { years: extra_years })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payback_within_horizon() {
        let benefits = vec![dec!(40000), dec!(40000), dec!(40000)];
        let result = payback_period(&benefits, dec!(80000)).unwrap();
        assert_eq!(result, PaybackPeriod::WithinHorizon { years: 2 });
    }

    #[test]
    fn test_payback_reached_exactly() {
        let benefits = vec![dec!(30000)];
        let result = payback_period(&benefits, dec!(30000)).unwrap();
        assert_eq!(result.years(), Some(1));
    }

    #[test]
    fn test_payback_extrapolated() {
        let benefits = vec![dec!(20000), dec!(20000), dec!(20000)];
        let result = payback_period(&benefits, dec!(100000)).unwrap();
        assert_eq!(result, PaybackPeriod::Extrapolated { years: 5 });
    }

    #[test]
    fn test_payback_extrapolation_rounds_up() {
        // 30000 left at 20000/yr -> 2 more years, not 1.5
        let benefits = vec![dec!(20000), dec!(20000), dec!(20000)];
        let result = payback_period(&benefits, dec!(90000)).unwrap();
        assert_eq!(result, PaybackPeriod::Extrapolated { years: 5 });
    }

    #[test]
    fn test_payback_degenerate() {
        let benefits = vec![Decimal::ZERO, Decimal::ZERO];
        let err = payback_period(&benefits, dec!(1000)).unwrap_err();
        assert!(matches!(err, SroiError::DegenerateExtrapolation { .. }));
    }

    #[test]
    fn test_payback_tiny_benefit_is_degenerate() {
        let benefits = vec![Decimal::new(1, 28)];
        let err = payback_period(&benefits, dec!(1000000)).unwrap_err();
        assert!(matches!(err, SroiError::DegenerateExtrapolation { .. }));
    }

    #[test]
    fn test_payback_cumulative_overflow_is_an_error() {
        // Dips below zero, so the running total never reaches the cost first
        let benefits = vec![dec!(-1), Decimal::MAX, Decimal::MAX];
        let err = payback_period(&benefits, Decimal::MAX).unwrap_err();
        assert!(matches!(err, SroiError::InvalidInput { .. }));
    }

    #[test]
    fn test_payback_empty_horizon() {
        assert!(payback_period(&[], dec!(1000)).is_err());
    }

    #[test]
    fn test_never_has_no_years() {
        assert_eq!(PaybackPeriod::Never.years(), None);
    }

    #[test]
    fn test_payback_serializes_tagged() {
        let json = serde_json::to_value(PaybackPeriod::Extrapolated { years: 5 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "extrapolated", "years": 5}));
    }
}
