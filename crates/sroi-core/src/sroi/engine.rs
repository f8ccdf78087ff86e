use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SroiError;
use crate::time_value::irr_bisection;
use crate::types::{
    checked_total, out_of_range, with_metadata, ComputationOutput, Money, Multiple, Percent, Rate,
    MAX_PROJECTION_YEARS,
};
use crate::valuation::outcome::{value_outcome, Outcome, ValuationResult};
use crate::SroiResult;

use super::payback::{payback_period, PaybackBasis, PaybackPeriod};

/// IRR search interval and bracket width at which bisection stops.
const IRR_LOWER_BOUND: Rate = dec!(-0.99);
const IRR_UPPER_BOUND: Rate = dec!(5.0);
const IRR_TOLERANCE: Rate = dec!(0.0001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Project-level context for one valuation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectParameters {
    /// Investment, treated as a single year-0 outflow
    pub total_cost: Money,
    /// Annual discount rate as a percentage (3 = 3%)
    pub discount_rate: Percent,
    /// Payback search horizon in years
    pub project_duration_years: u32,
}

fn default_compute_irr() -> bool {
    true
}

/// Engine switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOptions {
    #[serde(default)]
    pub payback_basis: PaybackBasis,
    #[serde(default = "default_compute_irr")]
    pub compute_irr: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        EvaluationOptions {
            payback_basis: PaybackBasis::default(),
            compute_irr: default_compute_irr(),
        }
    }
}

/// Self-contained engine input, as read from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SroiInput {
    pub outcomes: Vec<Outcome>,
    pub parameters: ProjectParameters,
    #[serde(default)]
    pub options: EvaluationOptions,
}

/// Benefit totals across all outcomes for one projection year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyBenefit {
    pub year: u32,
    /// Undiscounted `quantity * unit_value * dropoff_factor`
    pub gross_benefit: Money,
    /// Undiscounted value after adjustments and drop-off
    pub net_benefit: Money,
    /// Discounted net benefit
    pub present_value: Money,
    /// Running total on the payback basis; only inside the payback horizon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cumulative_payback_basis: Option<Money>,
}

/// Aggregate SROI report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub total_benefit_pv: Money,
    /// Equal to the total cost: one undiscounted outflow at year 0
    pub total_cost_pv: Money,
    pub net_benefit: Money,
    pub sroi_ratio: Multiple,
    pub payback_period: PaybackPeriod,
    pub payback_basis: PaybackBasis,
    /// Internal rate of return as a fraction (0.12 = 12%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<Rate>,
    pub discount_rate: Percent,
    pub outcomes: Vec<ValuationResult>,
    pub yearly: Vec<YearlyBenefit>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Evaluate an SROI valuation with default options (gross payback, IRR on).
pub fn evaluate(
    outcomes: &[Outcome],
    params: &ProjectParameters,
) -> SroiResult<ComputationOutput<AggregateResult>> {
    evaluate_with_options(outcomes, params, &EvaluationOptions::default())
}

/// Evaluate a self-contained [`SroiInput`].
pub fn calculate_sroi(input: &SroiInput) -> SroiResult<ComputationOutput<AggregateResult>> {
    evaluate_with_options(&input.outcomes, &input.parameters, &input.options)
}

/// Fold outcomes and project parameters into one [`AggregateResult`].
pub fn evaluate_with_options(
    outcomes: &[Outcome],
    params: &ProjectParameters,
    options: &EvaluationOptions,
) -> SroiResult<ComputationOutput<AggregateResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_inputs(outcomes, params)?;

    for (idx, outcome) in outcomes.iter().enumerate() {
        for field in outcome.out_of_range_percentages() {
            warnings.push(format!(
                "Outcome {idx} ('{}'): {field} outside [0, 100] was clamped",
                outcome.name
            ));
        }
    }

    // --- Per-outcome valuation ---
    let valuations = outcomes
        .iter()
        .map(|o| value_outcome(o, params.discount_rate))
        .collect::<SroiResult<Vec<ValuationResult>>>()?;

    let total_benefit_pv = checked_total(
        valuations.iter().map(|v| v.present_value),
        "total_benefit_pv",
    )?;
    let total_cost_pv = params.total_cost;
    let net_benefit = total_benefit_pv
        .checked_sub(total_cost_pv)
        .ok_or_else(|| out_of_range("net_benefit"))?;
    let sroi_ratio = total_benefit_pv
        .checked_div(total_cost_pv)
        .ok_or_else(|| SroiError::InvalidInput {
            field: "total_cost".into(),
            reason: "Total cost is too small: the SROI ratio exceeds the decimal range".into(),
        })?;

    // --- Yearly totals ---
    let mut yearly = build_yearly_benefits(outcomes, &valuations, params.project_duration_years)?;

    // --- Payback ---
    let horizon_benefits: Vec<Money> = yearly
        .iter()
        .take(params.project_duration_years as usize)
        .map(|y| match options.payback_basis {
            PaybackBasis::Gross => y.gross_benefit,
            PaybackBasis::Net => y.net_benefit,
        })
        .collect();

    let mut running = Decimal::ZERO;
    for (year, benefit) in yearly.iter_mut().zip(&horizon_benefits) {
        running = running
            .checked_add(*benefit)
            .ok_or_else(|| out_of_range("cumulative_payback_basis"))?;
        year.cumulative_payback_basis = Some(running);
    }

    let payback = match payback_period(&horizon_benefits, params.total_cost) {
        Ok(p) => p,
        Err(SroiError::DegenerateExtrapolation {
            average_annual_benefit,
        }) => {
            warnings.push(format!(
                "Payback cannot be extrapolated (average annual benefit {average_annual_benefit}); investment is never recovered"
            ));
            PaybackPeriod::Never
        }
        Err(e) => return Err(e),
    };

    // --- IRR ---
    let irr = if options.compute_irr {
        solve_irr(params.total_cost, &yearly, &mut warnings)?
    } else {
        None
    };

    if sroi_ratio < Decimal::ONE {
        warnings.push(format!(
            "SROI ratio {} : 1 is below break-even; discounted benefits do not cover the investment",
            sroi_ratio.round_dp(2)
        ));
    }

    for w in &warnings {
        tracing::warn!("{w}");
    }
    tracing::debug!(
        outcomes = outcomes.len(),
        total_benefit_pv = %total_benefit_pv,
        sroi_ratio = %sroi_ratio,
        "SROI evaluation complete"
    );

    let output = AggregateResult {
        total_benefit_pv,
        total_cost_pv,
        net_benefit,
        sroi_ratio,
        payback_period: payback,
        payback_basis: options.payback_basis,
        irr,
        discount_rate: params.discount_rate,
        outcomes: valuations,
        yearly,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "SROI (present value of adjusted outcomes / investment)",
        &serde_json::json!({
            "parameters": params,
            "options": options,
            "outcome_count": outcomes.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_inputs(outcomes: &[Outcome], params: &ProjectParameters) -> SroiResult<()> {
    if outcomes.is_empty() {
        return Err(SroiError::NoOutcomes);
    }
    if params.total_cost <= Decimal::ZERO {
        return Err(SroiError::InvalidCost {
            total_cost: params.total_cost,
        });
    }
    if params.discount_rate <= dec!(-100) {
        return Err(SroiError::InvalidInput {
            field: "discount_rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    if params.project_duration_years == 0 {
        return Err(SroiError::InvalidInput {
            field: "project_duration_years".into(),
            reason: "Project duration must be at least one year".into(),
        });
    }
    if params.project_duration_years > MAX_PROJECTION_YEARS {
        return Err(SroiError::InvalidInput {
            field: "project_duration_years".into(),
            reason: format!("Project duration may not exceed {MAX_PROJECTION_YEARS} years"),
        });
    }

    for (index, outcome) in outcomes.iter().enumerate() {
        let missing = if outcome.quantity <= Decimal::ZERO {
            Some("quantity")
        } else if outcome.unit_value <= Decimal::ZERO {
            Some("unit_value")
        } else if outcome.duration == 0 {
            Some("duration")
        } else {
            None
        };
        if let Some(field) = missing {
            return Err(SroiError::IncompleteOutcome {
                index,
                field: field.into(),
            });
        }
        if outcome.duration > MAX_PROJECTION_YEARS {
            return Err(SroiError::InvalidInput {
                field: format!("outcomes[{index}].duration"),
                reason: format!("Duration may not exceed {MAX_PROJECTION_YEARS} years"),
            });
        }
        if outcome.checked_initial_value().is_none() {
            return Err(out_of_range(&format!("outcomes[{index}].initial_value")));
        }
    }

    Ok(())
}

/// Sum every outcome's stream by year, over the longer of the longest
/// outcome and the payback horizon.
fn build_yearly_benefits(
    outcomes: &[Outcome],
    valuations: &[ValuationResult],
    horizon: u32,
) -> SroiResult<Vec<YearlyBenefit>> {
    let last_year = outcomes
        .iter()
        .map(Outcome::effective_duration)
        .max()
        .unwrap_or(0)
        .max(horizon);

    (1..=last_year)
        .map(|year| {
            let mut entry = YearlyBenefit {
                year,
                gross_benefit: Decimal::ZERO,
                net_benefit: Decimal::ZERO,
                present_value: Decimal::ZERO,
                cumulative_payback_basis: None,
            };
            for (outcome, valuation) in outcomes.iter().zip(valuations) {
                if let Some(y) = valuation.stream.get(year as usize - 1) {
                    let gross = outcome.initial_value() * y.dropoff_factor;
                    entry.gross_benefit = add_benefit(entry.gross_benefit, gross, year)?;
                    entry.net_benefit = add_benefit(entry.net_benefit, y.adjusted_value, year)?;
                    entry.present_value = add_benefit(entry.present_value, y.present_value, year)?;
                }
            }
            Ok(entry)
        })
        .collect()
}

fn add_benefit(total: Money, value: Money, year: u32) -> SroiResult<Money> {
    total
        .checked_add(value)
        .ok_or_else(|| out_of_range(&format!("yearly[{year}]")))
}

/// IRR of `-total_cost` at year 0 followed by the yearly net benefits.
fn solve_irr(
    total_cost: Money,
    yearly: &[YearlyBenefit],
    warnings: &mut Vec<String>,
) -> SroiResult<Option<Rate>> {
    let mut flows = Vec::with_capacity(yearly.len() + 1);
    flows.push(-total_cost);
    flows.extend(yearly.iter().map(|y| y.net_benefit));

    match irr_bisection(&flows, IRR_LOWER_BOUND, IRR_UPPER_BOUND, IRR_TOLERANCE) {
        Ok(rate) => Ok(Some(rate)),
        Err(SroiError::ConvergenceFailure { .. }) => {
            warnings.push(format!(
                "IRR not bracketed in [{IRR_LOWER_BOUND}, {IRR_UPPER_BOUND}]; omitted"
            ));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn outcome(quantity: Decimal, unit_value: Decimal, duration: u32) -> Outcome {
        Outcome {
            name: "Wellbeing".into(),
            quantity,
            unit_value,
            duration,
            ..Default::default()
        }
    }

    fn params(total_cost: Money, discount_rate: Percent, years: u32) -> ProjectParameters {
        ProjectParameters {
            total_cost,
            discount_rate,
            project_duration_years: years,
        }
    }

    #[test]
    fn test_no_outcomes_checked_before_cost() {
        let err = evaluate(&[], &params(Decimal::ZERO, dec!(3), 1)).unwrap_err();
        assert!(matches!(err, SroiError::NoOutcomes));
    }

    #[test]
    fn test_negative_cost_rejected() {
        let outcomes = vec![outcome(dec!(10), dec!(10), 1)];
        let err = evaluate(&outcomes, &params(dec!(-5), dec!(3), 1)).unwrap_err();
        assert!(matches!(err, SroiError::InvalidCost { .. }));
    }

    #[test]
    fn test_incomplete_outcome_reports_index_and_field() {
        let outcomes = vec![
            outcome(dec!(10), dec!(10), 1),
            outcome(dec!(10), Decimal::ZERO, 1),
        ];
        let err = evaluate(&outcomes, &params(dec!(100), dec!(3), 1)).unwrap_err();
        match err {
            SroiError::IncompleteOutcome { index, field } => {
                assert_eq!(index, 1);
                assert_eq!(field, "unit_value");
            }
            other => panic!("expected IncompleteOutcome, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_duration_outcome_rejected() {
        let outcomes = vec![outcome(dec!(10), dec!(10), 0)];
        let err = evaluate(&outcomes, &params(dec!(100), dec!(3), 1)).unwrap_err();
        assert!(matches!(err, SroiError::IncompleteOutcome { index: 0, .. }));
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let outcomes = vec![outcome(dec!(10), dec!(10), 1)];
        let err = evaluate(&outcomes, &params(dec!(100), dec!(3), 0)).unwrap_err();
        assert!(matches!(err, SroiError::InvalidInput { .. }));
    }

    #[test]
    fn test_horizon_beyond_limit_rejected() {
        let outcomes = vec![outcome(dec!(10), dec!(10), 1)];
        let err = evaluate(&outcomes, &params(dec!(100), dec!(3), MAX_PROJECTION_YEARS + 1))
            .unwrap_err();
        assert!(matches!(err, SroiError::InvalidInput { ref field, .. } if field == "project_duration_years"));
    }

    #[test]
    fn test_outcome_duration_beyond_limit_rejected() {
        let outcomes = vec![outcome(dec!(10), dec!(10), 1), outcome(dec!(10), dec!(10), u32::MAX)];
        let err = evaluate(&outcomes, &params(dec!(100), dec!(3), 1)).unwrap_err();
        match err {
            SroiError::InvalidInput { field, .. } => assert_eq!(field, "outcomes[1].duration"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_longest_allowed_duration_evaluates() {
        let outcomes = vec![outcome(dec!(10), dec!(10), MAX_PROJECTION_YEARS)];
        let result = evaluate(&outcomes, &params(dec!(100), dec!(3), MAX_PROJECTION_YEARS)).unwrap();
        assert_eq!(result.result.yearly.len(), MAX_PROJECTION_YEARS as usize);
    }

    #[test]
    fn test_initial_value_overflow_rejected() {
        let big = dec!(1000000000000000);
        let outcomes = vec![outcome(big, big, 1)];
        let err = evaluate(&outcomes, &params(dec!(1000), dec!(3), 1)).unwrap_err();
        match err {
            SroiError::InvalidInput { field, .. } => assert_eq!(field, "outcomes[0].initial_value"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_tiny_cost_ratio_overflow_rejected() {
        let outcomes = vec![outcome(dec!(100), dec!(500), 1)];
        let err = evaluate(&outcomes, &params(Decimal::new(1, 28), Decimal::ZERO, 1)).unwrap_err();
        match err {
            SroiError::InvalidInput { field, .. } => assert_eq!(field, "total_cost"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_near_minus_hundred_rate_over_long_duration_is_an_error() {
        let outcomes = vec![outcome(dec!(100), dec!(500), 30)];
        let err = evaluate(&outcomes, &params(dec!(1000), dec!(-99.99), 3)).unwrap_err();
        assert!(matches!(err, SroiError::InvalidInput { .. }));
    }

    #[test]
    fn test_negative_rate_within_range_evaluates() {
        let outcomes = vec![outcome(dec!(100), dec!(500), 3)];
        let result = evaluate(&outcomes, &params(dec!(1000), dec!(-50), 3)).unwrap();
        // 50000/0.5 + 50000/0.25 + 50000/0.125
        assert_eq!(result.result.total_benefit_pv, dec!(700000));
    }

    #[test]
    fn test_yearly_covers_longest_outcome_and_horizon() {
        let outcomes = vec![outcome(dec!(10), dec!(10), 2), outcome(dec!(1), dec!(50), 5)];
        let result = evaluate(&outcomes, &params(dec!(100), Decimal::ZERO, 3)).unwrap();
        let yearly = &result.result.yearly;
        assert_eq!(yearly.len(), 5);
        assert_eq!(yearly[0].gross_benefit, dec!(150));
        assert_eq!(yearly[2].gross_benefit, dec!(50));
        assert!(yearly[2].cumulative_payback_basis.is_some());
        assert!(yearly[3].cumulative_payback_basis.is_none());
    }

    #[test]
    fn test_net_payback_basis_excludes_adjusted_share() {
        let outcomes = vec![Outcome {
            deadweight: dec!(50),
            ..outcome(dec!(100), dec!(100), 5)
        }];
        let p = params(dec!(15000), Decimal::ZERO, 5);

        let gross = evaluate(&outcomes, &p).unwrap();
        assert_eq!(
            gross.result.payback_period,
            PaybackPeriod::WithinHorizon { years: 2 }
        );

        let options = EvaluationOptions {
            payback_basis: PaybackBasis::Net,
            compute_irr: false,
        };
        let net = evaluate_with_options(&outcomes, &p, &options).unwrap();
        assert_eq!(
            net.result.payback_period,
            PaybackPeriod::WithinHorizon { years: 3 }
        );
        assert_eq!(net.result.payback_basis, PaybackBasis::Net);
        assert!(net.result.irr.is_none());
    }

    #[test]
    fn test_net_basis_with_full_deadweight_never_pays_back() {
        let outcomes = vec![Outcome {
            deadweight: dec!(100),
            ..outcome(dec!(100), dec!(100), 3)
        }];
        let options = EvaluationOptions {
            payback_basis: PaybackBasis::Net,
            compute_irr: true,
        };
        let result =
            evaluate_with_options(&outcomes, &params(dec!(1000), dec!(3), 3), &options).unwrap();
        assert_eq!(result.result.payback_period, PaybackPeriod::Never);
        assert_eq!(result.result.sroi_ratio, Decimal::ZERO);
        assert!(result.result.irr.is_none());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("never recovered")));
    }

    #[test]
    fn test_clamped_percentage_warns() {
        let outcomes = vec![Outcome {
            attribution: dec!(140),
            ..outcome(dec!(10), dec!(10), 1)
        }];
        let result = evaluate(&outcomes, &params(dec!(50), Decimal::ZERO, 1)).unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("attribution")));
    }

    #[test]
    fn test_calculate_sroi_from_json() {
        let input: SroiInput = serde_json::from_value(serde_json::json!({
            "outcomes": [{"name": "Jobs", "quantity": "100", "unit_value": "500",
                          "deadweight": "20", "attribution": "10"}],
            "parameters": {"total_cost": "30000", "discount_rate": "0",
                           "project_duration_years": 1}
        }))
        .unwrap();
        assert_eq!(input.options, EvaluationOptions::default());
        let result = calculate_sroi(&input).unwrap();
        assert_eq!(result.result.sroi_ratio, dec!(1.2));
    }
}
