use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SroiError;
use crate::sroi::engine::{calculate_sroi, AggregateResult, SroiInput};
use crate::types::*;
use crate::SroiResult;

/// Most values a single sensitivity variable may sweep through.
pub const MAX_SWEEP_POINTS: usize = 200;

/// Output metric read from each evaluated scenario
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SroiMetric {
    #[default]
    SroiRatio,
    NetBenefit,
    TotalBenefitPv,
    Irr,
}

impl SroiMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SroiMetric::SroiRatio => "sroi_ratio",
            SroiMetric::NetBenefit => "net_benefit",
            SroiMetric::TotalBenefitPv => "total_benefit_pv",
            SroiMetric::Irr => "irr",
        }
    }

    fn extract(&self, result: &AggregateResult) -> SroiResult<Decimal> {
        match self {
            SroiMetric::SroiRatio => Ok(result.sroi_ratio),
            SroiMetric::NetBenefit => Ok(result.net_benefit),
            SroiMetric::TotalBenefitPv => Ok(result.total_benefit_pv),
            SroiMetric::Irr => result.irr.ok_or_else(|| SroiError::InvalidInput {
                field: "irr".into(),
                reason: "IRR not available for this scenario".into(),
            }),
        }
    }
}

/// Input for a 2-way SROI sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SroiSensitivityInput {
    /// Base case
    pub base: SroiInput,
    /// Row variable (see [`SroiVariable`] for accepted names)
    pub variable_1: SensitivityVariable,
    /// Column variable
    pub variable_2: SensitivityVariable,
    #[serde(default)]
    pub output_metric: SroiMetric,
}

/// Output of 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub variable_1_name: String,
    pub variable_2_name: String,
    pub variable_1_values: Vec<Decimal>,
    pub variable_2_values: Vec<Decimal>,
    pub output_metric: String,
    /// Matrix[i][j] = output when variable_1 = variable_1_values[i], variable_2 = variable_2_values[j]
    pub matrix: Vec<Vec<Decimal>>,
    /// Base case output value
    pub base_case_value: Decimal,
    /// Position of the base case in the matrix (row, col)
    pub base_case_position: (usize, usize),
}

/// SROI inputs that can be swept.
///
/// Parameter overrides replace the project parameter; outcome overrides set
/// the percentage on every outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SroiVariable {
    DiscountRate,
    TotalCost,
    ProjectDurationYears,
    Deadweight,
    Attribution,
    Displacement,
    Dropoff,
}

impl SroiVariable {
    pub fn parse(name: &str) -> SroiResult<Self> {
        match name {
            "discount_rate" => Ok(SroiVariable::DiscountRate),
            "total_cost" => Ok(SroiVariable::TotalCost),
            "project_duration_years" => Ok(SroiVariable::ProjectDurationYears),
            "deadweight" => Ok(SroiVariable::Deadweight),
            "attribution" => Ok(SroiVariable::Attribution),
            "displacement" => Ok(SroiVariable::Displacement),
            "dropoff" => Ok(SroiVariable::Dropoff),
            other => Err(SroiError::InvalidInput {
                field: format!("variable:{other}"),
                reason: "Unknown sensitivity variable".into(),
            }),
        }
    }

    fn apply(&self, input: &mut SroiInput, value: Decimal) -> SroiResult<()> {
        match self {
            SroiVariable::DiscountRate => input.parameters.discount_rate = value,
            SroiVariable::TotalCost => input.parameters.total_cost = value,
            SroiVariable::ProjectDurationYears => {
                input.parameters.project_duration_years =
                    value.trunc().to_u32().ok_or_else(|| SroiError::InvalidInput {
                        field: "project_duration_years".into(),
                        reason: format!("{value} is not a valid number of years"),
                    })?;
            }
            SroiVariable::Deadweight => input.outcomes.iter_mut().for_each(|o| o.deadweight = value),
            SroiVariable::Attribution => {
                input.outcomes.iter_mut().for_each(|o| o.attribution = value)
            }
            SroiVariable::Displacement => {
                input.outcomes.iter_mut().for_each(|o| o.displacement = value)
            }
            SroiVariable::Dropoff => input.outcomes.iter_mut().for_each(|o| o.dropoff = value),
        }
        Ok(())
    }
}

/// Generate the sweep values for a sensitivity variable from min to max with step.
fn generate_sweep_values(var: &SensitivityVariable) -> SroiResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(SroiError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(SroiError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Min must be <= max".into(),
        });
    }

    let too_many = || SroiError::InvalidInput {
        field: format!("variable:{}", var.name),
        reason: format!("Sweep may not exceed {MAX_SWEEP_POINTS} values"),
    };
    let steps = var
        .max
        .checked_sub(var.min)
        .and_then(|span| span.checked_div(var.step))
        .ok_or_else(too_many)?;
    if steps.ceil() >= Decimal::from(MAX_SWEEP_POINTS) {
        return Err(too_many());
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current = match current.checked_add(var.step) {
            Some(next) => next,
            None => break,
        };
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    if values.is_empty() {
        values.push(var.min);
    }

    Ok(values)
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Evaluate a 2-way sensitivity grid using a provided computation function.
///
/// The `eval_fn` receives (variable_1_value, variable_2_value) and returns
/// the output metric value. Failed cells are reported as warnings and left
/// at zero.
pub fn evaluate_sensitivity<F>(
    variable_1: &SensitivityVariable,
    variable_2: &SensitivityVariable,
    output_metric: &str,
    eval_fn: F,
) -> SroiResult<ComputationOutput<SensitivityOutput>>
where
    F: Fn(Decimal, Decimal) -> SroiResult<Decimal>,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let v1_values = generate_sweep_values(variable_1)?;
    let v2_values = generate_sweep_values(variable_2)?;

    let mut matrix = Vec::with_capacity(v1_values.len());

    for v1 in &v1_values {
        let mut row = Vec::with_capacity(v2_values.len());
        for v2 in &v2_values {
            match eval_fn(*v1, *v2) {
                Ok(val) => row.push(val),
                Err(e) => {
                    warnings.push(format!("Evaluation failed at ({v1}, {v2}): {e}"));
                    row.push(Decimal::ZERO);
                }
            }
        }
        matrix.push(row);
    }

    let mid1 = variable_1.min / dec!(2) + variable_1.max / dec!(2);
    let mid2 = variable_2.min / dec!(2) + variable_2.max / dec!(2);
    let base_row = closest_index(&v1_values, mid1);
    let base_col = closest_index(&v2_values, mid2);
    let base_case_value = matrix[base_row][base_col];

    let output = SensitivityOutput {
        variable_1_name: variable_1.name.clone(),
        variable_2_name: variable_2.name.clone(),
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        output_metric: output_metric.to_string(),
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way Sensitivity Analysis (Evaluated)",
        &serde_json::json!({
            "variable_1": variable_1.name,
            "variable_2": variable_2.name,
            "output_metric": output_metric,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Sweep two SROI inputs around a base case and tabulate the chosen metric.
pub fn sroi_sensitivity(
    input: &SroiSensitivityInput,
) -> SroiResult<ComputationOutput<SensitivityOutput>> {
    let row_var = SroiVariable::parse(&input.variable_1.name)?;
    let col_var = SroiVariable::parse(&input.variable_2.name)?;
    if row_var == col_var {
        return Err(SroiError::InvalidInput {
            field: "variable_2".into(),
            reason: "Sensitivity variables must differ".into(),
        });
    }

    let metric = input.output_metric;
    evaluate_sensitivity(
        &input.variable_1,
        &input.variable_2,
        metric.as_str(),
        |v1, v2| {
            let mut scenario = input.base.clone();
            row_var.apply(&mut scenario, v1)?;
            col_var.apply(&mut scenario, v2)?;
            let out = calculate_sroi(&scenario)?;
            metric.extract(&out.result)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sroi::engine::{EvaluationOptions, ProjectParameters};
    use crate::valuation::outcome::Outcome;
    use rust_decimal_macros::dec;

    fn base_input() -> SroiInput {
        SroiInput {
            outcomes: vec![Outcome {
                name: "Reduced isolation".into(),
                quantity: dec!(200),
                unit_value: dec!(300),
                deadweight: dec!(25),
                dropoff: dec!(10),
                duration: 4,
                ..Default::default()
            }],
            parameters: ProjectParameters {
                total_cost: dec!(100000),
                discount_rate: dec!(3.5),
                project_duration_years: 4,
            },
            options: EvaluationOptions::default(),
        }
    }

    fn variable(name: &str, min: Decimal, max: Decimal, step: Decimal) -> SensitivityVariable {
        SensitivityVariable {
            name: name.into(),
            min,
            max,
            step,
        }
    }

    #[test]
    fn test_generate_sweep_values() {
        let var = variable("x", dec!(0.05), dec!(0.10), dec!(0.01));
        let vals = generate_sweep_values(&var).unwrap();
        assert_eq!(vals.len(), 6);
        assert_eq!(vals[0], dec!(0.05));
        assert_eq!(vals[5], dec!(0.10));
    }

    #[test]
    fn test_generate_sweep_values_appends_max() {
        let var = variable("x", dec!(0), dec!(10), dec!(4));
        let vals = generate_sweep_values(&var).unwrap();
        assert_eq!(vals, vec![dec!(0), dec!(4), dec!(8), dec!(10)]);
    }

    #[test]
    fn test_invalid_step() {
        let var = variable("x", dec!(0.05), dec!(0.10), dec!(0));
        assert!(generate_sweep_values(&var).is_err());
    }

    #[test]
    fn test_sweep_length_is_capped() {
        let var = variable("x", dec!(0), dec!(1000000), dec!(1));
        assert!(matches!(
            generate_sweep_values(&var),
            Err(SroiError::InvalidInput { .. })
        ));

        let tiny_step = variable("x", dec!(0), dec!(1), Decimal::new(1, 28));
        assert!(generate_sweep_values(&tiny_step).is_err());

        let widest = variable("x", Decimal::MIN, Decimal::MAX, dec!(1));
        assert!(generate_sweep_values(&widest).is_err());

        let at_limit = variable("x", dec!(1), Decimal::from(MAX_SWEEP_POINTS), dec!(1));
        assert_eq!(generate_sweep_values(&at_limit).unwrap().len(), MAX_SWEEP_POINTS);
    }

    #[test]
    fn test_closest_index() {
        let vals = vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)];
        assert_eq!(closest_index(&vals, dec!(3)), 2);
        assert_eq!(closest_index(&vals, dec!(2.4)), 1);
    }

    #[test]
    fn test_sroi_sensitivity_discount_rate_vs_deadweight() {
        let input = SroiSensitivityInput {
            base: base_input(),
            variable_1: variable("discount_rate", dec!(0), dec!(10), dec!(5)),
            variable_2: variable("deadweight", dec!(0), dec!(50), dec!(25)),
            output_metric: SroiMetric::SroiRatio,
        };
        let result = sroi_sensitivity(&input).unwrap();
        let out = &result.result;
        assert_eq!(out.matrix.len(), 3);
        assert_eq!(out.matrix[0].len(), 3);
        assert_eq!(out.base_case_position, (1, 1));
        assert!(result.warnings.is_empty());

        // Higher discount rate -> lower ratio
        assert!(out.matrix[0][0] > out.matrix[1][0]);
        assert!(out.matrix[1][0] > out.matrix[2][0]);
        // Higher deadweight -> lower ratio
        assert!(out.matrix[0][0] > out.matrix[0][1]);
        assert!(out.matrix[0][1] > out.matrix[0][2]);
    }

    #[test]
    fn test_sroi_sensitivity_failed_cells_become_warnings() {
        let input = SroiSensitivityInput {
            base: base_input(),
            variable_1: variable("total_cost", dec!(0), dec!(100000), dec!(50000)),
            variable_2: variable("dropoff", dec!(0), dec!(20), dec!(10)),
            output_metric: SroiMetric::NetBenefit,
        };
        let result = sroi_sensitivity(&input).unwrap();
        // total_cost = 0 row fails InvalidCost in every column
        assert_eq!(result.warnings.len(), 3);
        assert!(result.result.matrix[0].iter().all(|v| v.is_zero()));
    }

    #[test]
    fn test_sroi_sensitivity_unknown_variable() {
        let input = SroiSensitivityInput {
            base: base_input(),
            variable_1: variable("inflation", dec!(0), dec!(1), dec!(1)),
            variable_2: variable("dropoff", dec!(0), dec!(20), dec!(10)),
            output_metric: SroiMetric::SroiRatio,
        };
        assert!(matches!(
            sroi_sensitivity(&input),
            Err(SroiError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_sroi_sensitivity_same_variable_twice() {
        let input = SroiSensitivityInput {
            base: base_input(),
            variable_1: variable("dropoff", dec!(0), dec!(20), dec!(10)),
            variable_2: variable("dropoff", dec!(0), dec!(20), dec!(10)),
            output_metric: SroiMetric::SroiRatio,
        };
        assert!(sroi_sensitivity(&input).is_err());
    }
}
