//! Project snapshot: the record a host application stores per SROI study,
//! and its completion into a valued, `completed` record.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::SroiError;
use crate::sroi::engine::{evaluate_with_options, AggregateResult, EvaluationOptions, ProjectParameters};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Percent};
use crate::valuation::outcome::Outcome;
use crate::SroiResult;

/// Discount rate applied when a project does not set one.
pub const DEFAULT_DISCOUNT_RATE: Percent = dec!(3);

fn default_discount_rate() -> Percent {
    DEFAULT_DISCOUNT_RATE
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Draft,
    Completed,
}

/// A group of people or organisations affected by the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of people in the group, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Total investment
    #[serde(default)]
    pub budget: Money,
    #[serde(default = "default_discount_rate")]
    pub discount_rate: Percent,
    /// Payback horizon; derived from the dates when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_duration_years: Option<u32>,
    #[serde(default)]
    pub stakeholders: Vec<Stakeholder>,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sroi_ratio: Option<Multiple>,
    /// Present value of all outcome benefits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_npv: Option<Money>,
}

impl ProjectRecord {
    /// Engine parameters for this project.
    ///
    /// The horizon is the explicit `project_duration_years`, else the span
    /// between start and end date rounded up to whole years, else one year.
    pub fn parameters(&self) -> SroiResult<ProjectParameters> {
        let project_duration_years = match self.project_duration_years {
            Some(years) => years,
            None => self.years_between_dates()?.unwrap_or(1),
        };

        Ok(ProjectParameters {
            total_cost: self.budget,
            discount_rate: self.discount_rate,
            project_duration_years,
        })
    }

    fn years_between_dates(&self) -> SroiResult<Option<u32>> {
        let (start, end) = match (self.start_date, self.end_date) {
            (Some(s), Some(e)) => (s, e),
            _ => return Ok(None),
        };

        let days = (end - start).num_days();
        if days < 0 {
            return Err(SroiError::InvalidInput {
                field: "end_date".into(),
                reason: "End date must not precede start date".into(),
            });
        }

        let years = (Decimal::from(days) / dec!(365.25)).ceil();
        Ok(Some(years.to_u32().unwrap_or(u32::MAX).max(1)))
    }

    /// Outcomes naming a stakeholder that the project does not list.
    pub fn unknown_stakeholder_references(&self) -> Vec<(usize, String)> {
        let known: HashSet<&str> = self.stakeholders.iter().map(|s| s.name.as_str()).collect();
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(idx, o)| match &o.stakeholder {
                Some(name) if !known.contains(name.as_str()) => Some((idx, name.clone())),
                _ => None,
            })
            .collect()
    }
}

/// A completed project together with the valuation that completed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCompletion {
    pub project: ProjectRecord,
    pub valuation: AggregateResult,
}

/// Value a project and return a new record marked `completed` with its
/// SROI ratio and total NPV filled in. The input record is left untouched.
pub fn complete_project(
    record: &ProjectRecord,
    options: &EvaluationOptions,
) -> SroiResult<ComputationOutput<ProjectCompletion>> {
    let mut warnings: Vec<String> = record
        .unknown_stakeholder_references()
        .into_iter()
        .map(|(idx, name)| {
            format!("Outcome {idx} references stakeholder '{name}' which is not listed on the project")
        })
        .collect();

    let params = record.parameters()?;
    let evaluated = evaluate_with_options(&record.outcomes, &params, options)?;
    warnings.extend(evaluated.warnings);

    let valuation = evaluated.result;
    let project = ProjectRecord {
        status: ProjectStatus::Completed,
        sroi_ratio: Some(valuation.sroi_ratio),
        total_npv: Some(valuation.total_benefit_pv),
        ..record.clone()
    };

    tracing::debug!(project = %project.id, sroi_ratio = %valuation.sroi_ratio, "project completed");

    Ok(with_metadata(
        &evaluated.methodology,
        &evaluated.assumptions,
        warnings,
        evaluated.metadata.computation_time_us,
        ProjectCompletion { project, valuation },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn sample_project() -> ProjectRecord {
        ProjectRecord {
            id: "proj_1".into(),
            name: "Community kitchen".into(),
            description: String::new(),
            organization: "Food Bank".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 6, 30),
            budget: dec!(30000),
            discount_rate: dec!(0),
            project_duration_years: None,
            stakeholders: vec![Stakeholder {
                name: "Volunteers".into(),
                description: None,
                size: Some(dec!(40)),
            }],
            outcomes: vec![Outcome {
                name: "Employment".into(),
                stakeholder: Some("Volunteers".into()),
                quantity: dec!(100),
                unit_value: dec!(500),
                deadweight: dec!(20),
                attribution: dec!(10),
                ..Default::default()
            }],
            status: ProjectStatus::Draft,
            sroi_ratio: None,
            total_npv: None,
        }
    }

    #[test]
    fn test_parameters_from_dates() {
        let params = sample_project().parameters().unwrap();
        assert_eq!(params.total_cost, dec!(30000));
        // 2.5 years rounds up to 3
        assert_eq!(params.project_duration_years, 3);
    }

    #[test]
    fn test_parameters_explicit_duration_wins() {
        let project = ProjectRecord {
            project_duration_years: Some(7),
            ..sample_project()
        };
        assert_eq!(project.parameters().unwrap().project_duration_years, 7);
    }

    #[test]
    fn test_parameters_without_dates_default_to_one_year() {
        let project = ProjectRecord {
            start_date: None,
            ..sample_project()
        };
        assert_eq!(project.parameters().unwrap().project_duration_years, 1);
    }

    #[test]
    fn test_parameters_reject_reversed_dates() {
        let project = ProjectRecord {
            end_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            ..sample_project()
        };
        assert!(project.parameters().is_err());
    }

    #[test]
    fn test_default_discount_rate_on_deserialize() {
        let project: ProjectRecord =
            serde_json::from_str(r#"{"name": "Library", "budget": "1000"}"#).unwrap();
        assert_eq!(project.discount_rate, dec!(3));
        assert_eq!(project.status, ProjectStatus::Draft);
    }

    #[test]
    fn test_complete_project() {
        let draft = sample_project();
        let completed = complete_project(&draft, &EvaluationOptions::default()).unwrap();
        let project = &completed.result.project;

        assert_eq!(project.status, ProjectStatus::Completed);
        assert_eq!(project.sroi_ratio, Some(dec!(1.2)));
        assert_eq!(project.total_npv, Some(dec!(36000)));
        assert_eq!(project.name, draft.name);
        // The draft itself is not mutated
        assert_eq!(draft.status, ProjectStatus::Draft);
        assert!(completed.warnings.is_empty());
    }

    #[test]
    fn test_complete_project_warns_on_unknown_stakeholder() {
        let mut draft = sample_project();
        draft.outcomes[0].stakeholder = Some("Parents".into());
        let completed = complete_project(&draft, &EvaluationOptions::default()).unwrap();
        assert!(completed.warnings.iter().any(|w| w.contains("Parents")));
    }

    #[test]
    fn test_complete_project_propagates_engine_errors() {
        let draft = ProjectRecord {
            budget: Decimal::ZERO,
            ..sample_project()
        };
        let err = complete_project(&draft, &EvaluationOptions::default()).unwrap_err();
        assert!(matches!(err, SroiError::InvalidCost { .. }));
    }
}
