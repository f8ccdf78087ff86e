use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::types::{checked_total, with_metadata, ComputationOutput, Money, Multiple};
use crate::SroiResult;

use super::record::{ProjectRecord, ProjectStatus};

/// Dashboard statistics across a user's projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_projects: usize,
    /// Projects still in draft
    pub in_progress: usize,
    pub completed: usize,
    /// Mean SROI ratio over completed projects that carry one
    pub average_sroi: Multiple,
    pub total_budget: Money,
}

pub fn summarize_projects(
    projects: &[ProjectRecord],
) -> SroiResult<ComputationOutput<PortfolioSummary>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let in_progress = projects
        .iter()
        .filter(|p| p.status == ProjectStatus::Draft)
        .count();
    let completed: Vec<&ProjectRecord> = projects
        .iter()
        .filter(|p| p.status == ProjectStatus::Completed)
        .collect();

    let ratios: Vec<Multiple> = completed.iter().filter_map(|p| p.sroi_ratio).collect();
    if ratios.len() < completed.len() {
        warnings.push(format!(
            "{} completed project(s) have no SROI ratio and are excluded from the average",
            completed.len() - ratios.len()
        ));
    }

    let average_sroi = if ratios.is_empty() {
        Decimal::ZERO
    } else {
        checked_total(ratios.iter().copied(), "average_sroi")? / Decimal::from(ratios.len())
    };

    let summary = PortfolioSummary {
        total_projects: projects.len(),
        in_progress,
        completed: completed.len(),
        average_sroi,
        total_budget: checked_total(projects.iter().map(|p| p.budget), "total_budget")?,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Portfolio summary (mean SROI of completed projects)",
        &serde_json::json!({ "project_count": projects.len() }),
        warnings,
        elapsed,
        summary,
    ))
}
