use clap::Args;
use serde_json::Value;

use sroi_core::project::record::{self, ProjectRecord};
use sroi_core::project::summary;
use sroi_core::sroi::engine::EvaluationOptions;

use super::evaluate::PaybackBasisArg;
use crate::input;

/// Arguments for completing a project
#[derive(Args)]
pub struct CompleteArgs {
    /// Path to JSON project record
    #[arg(long)]
    pub input: Option<String>,

    /// Payback basis
    #[arg(long, value_enum, default_value = "gross")]
    pub payback_basis: PaybackBasisArg,

    /// Skip the internal rate of return
    #[arg(long)]
    pub no_irr: bool,
}

/// Arguments for the portfolio summary
#[derive(Args)]
pub struct PortfolioArgs {
    /// Path to JSON array of project records
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_complete(args: CompleteArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let project: ProjectRecord = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <project.json> or stdin required to complete a project".into());
    };

    let options = EvaluationOptions {
        payback_basis: args.payback_basis.into(),
        compute_irr: !args.no_irr,
    };
    let result = record::complete_project(&project, &options)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_portfolio(args: PortfolioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let projects: Vec<ProjectRecord> = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <projects.json> or stdin required for portfolio summary".into());
    };

    let result = summary::summarize_projects(&projects)?;
    Ok(serde_json::to_value(result)?)
}
