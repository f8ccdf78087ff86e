use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use sroi_core::sroi::engine::{self, EvaluationOptions, ProjectParameters, SroiInput};
use sroi_core::sroi::payback::PaybackBasis;
use sroi_core::valuation::outcome::{self, Outcome, OutcomeValuationInput};

use crate::input;

/// Undiscounted benefit the payback walk accumulates
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PaybackBasisArg {
    /// quantity x unit value, decayed by drop-off
    Gross,
    /// Value after deadweight, attribution and displacement
    Net,
}

impl From<PaybackBasisArg> for PaybackBasis {
    fn from(arg: PaybackBasisArg) -> Self {
        match arg {
            PaybackBasisArg::Gross => PaybackBasis::Gross,
            PaybackBasisArg::Net => PaybackBasis::Net,
        }
    }
}

/// Flags describing a single outcome
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct OutcomeFlags {
    /// Outcome name
    #[arg(long, default_value = "")]
    pub name: String,

    /// Number of affected units
    #[arg(long)]
    pub quantity: Option<Decimal>,

    /// Value per unit (financial proxy)
    #[arg(long)]
    pub unit_value: Option<Decimal>,

    /// Deadweight percentage (e.g. 20 for 20%)
    #[arg(long, default_value = "0")]
    pub deadweight: Decimal,

    /// Attribution percentage
    #[arg(long, default_value = "0")]
    pub attribution: Decimal,

    /// Displacement percentage
    #[arg(long, default_value = "0")]
    pub displacement: Decimal,

    /// Annual drop-off percentage
    #[arg(long, default_value = "0")]
    pub dropoff: Decimal,

    /// Years the outcome lasts
    #[arg(long, default_value = "1")]
    pub duration: u32,
}

impl OutcomeFlags {
    fn to_outcome(&self) -> Result<Outcome, Box<dyn std::error::Error>> {
        Ok(Outcome {
            name: self.name.clone(),
            stakeholder: None,
            indicator: None,
            quantity: self
                .quantity
                .ok_or("--quantity is required (or provide --input)")?,
            unit_value: self
                .unit_value
                .ok_or("--unit-value is required (or provide --input)")?,
            deadweight: self.deadweight,
            attribution: self.attribution,
            displacement: self.displacement,
            dropoff: self.dropoff,
            duration: self.duration,
        })
    }
}

/// Arguments for a full SROI evaluation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct EvaluateArgs {
    /// Path to JSON input file with outcomes, parameters and options
    #[arg(long)]
    pub input: Option<String>,

    /// Total investment
    #[arg(long)]
    pub total_cost: Option<Decimal>,

    /// Annual discount rate percentage
    #[arg(long, default_value = "3")]
    pub discount_rate: Decimal,

    /// Payback horizon in years
    #[arg(long, default_value = "1")]
    pub project_years: u32,

    /// Payback basis (overrides the input file)
    #[arg(long, value_enum)]
    pub payback_basis: Option<PaybackBasisArg>,

    /// Skip the internal rate of return
    #[arg(long)]
    pub no_irr: bool,

    #[command(flatten)]
    pub outcome: OutcomeFlags,
}

/// Arguments for a single-outcome present value stream
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct StreamArgs {
    /// Path to JSON input file with `outcome` and `discount_rate`
    #[arg(long)]
    pub input: Option<String>,

    /// Annual discount rate percentage
    #[arg(long, default_value = "3")]
    pub discount_rate: Decimal,

    #[command(flatten)]
    pub outcome: OutcomeFlags,
}

pub fn run_evaluate(args: EvaluateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sroi_input: SroiInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        SroiInput {
            outcomes: vec![args.outcome.to_outcome()?],
            parameters: ProjectParameters {
                total_cost: args
                    .total_cost
                    .ok_or("--total-cost is required (or provide --input)")?,
                discount_rate: args.discount_rate,
                project_duration_years: args.project_years,
            },
            options: EvaluationOptions::default(),
        }
    };

    if let Some(basis) = args.payback_basis {
        sroi_input.options.payback_basis = basis.into();
    }
    if args.no_irr {
        sroi_input.options.compute_irr = false;
    }

    let result = engine::calculate_sroi(&sroi_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_stream(args: StreamArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let stream_input: OutcomeValuationInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        OutcomeValuationInput {
            outcome: args.outcome.to_outcome()?,
            discount_rate: args.discount_rate,
        }
    };

    let result = outcome::calculate_outcome_value(&stream_input)?;
    Ok(serde_json::to_value(result)?)
}
