use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use sroi_core::scenarios::sensitivity::{self, SroiMetric, SroiSensitivityInput};
use sroi_core::sroi::engine::SroiInput;
use sroi_core::SensitivityVariable;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MetricArg {
    SroiRatio,
    NetBenefit,
    TotalBenefitPv,
    Irr,
}

impl From<MetricArg> for SroiMetric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::SroiRatio => SroiMetric::SroiRatio,
            MetricArg::NetBenefit => SroiMetric::NetBenefit,
            MetricArg::TotalBenefitPv => SroiMetric::TotalBenefitPv,
            MetricArg::Irr => SroiMetric::Irr,
        }
    }
}

/// Arguments for SROI sensitivity analysis
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to JSON file with a complete sensitivity input
    /// (`base`, `variable_1`, `variable_2`, `output_metric`)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to JSON file with the base case evaluation input
    #[arg(long)]
    pub base_inputs: Option<String>,

    /// First variable in format name:min:max:step
    /// (e.g. "discount_rate:0:10:2.5")
    #[arg(long)]
    pub var1: Option<String>,

    /// Second variable in format name:min:max:step
    /// (e.g. "deadweight:0:50:10")
    #[arg(long)]
    pub var2: Option<String>,

    /// Metric tabulated in the grid
    #[arg(long, value_enum, default_value = "sroi-ratio")]
    pub metric: MetricArg,
}

fn parse_sens_var(arg: &str) -> Result<SensitivityVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = arg.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sensitivity variable must be name:min:max:step, got '{}'",
            arg
        )
        .into());
    }
    Ok(SensitivityVariable {
        name: parts[0].to_string(),
        min: parts[1].parse::<Decimal>()?,
        max: parts[2].parse::<Decimal>()?,
        step: parts[3].parse::<Decimal>()?,
    })
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sens_input: SroiSensitivityInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else {
        let base: SroiInput = match args.base_inputs {
            Some(ref path) => input::file::read_json(path)?,
            None => input::stdin::read_stdin()?
                .ok_or("--input, --base-inputs or piped base case JSON is required")?,
        };
        let var1 = args.var1.as_deref().ok_or("--var1 is required")?;
        let var2 = args.var2.as_deref().ok_or("--var2 is required")?;
        SroiSensitivityInput {
            base,
            variable_1: parse_sens_var(var1)?,
            variable_2: parse_sens_var(var2)?,
            output_metric: args.metric.into(),
        }
    };

    let result = sensitivity::sroi_sensitivity(&sens_input)?;
    Ok(serde_json::to_value(result)?)
}
