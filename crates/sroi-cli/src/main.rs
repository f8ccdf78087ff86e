mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::evaluate::{EvaluateArgs, StreamArgs};
use commands::projects::{CompleteArgs, PortfolioArgs};
use commands::scenarios::SensitivityArgs;

/// Social Return on Investment valuation
#[derive(Parser)]
#[command(
    name = "sroi",
    version,
    about = "Social Return on Investment valuation",
    long_about = "A CLI for valuing the social outcomes of a project with decimal \
                  precision. Adjusts outcomes for deadweight, attribution, displacement \
                  and drop-off, discounts them, and reports the SROI ratio, payback \
                  period, IRR and sensitivity grids."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log engine diagnostics to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate outcomes against an investment (SROI ratio, payback, IRR)
    Evaluate(EvaluateArgs),
    /// Year-by-year present value stream for a single outcome
    Stream(StreamArgs),
    /// Two-variable sensitivity grid over an evaluation
    Sensitivity(SensitivityArgs),
    /// Value a draft project record and mark it completed
    Complete(CompleteArgs),
    /// Dashboard summary across project records
    Portfolio(PortfolioArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Evaluate(args) => commands::evaluate::run_evaluate(args),
        Commands::Stream(args) => commands::evaluate::run_stream(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args),
        Commands::Complete(args) => commands::projects::run_complete(args),
        Commands::Portfolio(args) => commands::projects::run_portfolio(args),
        Commands::Version => {
            println!("sroi {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
