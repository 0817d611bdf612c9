mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use merger_impact_core::risk::classifier::RiskModel;

use commands::forecast::ForecastArgs;
use commands::policies::PoliciesArgs;
use commands::risk::RiskArgs;
use commands::scenario::EvaluateArgs;
use commands::structure::StructureArgs;

/// Bank merger counterfactual pricing and risk scoring
#[derive(Parser)]
#[command(
    name = "mia",
    version,
    about = "Bank merger counterfactual pricing and risk scoring",
    long_about = "Evaluates a bank merger scenario: fringe-floor share normalization, \
                  HHI concentration, a smoothed no-merger CDS spread path with a \
                  bootstrap band, pass-through welfare split and a Low/Medium/High \
                  regulatory risk verdict."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Debug logging on stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a full merger scenario
    Evaluate(EvaluateArgs),
    /// Normalize shares and compute pre/post-merger HHI
    Structure(StructureArgs),
    /// Score merger risk from known HHI figures
    Risk(RiskArgs),
    /// Predict the no-merger price path with a bootstrap band
    Forecast(ForecastArgs),
    /// List policy regimes and their thresholds
    Policies(PoliciesArgs),
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

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RiskModelArg {
    Threshold,
    Contestability,
}

impl From<RiskModelArg> for RiskModel {
    fn from(arg: RiskModelArg) -> Self {
        match arg {
            RiskModelArg::Threshold => RiskModel::Threshold,
            RiskModelArg::Contestability => RiskModel::Contestability,
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Evaluate(args) => commands::scenario::run_evaluate(args),
        Commands::Structure(args) => commands::structure::run_structure(args),
        Commands::Risk(args) => commands::risk::run_risk(args),
        Commands::Forecast(args) => commands::forecast::run_forecast(args),
        Commands::Policies(args) => commands::policies::run_policies(args),
        Commands::Version => {
            println!("mia {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
