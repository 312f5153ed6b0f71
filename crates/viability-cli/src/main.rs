mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;
use viability_core::EngineConfig;

use commands::analysis::{RiskArgs, SensitivityArgs};
use commands::project::{CashFlowArgs, CostArgs, EvaluateArgs};
use commands::resource::GenerationArgs;
use commands::viability::ViabilityArgs;

/// Renewable-energy project viability engine
#[derive(Parser)]
#[command(
    name = "rve",
    version,
    about = "Renewable-energy project cost, valuation and viability analysis",
    long_about = "A CLI for estimating the cost, cash flows and financial viability of \
                  solar, wind, hydro and hybrid generation projects with decimal precision. \
                  Supports cost breakdowns, NPV/IRR/LCOE valuation, sensitivity sweeps, \
                  risk scoring and generation estimates."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (.json, .yaml or .yml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log pipeline stages to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Full evaluation: costs, cash flows, metrics, sensitivity, risk and verdict
    Evaluate(EvaluateArgs),
    /// Line-item CAPEX/OPEX estimate
    Costs(CostArgs),
    /// Year-by-year cash-flow projection
    CashFlows(CashFlowArgs),
    /// One-at-a-time NPV sensitivity sweep
    Sensitivity(SensitivityArgs),
    /// Categorical risk assessment
    Risk(RiskArgs),
    /// Estimate annual and monthly generation from site scores
    Generation(GenerationArgs),
    /// Score pre-computed NPV, IRR and payback
    Viability(ViabilityArgs),
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
    let default = if verbose { "viability_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

type CommandResult = Result<serde_json::Value, Box<dyn std::error::Error>>;

/// Load the engine configuration, then run one command against it.
fn with_config<F>(path: Option<&str>, command: F) -> CommandResult
where
    F: FnOnce(&EngineConfig) -> CommandResult,
{
    let config = input::config::load_config(path)?;
    command(&config)
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();

    let result: CommandResult = match cli.command {
        Commands::Evaluate(args) => with_config(config, |c| commands::project::run_evaluate(args, c)),
        Commands::Costs(args) => with_config(config, |c| commands::project::run_costs(args, c)),
        Commands::CashFlows(args) => with_config(config, |c| commands::project::run_cash_flows(args, c)),
        Commands::Sensitivity(args) => with_config(config, |c| commands::analysis::run_sensitivity(args, c)),
        Commands::Risk(args) => with_config(config, |c| commands::analysis::run_risk(args, c)),
        Commands::Generation(args) => with_config(config, |c| commands::resource::run_generation(args, c)),
        Commands::Viability(args) => with_config(config, |c| commands::viability::run_viability(args, c)),
        Commands::Version => {
            println!("rve {}", env!("CARGO_PKG_VERSION"));
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
