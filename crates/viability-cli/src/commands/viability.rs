use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use viability_core::viability::{self, ViabilityInput};
use viability_core::EngineConfig;

use crate::input;

/// Arguments for scoring pre-computed metrics
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ViabilityArgs {
    /// Net present value in USD
    #[arg(long)]
    pub npv: Option<Decimal>,

    /// Internal rate of return as a decimal; omit when undefined
    #[arg(long)]
    pub irr: Option<Decimal>,

    /// Simple payback in years; omit when undefined
    #[arg(long)]
    pub payback: Option<Decimal>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_viability(args: ViabilityArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let score_input: ViabilityInput = input::resolve(args.input.as_deref(), || {
        let npv = args.npv.ok_or("--npv is required (or provide --input)")?;
        Ok(json!({
            "net_present_value": npv.to_string(),
            "internal_rate_of_return": args.irr.map(|v| v.to_string()),
            "payback_period_years": args.payback.map(|v| v.to_string()),
        }))
    })?;

    let result = viability::assess_viability(&score_input, &config.viability)?;
    Ok(serde_json::to_value(result)?)
}
