use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use viability_core::risk::{self, RiskInput};
use viability_core::scenarios::sensitivity::{self, SensitivityInput};
use viability_core::valuation::ValueDriver;
use viability_core::EngineConfig;

use super::project::{AssumptionArgs, ProjectArgs};
use crate::input;

/// Arguments for an NPV sensitivity sweep
#[derive(Args)]
pub struct SensitivityArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub assumptions: AssumptionArgs,

    /// Variables to sweep: electricity_price, discount_rate, generation, capex, opex
    #[arg(long, value_delimiter = ',')]
    pub variables: Vec<String>,

    /// Multipliers applied to each variable, e.g. 0.8,0.9,1.0,1.1,1.2
    #[arg(long, value_delimiter = ',')]
    pub multipliers: Vec<Decimal>,
}

/// Arguments for a risk assessment
#[derive(Args)]
pub struct RiskArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub assumptions: AssumptionArgs,
}

pub fn run_sensitivity(args: SensitivityArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let sweep_input: SensitivityInput = input::resolve(args.project.input.as_deref(), || {
        let project = args.project.to_json()?;
        let settings = if args.variables.is_empty() && args.multipliers.is_empty() {
            Value::Null
        } else {
            let variables = if args.variables.is_empty() {
                config.sensitivity.variables.clone()
            } else {
                args.variables
                    .iter()
                    .map(|v| v.parse::<ValueDriver>())
                    .collect::<Result<Vec<_>, _>>()?
            };
            let multipliers = if args.multipliers.is_empty() {
                config.sensitivity.multipliers.clone()
            } else {
                args.multipliers.clone()
            };
            json!({
                "variables": variables,
                "multipliers": multipliers.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
            })
        };
        Ok(json!({
            "project": project,
            "assumptions": args.assumptions.to_json(),
            "settings": settings,
        }))
    })?;

    let result = sensitivity::run_sensitivity(&sweep_input, config)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_risk(args: RiskArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let risk_input: RiskInput = input::resolve(args.project.input.as_deref(), || {
        let project = args.project.to_json()?;
        Ok(json!({
            "project": project,
            "assumptions": args.assumptions.to_json(),
        }))
    })?;

    let result = risk::run_risk_assessment(&risk_input, config)?;
    Ok(serde_json::to_value(result)?)
}
