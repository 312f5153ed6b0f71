use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use viability_core::cash_flow::{self, CashFlowInput};
use viability_core::cost_model::estimator::{self, CostEstimateInput};
use viability_core::evaluation::{self, ProjectEvaluationInput};
use viability_core::{EngineConfig, Technology};

use crate::input;

/// Project description flags, shared by every project-level command
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Project name
    #[arg(long)]
    pub name: Option<String>,

    /// solar, wind, hydro or hybrid
    #[arg(long)]
    pub technology: Option<String>,

    /// Installed capacity in MW
    #[arg(long)]
    pub capacity_mw: Option<Decimal>,

    /// Expected annual generation in MWh
    #[arg(long)]
    pub generation_mwh: Option<Decimal>,

    /// Expected annual generation in GWh
    #[arg(long, conflicts_with = "generation_mwh")]
    pub generation_gwh: Option<Decimal>,

    /// Distance to the nearest grid connection in km
    #[arg(long, default_value = "0")]
    pub distance_km: Decimal,

    /// Commercial operation date (YYYY-MM-DD)
    #[arg(long)]
    pub cod: Option<String>,
}

/// Financial assumption flags; omitted values take the engine defaults
#[derive(Args)]
pub struct AssumptionArgs {
    /// Electricity price in USD/MWh (default 50)
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Project lifetime in years (default 25)
    #[arg(long)]
    pub lifetime_years: Option<u32>,

    /// Discount rate as a decimal, e.g. 0.08 (default 0.08)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Renewable energy certificate price in USD/MWh
    #[arg(long)]
    pub rec_price: Option<Decimal>,

    /// Capacity payment in USD per MW-year
    #[arg(long)]
    pub capacity_payment: Option<Decimal>,
}

/// Arguments for a full evaluation
#[derive(Args)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub assumptions: AssumptionArgs,

    /// Skip the sensitivity sweep
    #[arg(long)]
    pub no_sensitivity: bool,

    /// Skip the risk assessment
    #[arg(long)]
    pub no_risk: bool,
}

/// Arguments for a cost estimate
#[derive(Args)]
pub struct CostArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Arguments for a cash-flow projection
#[derive(Args)]
pub struct CashFlowArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub assumptions: AssumptionArgs,
}

impl ProjectArgs {
    pub fn to_json(&self) -> Result<Value, Box<dyn std::error::Error>> {
        let technology: Technology = self
            .technology
            .as_deref()
            .ok_or("--technology is required (or provide --input)")?
            .parse()?;
        let capacity = self
            .capacity_mw
            .ok_or("--capacity-mw is required (or provide --input)")?;
        let generation = match (self.generation_mwh, self.generation_gwh) {
            (Some(mwh), _) => json!({ "value": mwh.to_string(), "unit": "mwh" }),
            (None, Some(gwh)) => json!({ "value": gwh.to_string(), "unit": "gwh" }),
            (None, None) => {
                return Err("--generation-mwh or --generation-gwh is required (or provide --input)".into())
            }
        };

        Ok(json!({
            "name": self.name,
            "technology": technology,
            "capacity_mw": capacity.to_string(),
            "location": { "distance_to_grid_km": self.distance_km.to_string() },
            "annual_generation": generation,
            "commercial_operation_date": self.cod,
        }))
    }
}

impl AssumptionArgs {
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        let decimals = [
            ("electricity_price_usd_per_mwh", self.price),
            ("discount_rate", self.discount_rate),
            ("rec_price_usd_per_mwh", self.rec_price),
            ("capacity_payment_usd_per_mw_year", self.capacity_payment),
        ];
        for (key, value) in decimals {
            if let Some(v) = value {
                map.insert(key.into(), Value::String(v.to_string()));
            }
        }
        if let Some(years) = self.lifetime_years {
            map.insert("project_lifetime_years".into(), json!(years));
        }
        Value::Object(map)
    }
}

pub fn run_evaluate(args: EvaluateArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let eval_input: ProjectEvaluationInput = input::resolve(args.project.input.as_deref(), || {
        let project = args.project.to_json()?;
        Ok(json!({
            "project": project,
            "assumptions": args.assumptions.to_json(),
            "options": {
                "include_sensitivity": !args.no_sensitivity,
                "include_risk": !args.no_risk,
            },
        }))
    })?;

    let result = evaluation::evaluate_project(&eval_input, config)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_costs(args: CostArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let cost_input: CostEstimateInput = input::resolve(args.project.input.as_deref(), || {
        let project = args.project.to_json()?;
        Ok(json!({ "project": project }))
    })?;

    let result = estimator::estimate_costs(&cost_input, &config.cost_tables)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_cash_flows(args: CashFlowArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let cf_input: CashFlowInput = input::resolve(args.project.input.as_deref(), || {
        let project = args.project.to_json()?;
        Ok(json!({
            "project": project,
            "assumptions": args.assumptions.to_json(),
        }))
    })?;

    let result = cash_flow::build_cash_flows(&cf_input, &config.cost_tables)?;
    Ok(serde_json::to_value(result)?)
}
