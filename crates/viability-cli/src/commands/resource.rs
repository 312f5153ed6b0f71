use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use viability_core::resource::{self, GenerationInput};
use viability_core::{EngineConfig, Technology};

use crate::input;

/// Arguments for a generation estimate
#[derive(Args)]
pub struct GenerationArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// solar, wind, hydro or hybrid
    #[arg(long)]
    pub technology: Option<String>,

    /// Installed capacity in MW
    #[arg(long)]
    pub capacity_mw: Option<Decimal>,

    /// Solar resource score in [0, 1] (default 0.5)
    #[arg(long)]
    pub solar_potential: Option<Decimal>,

    /// Wind resource score in [0, 1] (default 0.5)
    #[arg(long)]
    pub wind_potential: Option<Decimal>,

    /// Hydro resource score in [0, 1] (default 0.5)
    #[arg(long)]
    pub hydro_potential: Option<Decimal>,

    /// Environmental derating in [0, 1] (default 0.8)
    #[arg(long)]
    pub environmental_factor: Option<Decimal>,

    /// Explicit capacity factor, replacing the score-derived one
    #[arg(long)]
    pub capacity_factor: Option<Decimal>,

    /// Grid emission factor in tCO2/MWh (default 0.5)
    #[arg(long)]
    pub emission_factor: Option<Decimal>,
}

pub fn run_generation(args: GenerationArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let gen_input: GenerationInput = input::resolve(args.input.as_deref(), || {
        let technology: Technology = args
            .technology
            .as_deref()
            .ok_or("--technology is required (or provide --input)")?
            .parse()?;
        let capacity = args
            .capacity_mw
            .ok_or("--capacity-mw is required (or provide --input)")?;

        let mut site = Map::new();
        let scores = [
            ("solar_potential", args.solar_potential),
            ("wind_potential", args.wind_potential),
            ("hydro_potential", args.hydro_potential),
            ("environmental_factor", args.environmental_factor),
        ];
        for (key, value) in scores {
            if let Some(v) = value {
                site.insert(key.into(), Value::String(v.to_string()));
            }
        }

        Ok(json!({
            "technology": technology,
            "capacity_mw": capacity.to_string(),
            "site": site,
            "capacity_factor": args.capacity_factor.map(|v| v.to_string()),
            "grid_emission_factor_t_per_mwh": args.emission_factor.map(|v| v.to_string()),
        }))
    })?;

    let result = resource::run_generation_estimate(&gen_input, config)?;
    Ok(serde_json::to_value(result)?)
}
