use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use viability_core::EngineConfig;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse<T: DeserializeOwned>(json: &str) -> NapiResult<T> {
    serde_json::from_str(json).map_err(to_napi_error)
}

fn to_json(output: &impl Serialize) -> NapiResult<String> {
    serde_json::to_string(output).map_err(to_napi_error)
}

/// Engine config from an optional JSON string; defaults when absent.
fn engine_config(config_json: Option<String>) -> NapiResult<EngineConfig> {
    match config_json {
        Some(json) => EngineConfig::from_json_str(&json).map_err(to_napi_error),
        None => Ok(EngineConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Full evaluation
// ---------------------------------------------------------------------------

#[napi]
pub fn evaluate_project(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let input: viability_core::evaluation::ProjectEvaluationInput = parse(&input_json)?;
    let config = engine_config(config_json)?;
    let output = viability_core::evaluation::evaluate_project(&input, &config).map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Cost model and projection
// ---------------------------------------------------------------------------

#[napi]
pub fn estimate_costs(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let input: viability_core::cost_model::estimator::CostEstimateInput = parse(&input_json)?;
    let config = engine_config(config_json)?;
    let output = viability_core::cost_model::estimator::estimate_costs(&input, &config.cost_tables)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn project_cash_flows(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let input: viability_core::cash_flow::CashFlowInput = parse(&input_json)?;
    let config = engine_config(config_json)?;
    let output = viability_core::cash_flow::build_cash_flows(&input, &config.cost_tables)
        .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[napi]
pub fn sensitivity_analysis(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let input: viability_core::scenarios::sensitivity::SensitivityInput = parse(&input_json)?;
    let config = engine_config(config_json)?;
    let output = viability_core::scenarios::sensitivity::run_sensitivity(&input, &config)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn assess_risk(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let input: viability_core::risk::RiskInput = parse(&input_json)?;
    let config = engine_config(config_json)?;
    let output = viability_core::risk::run_risk_assessment(&input, &config).map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn score_viability(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let input: viability_core::viability::ViabilityInput = parse(&input_json)?;
    let config = engine_config(config_json)?;
    let output = viability_core::viability::assess_viability(&input, &config.viability)
        .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

#[napi]
pub fn estimate_generation(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let input: viability_core::resource::GenerationInput = parse(&input_json)?;
    let config = engine_config(config_json)?;
    let output = viability_core::resource::run_generation_estimate(&input, &config).map_err(to_napi_error)?;
    to_json(&output)
}
