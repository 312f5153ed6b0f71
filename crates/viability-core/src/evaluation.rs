use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info_span};

use crate::cash_flow::{CashFlowSeries, RevenueBreakdown};
use crate::config::EngineConfig;
use crate::cost_model::breakdown::CostBreakdown;
use crate::cost_model::estimator::build_cost_breakdown;
use crate::types::{with_metadata, ComputationOutput, FinancialAssumptions, ProjectSpec};
use crate::valuation::{FinancialMetrics, ValuationCase};
use crate::viability::{assess_metrics, ViabilityAssessment};
use crate::ViabilityResult;

#[cfg(feature = "risk")]
use crate::risk::{assess_risk, RiskAssessment};
#[cfg(feature = "sensitivity")]
use crate::scenarios::sensitivity::{sensitivity_table, SensitivityTable, SweepSettings};

/// Optional stages of a full evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationOptions {
    pub include_sensitivity: bool,
    pub include_risk: bool,
    /// Replaces the configured sweep for this run
    #[cfg(feature = "sensitivity")]
    pub sensitivity: Option<SweepSettings>,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            include_sensitivity: true,
            include_risk: true,
            #[cfg(feature = "sensitivity")]
            sensitivity: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEvaluationInput {
    pub project: ProjectSpec,
    #[serde(default)]
    pub assumptions: FinancialAssumptions,
    #[serde(default)]
    pub options: EvaluationOptions,
}

/// Everything produced for one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEvaluation {
    pub project: ProjectSpec,
    pub cost_breakdown: CostBreakdown,
    pub revenue: RevenueBreakdown,
    pub cash_flows: CashFlowSeries,
    pub metrics: FinancialMetrics,
    #[cfg(feature = "sensitivity")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<SensitivityTable>,
    #[cfg(feature = "risk")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAssessment>,
    pub viability: ViabilityAssessment,
}

/// Cost model, projection, valuation and viability scoring for one
/// project, plus the optional sensitivity and risk stages.
pub fn evaluate_project(
    input: &ProjectEvaluationInput,
    config: &EngineConfig,
) -> ViabilityResult<ComputationOutput<ProjectEvaluation>> {
    let start = Instant::now();
    let span = info_span!(
        "evaluate_project",
        technology = %input.project.technology,
        capacity_mw = %input.project.capacity_mw
    );
    let _guard = span.enter();

    config.validate()?;
    input.project.validate()?;
    input.assumptions.validate()?;

    let cost_breakdown = build_cost_breakdown(&input.project, &config.cost_tables)?;
    let case = ValuationCase::new(&input.project, &input.assumptions, &cost_breakdown);
    let valuation = case.value(&config.solver)?;
    let mut warnings = valuation.warnings;

    if cost_breakdown.location_multiplier() > Decimal::ONE {
        warnings.push(format!(
            "Site is {} km from the grid; CAPEX scaled by {}",
            input.project.location.distance_to_grid_km,
            cost_breakdown.location_multiplier()
        ));
    }

    #[cfg(feature = "sensitivity")]
    let sensitivity = if input.options.include_sensitivity {
        let settings = input.options.sensitivity.as_ref().unwrap_or(&config.sensitivity);
        Some(sensitivity_table(&case, settings, &mut warnings)?)
    } else {
        None
    };

    #[cfg(feature = "risk")]
    let risk = if input.options.include_risk {
        Some(assess_risk(
            &input.project,
            &case,
            &valuation.metrics,
            &valuation.revenue,
            &config.risk,
        )?)
    } else {
        None
    };

    let viability = assess_metrics(&valuation.metrics, &config.viability);
    debug!(
        score = viability.total_score,
        verdict = %viability.verdict,
        "evaluation complete"
    );

    let output = ProjectEvaluation {
        project: input.project.clone(),
        cost_breakdown,
        revenue: valuation.revenue,
        cash_flows: valuation.series,
        metrics: valuation.metrics,
        #[cfg(feature = "sensitivity")]
        sensitivity,
        #[cfg(feature = "risk")]
        risk,
        viability,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Flat-profile DCF valuation with additive viability scoring",
        &serde_json::json!({
            "electricity_price_usd_per_mwh": input.assumptions.electricity_price_usd_per_mwh.to_string(),
            "project_lifetime_years": input.assumptions.project_lifetime_years,
            "discount_rate": input.assumptions.discount_rate.to_string(),
            "irr_tolerance_usd": config.solver.npv_tolerance.to_string(),
            "irr_max_iterations": config.solver.max_iterations,
            "irr_hurdle": config.viability.irr.low.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViabilityError;
    use crate::types::{LocationProfile, Technology};
    use crate::units::EnergyQuantity;
    use crate::viability::ViabilityVerdict;
    use rust_decimal_macros::dec;

    fn input(price: Decimal) -> ProjectEvaluationInput {
        ProjectEvaluationInput {
            project: ProjectSpec {
                name: Some("Test Solar".into()),
                technology: Technology::Solar,
                capacity_mw: dec!(100),
                location: LocationProfile {
                    distance_to_grid_km: dec!(10),
                    ..Default::default()
                },
                annual_generation: EnergyQuantity::mwh(dec!(200000)),
                commercial_operation_date: None,
            },
            assumptions: FinancialAssumptions {
                electricity_price_usd_per_mwh: price,
                ..Default::default()
            },
            options: EvaluationOptions::default(),
        }
    }

    #[test]
    #[cfg(all(feature = "sensitivity", feature = "risk"))]
    fn test_full_evaluation_at_80() {
        let out = evaluate_project(&input(dec!(80)), &EngineConfig::default()).unwrap();
        let e = &out.result;
        assert_eq!(e.cost_breakdown.total_capex(), dec!(100000000));
        assert_eq!(e.cash_flows.entries.len(), 26);
        assert!(e.metrics.net_present_value > dec!(44000000));
        assert_eq!(e.viability.total_score, 7);
        assert_eq!(e.viability.verdict, ViabilityVerdict::HighlyViable);
        assert!(e.sensitivity.is_some());
        assert!(e.risk.is_some());
    }

    #[test]
    #[cfg(all(feature = "sensitivity", feature = "risk"))]
    fn test_optional_stages_can_be_skipped() {
        let mut i = input(dec!(50));
        i.options.include_sensitivity = false;
        i.options.include_risk = false;
        let out = evaluate_project(&i, &EngineConfig::default()).unwrap();
        assert!(out.result.sensitivity.is_none());
        assert!(out.result.risk.is_none());
        let json = serde_json::to_value(&out.result).unwrap();
        assert!(json.get("sensitivity").is_none());
    }

    #[test]
    fn test_invalid_project_rejected_before_any_stage() {
        let mut i = input(dec!(50));
        i.project.capacity_mw = dec!(-5);
        assert!(matches!(
            evaluate_project(&i, &EngineConfig::default()),
            Err(ViabilityError::InvalidProjectSpec { .. })
        ));
    }

    #[test]
    fn test_input_parses_from_json_with_defaults() {
        let json = r#"{
            "project": {
                "technology": "wind",
                "capacity_mw": "50",
                "location": { "distance_to_grid_km": "20" },
                "annual_generation": { "value": "150", "unit": "gwh" }
            }
        }"#;
        let i: ProjectEvaluationInput = serde_json::from_str(json).unwrap();
        assert_eq!(i.project.annual_generation_mwh(), dec!(150000));
        assert_eq!(i.assumptions.project_lifetime_years, 25);
        assert!(i.options.include_risk);
        assert!(evaluate_project(&i, &EngineConfig::default()).is_ok());
    }
}
