use std::fmt;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cash_flow::RevenueBreakdown;
use crate::config::EngineConfig;
use crate::cost_model::estimator::build_cost_breakdown;
use crate::error::ViabilityError;
use crate::types::{
    with_metadata, ComputationOutput, FinancialAssumptions, ProjectSpec, Rate, Technology,
};
use crate::units::implied_capacity_factor;
use crate::valuation::{FinancialMetrics, ValuationCase, ValueDriver};
use crate::ViabilityResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Resource,
    Technology,
    Grid,
    Market,
    Financial,
    Regulatory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub category: RiskCategory,
    pub level: RiskLevel,
    pub description: String,
    pub mitigation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Highest level across all categories
    pub overall_level: RiskLevel,
    pub factors: Vec<RiskFactor>,
    pub implied_capacity_factor: Rate,
}

impl RiskAssessment {
    pub fn factor(&self, category: RiskCategory) -> Option<&RiskFactor> {
        self.factors.iter().find(|f| f.category == category)
    }
}

/// Cut-offs for the categorical rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub capacity_factor_high_below: Rate,
    pub capacity_factor_medium_below: Rate,
    pub grid_high_above_km: Decimal,
    pub grid_medium_above_km: Decimal,
    /// Price multiplier for the market stress case
    pub market_price_stress: Decimal,
    /// IRR headroom over the discount rate below which financial risk is medium
    pub irr_spread_medium_below: Rate,
    /// Share of revenue from RECs and capacity payments
    pub incentive_share_high_above: Rate,
    pub incentive_share_medium_above: Rate,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            capacity_factor_high_below: dec!(0.15),
            capacity_factor_medium_below: dec!(0.25),
            grid_high_above_km: dec!(100),
            grid_medium_above_km: dec!(50),
            market_price_stress: dec!(0.8),
            irr_spread_medium_below: dec!(0.03),
            incentive_share_high_above: dec!(0.30),
            incentive_share_medium_above: dec!(0.10),
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> ViabilityResult<()> {
        if self.capacity_factor_high_below > self.capacity_factor_medium_below {
            return Err(ViabilityError::config(
                "risk.capacity_factor_high_below",
                "High-risk capacity factor cut-off must not exceed the medium one",
            ));
        }
        if self.grid_high_above_km < self.grid_medium_above_km {
            return Err(ViabilityError::config(
                "risk.grid_high_above_km",
                "High-risk grid distance must be at least the medium one",
            ));
        }
        if self.market_price_stress <= Decimal::ZERO || self.market_price_stress >= Decimal::ONE {
            return Err(ViabilityError::config(
                "risk.market_price_stress",
                "Stress multiplier must be in (0, 1)",
            ));
        }
        if self.incentive_share_high_above < self.incentive_share_medium_above {
            return Err(ViabilityError::config(
                "risk.incentive_share_high_above",
                "High-risk incentive share must be at least the medium one",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Category rules
// ---------------------------------------------------------------------------

fn factor(category: RiskCategory, level: RiskLevel, description: String, mitigation: &str) -> RiskFactor {
    RiskFactor {
        category,
        level,
        description,
        mitigation: mitigation.into(),
    }
}

fn resource_risk(capacity_factor: Rate, t: &RiskThresholds) -> RiskFactor {
    let level = if capacity_factor < t.capacity_factor_high_below {
        RiskLevel::High
    } else if capacity_factor < t.capacity_factor_medium_below {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    factor(
        RiskCategory::Resource,
        level,
        format!("Implied capacity factor {}", capacity_factor.round_dp(4)),
        "Commission an on-site resource campaign and a P90 yield assessment",
    )
}

fn technology_risk(technology: Technology) -> RiskFactor {
    let (level, mitigation) = match technology {
        Technology::Solar => (RiskLevel::Low, "Use tier-1 modules with standard warranties"),
        Technology::Wind => (
            RiskLevel::Medium,
            "Negotiate a full-scope turbine service agreement with availability guarantees",
        ),
        Technology::Hydro => (
            RiskLevel::Medium,
            "Secure water rights and model low-flow years",
        ),
        Technology::Hybrid => (
            RiskLevel::Medium,
            "Contract a single integrator for plant controls and interfaces",
        ),
    };
    factor(
        RiskCategory::Technology,
        level,
        format!("{technology} technology maturity and O&M complexity"),
        mitigation,
    )
}

fn grid_risk(distance_km: Decimal, t: &RiskThresholds) -> RiskFactor {
    let level = if distance_km > t.grid_high_above_km {
        RiskLevel::High
    } else if distance_km > t.grid_medium_above_km {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    factor(
        RiskCategory::Grid,
        level,
        format!("{distance_km} km to the nearest grid connection"),
        "Confirm interconnection capacity and curtailment terms with the network operator",
    )
}

fn market_risk(case: &ValuationCase, baseline_npv: Decimal, t: &RiskThresholds) -> ViabilityResult<RiskFactor> {
    let stressed = case
        .perturbed(ValueDriver::ElectricityPrice, t.market_price_stress)
        .npv()?;
    let level = if baseline_npv <= Decimal::ZERO {
        RiskLevel::High
    } else if stressed < Decimal::ZERO {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    Ok(factor(
        RiskCategory::Market,
        level,
        format!(
            "NPV {} at the assumed price, {} at {} x price",
            baseline_npv.round_dp(0),
            stressed.round_dp(0),
            t.market_price_stress
        ),
        "Contract a long-term PPA for the bulk of output",
    ))
}

fn financial_risk(metrics: &FinancialMetrics, t: &RiskThresholds) -> RiskFactor {
    let rate = metrics.discount_rate;
    let (level, description) = match metrics.irr_rate() {
        None => (RiskLevel::High, "IRR undefined".to_string()),
        Some(irr) if irr <= rate => (
            RiskLevel::High,
            format!("IRR {} does not exceed the {rate} discount rate", irr.round_dp(4)),
        ),
        Some(irr) if irr - rate < t.irr_spread_medium_below => (
            RiskLevel::Medium,
            format!("IRR {} is within {} of the discount rate", irr.round_dp(4), t.irr_spread_medium_below),
        ),
        Some(irr) => (
            RiskLevel::Low,
            format!("IRR {} clears the {rate} discount rate", irr.round_dp(4)),
        ),
    };
    factor(
        RiskCategory::Financial,
        level,
        description,
        "Reduce CAPEX or raise contracted revenue before financial close",
    )
}

fn regulatory_risk(revenue: &RevenueBreakdown, t: &RiskThresholds) -> RiskFactor {
    let share = if revenue.total > Decimal::ZERO {
        (revenue.rec_revenue + revenue.capacity_payments) / revenue.total
    } else {
        Decimal::ZERO
    };
    let level = if share > t.incentive_share_high_above {
        RiskLevel::High
    } else if share > t.incentive_share_medium_above {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    factor(
        RiskCategory::Regulatory,
        level,
        format!(
            "{}% of revenue depends on certificates and capacity payments",
            (share * dec!(100)).round_dp(1)
        ),
        "Lock in incentive terms contractually or stress-test without them",
    )
}

/// Deterministic category-by-category risk profile of a valued case.
pub fn assess_risk(
    spec: &ProjectSpec,
    case: &ValuationCase,
    metrics: &FinancialMetrics,
    revenue: &RevenueBreakdown,
    thresholds: &RiskThresholds,
) -> ViabilityResult<RiskAssessment> {
    let capacity_factor = implied_capacity_factor(spec.annual_generation_mwh(), spec.capacity_mw)?;

    let factors = vec![
        resource_risk(capacity_factor, thresholds),
        technology_risk(spec.technology),
        grid_risk(spec.location.distance_to_grid_km, thresholds),
        market_risk(case, metrics.net_present_value, thresholds)?,
        financial_risk(metrics, thresholds),
        regulatory_risk(revenue, thresholds),
    ];

    let overall_level = factors
        .iter()
        .map(|f| f.level)
        .max()
        .unwrap_or(RiskLevel::Low);

    debug!(overall = %overall_level, capacity_factor = %capacity_factor, "risk assessed");

    Ok(RiskAssessment {
        overall_level,
        factors,
        implied_capacity_factor: capacity_factor,
    })
}

// ---------------------------------------------------------------------------
// Standalone entry point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskInput {
    pub project: ProjectSpec,
    #[serde(default)]
    pub assumptions: FinancialAssumptions,
}

pub fn run_risk_assessment(
    input: &RiskInput,
    config: &EngineConfig,
) -> ViabilityResult<ComputationOutput<RiskAssessment>> {
    let start = Instant::now();

    input.project.validate()?;
    input.assumptions.validate()?;

    let costs = build_cost_breakdown(&input.project, &config.cost_tables)?;
    let case = ValuationCase::new(&input.project, &input.assumptions, &costs);
    let valuation = case.value(&config.solver)?;
    let mut warnings = valuation.warnings;

    let assessment = assess_risk(
        &input.project,
        &case,
        &valuation.metrics,
        &valuation.revenue,
        &config.risk,
    )?;
    if assessment.overall_level == RiskLevel::High {
        let high: Vec<String> = assessment
            .factors
            .iter()
            .filter(|f| f.level == RiskLevel::High)
            .map(|f| format!("{:?}", f.category).to_lowercase())
            .collect();
        warnings.push(format!("High risk in: {}", high.join(", ")));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Rule-based categorical risk scoring",
        &serde_json::json!({
            "thresholds": config.risk,
            "discount_rate": input.assumptions.discount_rate.to_string(),
        }),
        warnings,
        elapsed,
        assessment,
    ))
}
