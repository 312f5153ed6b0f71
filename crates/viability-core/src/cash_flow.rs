use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::cost_model::breakdown::CostBreakdown;
use crate::cost_model::estimator::build_cost_breakdown;
use crate::cost_model::tables::CostTables;
use crate::error::ViabilityError;
use crate::types::{
    with_metadata, ComputationOutput, FinancialAssumptions, Megawatts, MegawattHours, Money,
    ProjectSpec, MAX_PROJECT_LIFETIME_YEARS,
};
use crate::ViabilityResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything the projector needs, already reduced to canonical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionInputs {
    pub total_capex: Money,
    pub annual_opex: Money,
    pub annual_generation_mwh: MegawattHours,
    pub capacity_mw: Megawatts,
    pub electricity_price_usd_per_mwh: Money,
    pub rec_price_usd_per_mwh: Option<Money>,
    pub capacity_payment_usd_per_mw_year: Option<Money>,
    pub lifetime_years: u32,
    pub commercial_operation_date: Option<NaiveDate>,
}

impl ProjectionInputs {
    pub fn from_parts(
        spec: &ProjectSpec,
        assumptions: &FinancialAssumptions,
        costs: &CostBreakdown,
    ) -> Self {
        Self {
            total_capex: costs.total_capex(),
            annual_opex: costs.annual_opex(),
            annual_generation_mwh: spec.annual_generation_mwh(),
            capacity_mw: spec.capacity_mw,
            electricity_price_usd_per_mwh: assumptions.electricity_price_usd_per_mwh,
            rec_price_usd_per_mwh: assumptions.rec_price_usd_per_mwh,
            capacity_payment_usd_per_mw_year: assumptions.capacity_payment_usd_per_mw_year,
            lifetime_years: assumptions.project_lifetime_years,
            commercial_operation_date: spec.commercial_operation_date,
        }
    }
}

/// Annual revenue by source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueBreakdown {
    pub energy_sales: Money,
    pub rec_revenue: Money,
    pub capacity_payments: Money,
    pub total: Money,
}

/// One year of the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowEntry {
    /// 0 = construction / financial close, 1..N = operating years
    pub year: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_year: Option<i32>,
    pub revenue: Money,
    pub opex: Money,
    pub capex: Money,
    pub net_cash_flow: Money,
    pub cumulative_cash_flow: Money,
}

/// Year-indexed net cash flows, year 0 first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSeries {
    pub entries: Vec<CashFlowEntry>,
}

impl CashFlowSeries {
    pub fn net_flows(&self) -> Vec<Money> {
        self.entries.iter().map(|e| e.net_cash_flow).collect()
    }

    pub fn lifetime_years(&self) -> u32 {
        self.entries.len().saturating_sub(1) as u32
    }

    /// Sum of net flows over operating years only.
    pub fn operating_net_total(&self) -> Money {
        self.entries.iter().skip(1).map(|e| e.net_cash_flow).sum()
    }

    pub fn initial_investment(&self) -> Money {
        self.entries.first().map(|e| e.capex).unwrap_or(Decimal::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

pub fn annual_revenue(inputs: &ProjectionInputs) -> RevenueBreakdown {
    let energy_sales = inputs.annual_generation_mwh * inputs.electricity_price_usd_per_mwh;
    let rec_revenue = inputs
        .rec_price_usd_per_mwh
        .map(|p| inputs.annual_generation_mwh * p)
        .unwrap_or(Decimal::ZERO);
    let capacity_payments = inputs
        .capacity_payment_usd_per_mw_year
        .map(|p| inputs.capacity_mw * p)
        .unwrap_or(Decimal::ZERO);

    RevenueBreakdown {
        energy_sales,
        rec_revenue,
        capacity_payments,
        total: energy_sales + rec_revenue + capacity_payments,
    }
}

/// Flat projection: −CAPEX in year 0, then `revenue − opex` every year.
/// No escalation, inflation or degradation is applied.
pub fn project_cash_flows(inputs: &ProjectionInputs) -> ViabilityResult<CashFlowSeries> {
    if inputs.lifetime_years == 0 || inputs.lifetime_years > MAX_PROJECT_LIFETIME_YEARS {
        return Err(ViabilityError::assumptions(
            "project_lifetime_years",
            format!("Project lifetime must be between 1 and {MAX_PROJECT_LIFETIME_YEARS} years"),
        ));
    }

    let revenue = annual_revenue(inputs).total;
    let opex = inputs.annual_opex;
    let operating_net = revenue - opex;
    let base_year = inputs.commercial_operation_date.map(|d| d.year());

    let mut entries = Vec::with_capacity(inputs.lifetime_years as usize + 1);
    let mut cumulative = -inputs.total_capex;
    entries.push(CashFlowEntry {
        year: 0,
        calendar_year: base_year.map(|y| y - 1),
        revenue: Decimal::ZERO,
        opex: Decimal::ZERO,
        capex: inputs.total_capex,
        net_cash_flow: -inputs.total_capex,
        cumulative_cash_flow: cumulative,
    });

    for year in 1..=inputs.lifetime_years {
        cumulative += operating_net;
        entries.push(CashFlowEntry {
            year,
            calendar_year: base_year.map(|y| y + year as i32 - 1),
            revenue,
            opex,
            capex: Decimal::ZERO,
            net_cash_flow: operating_net,
            cumulative_cash_flow: cumulative,
        });
    }

    debug!(
        years = inputs.lifetime_years,
        annual_revenue = %revenue,
        annual_net = %operating_net,
        "cash flows projected"
    );

    Ok(CashFlowSeries { entries })
}

// ---------------------------------------------------------------------------
// Standalone entry point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowInput {
    pub project: ProjectSpec,
    #[serde(default)]
    pub assumptions: FinancialAssumptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowOutput {
    pub revenue: RevenueBreakdown,
    pub annual_opex: Money,
    pub annual_net_cash_flow: Money,
    pub total_capex: Money,
    pub series: CashFlowSeries,
}

/// Cost model plus projection, without valuation.
pub fn build_cash_flows(
    input: &CashFlowInput,
    tables: &CostTables,
) -> ViabilityResult<ComputationOutput<CashFlowOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.project.validate()?;
    input.assumptions.validate()?;

    let costs = build_cost_breakdown(&input.project, tables)?;
    let inputs = ProjectionInputs::from_parts(&input.project, &input.assumptions, &costs);
    let revenue = annual_revenue(&inputs);
    let series = project_cash_flows(&inputs)?;
    let annual_net = revenue.total - inputs.annual_opex;

    if annual_net <= Decimal::ZERO {
        warnings.push(format!(
            "Annual OPEX ({}) meets or exceeds annual revenue ({}); the project never recovers its CAPEX",
            inputs.annual_opex, revenue.total
        ));
    }

    let output = CashFlowOutput {
        annual_opex: inputs.annual_opex,
        annual_net_cash_flow: annual_net,
        total_capex: inputs.total_capex,
        revenue,
        series,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Flat annual cash-flow projection (no escalation or degradation)",
        &serde_json::json!({
            "electricity_price_usd_per_mwh": input.assumptions.electricity_price_usd_per_mwh.to_string(),
            "project_lifetime_years": input.assumptions.project_lifetime_years,
            "annual_generation_mwh": inputs.annual_generation_mwh.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
