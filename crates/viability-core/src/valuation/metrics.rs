use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cash_flow::{annual_revenue, project_cash_flows, CashFlowSeries, RevenueBreakdown};
use crate::error::ViabilityError;
use crate::time_value::{self, IrrSolverSettings};
use crate::types::{MegawattHours, Metric, Money, Rate, UndefinedReason, Years};
use crate::ViabilityResult;

use super::case::ValuationCase;

/// Best IRR found by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrEstimate {
    pub rate: Rate,
    pub iterations: u32,
    pub residual_npv: Money,
    /// false when the solver hit its cap or the root lies outside [0, 1]
    pub converged: bool,
}

/// Discounted cash-flow metrics for a single case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub net_present_value: Money,
    pub internal_rate_of_return: Metric<IrrEstimate>,
    pub payback_period_years: Metric<Years>,
    pub levelized_cost_of_energy_usd_per_mwh: Metric<Money>,
    /// Lifetime gain over CAPEX, as a decimal fraction
    pub return_on_investment: Metric<Rate>,
    pub discount_rate: Rate,
    pub total_capex: Money,
    pub annual_revenue: Money,
    pub annual_opex: Money,
    pub annual_net_cash_flow: Money,
    pub lifetime_generation_mwh: MegawattHours,
}

impl FinancialMetrics {
    /// IRR rate if any estimate exists, converged or not.
    pub fn irr_rate(&self) -> Option<Rate> {
        self.internal_rate_of_return.value().map(|e| e.rate)
    }

    pub fn payback_years(&self) -> Option<Years> {
        self.payback_period_years.value().copied()
    }
}

/// Projection plus metrics for one case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Valuation {
    pub revenue: RevenueBreakdown,
    pub series: CashFlowSeries,
    pub metrics: FinancialMetrics,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Individual metrics
// ---------------------------------------------------------------------------

/// (CAPEX + PV of OPEX) / PV of generation, both discounted over years 1..N.
pub fn levelized_cost_of_energy(
    total_capex: Money,
    annual_opex: Money,
    annual_generation_mwh: MegawattHours,
    rate: Rate,
    years: u32,
) -> ViabilityResult<Metric<Money>> {
    if annual_generation_mwh <= Decimal::ZERO || years == 0 {
        return Ok(Metric::Undefined(UndefinedReason::NoGeneration));
    }
    let pv_costs = total_capex + time_value::pv_level_stream(rate, annual_opex, years)?;
    let pv_energy = time_value::pv_level_stream(rate, annual_generation_mwh, years)?;
    if pv_energy.is_zero() {
        return Err(ViabilityError::DivisionByZero {
            context: "LCOE discounted generation".into(),
        });
    }
    Ok(Metric::Defined(pv_costs / pv_energy))
}

/// Simple (undiscounted) payback: CAPEX / annual net cash flow.
pub fn payback_period(total_capex: Money, annual_net_cash_flow: Money) -> Metric<Years> {
    if annual_net_cash_flow <= Decimal::ZERO {
        return Metric::Undefined(UndefinedReason::NonPositiveNetCashFlow);
    }
    Metric::Defined(total_capex / annual_net_cash_flow)
}

/// (Σ operating net cash flow − CAPEX) / CAPEX, as a fraction.
///
/// Undefined when the project never returns cash, like IRR and payback.
pub fn return_on_investment(series: &CashFlowSeries, annual_net_cash_flow: Money) -> Metric<Rate> {
    if annual_net_cash_flow <= Decimal::ZERO {
        return Metric::Undefined(UndefinedReason::NonPositiveNetCashFlow);
    }
    let capex = series.initial_investment();
    if capex <= Decimal::ZERO {
        return Metric::Undefined(UndefinedReason::ZeroCapex);
    }
    Metric::Defined((series.operating_net_total() - capex) / capex)
}

/// IRR of a series, with solver failures folded into the metric.
pub fn irr_metric(
    flows: &[Money],
    solver: &IrrSolverSettings,
    warnings: &mut Vec<String>,
) -> ViabilityResult<Metric<IrrEstimate>> {
    if flows.first().map_or(true, |cf| *cf >= Decimal::ZERO) {
        return Ok(Metric::Undefined(UndefinedReason::NoInitialInvestment));
    }

    match time_value::irr(flows, solver) {
        Ok(sol) => Ok(Metric::Defined(IrrEstimate {
            rate: sol.rate,
            iterations: sol.iterations,
            residual_npv: sol.residual_npv,
            converged: true,
        })),
        Err(ViabilityError::UndefinedMetric { .. }) => {
            Ok(Metric::Undefined(UndefinedReason::NonPositiveNetCashFlow))
        }
        Err(ViabilityError::NonConvergence {
            function,
            iterations,
            best_estimate,
            residual,
        }) => {
            warn!(%function, iterations, %best_estimate, %residual, "IRR did not converge");
            warnings.push(format!(
                "{function} did not converge after {iterations} iterations; best estimate {best_estimate} leaves NPV of {residual}"
            ));
            Ok(Metric::Defined(IrrEstimate {
                rate: best_estimate,
                iterations,
                residual_npv: residual,
                converged: false,
            }))
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Whole-case valuation
// ---------------------------------------------------------------------------

/// Project the case's cash flows and compute every metric from them.
pub fn value_case(case: &ValuationCase, solver: &IrrSolverSettings) -> ViabilityResult<Valuation> {
    let mut warnings: Vec<String> = Vec::new();
    let inputs = &case.inputs;
    let rate = case.discount_rate;

    let revenue = annual_revenue(inputs);
    let series = project_cash_flows(inputs)?;
    let flows = series.net_flows();
    let annual_net = revenue.total - inputs.annual_opex;
    let years = series.lifetime_years();

    let net_present_value = time_value::npv(rate, &flows)?;

    let internal_rate_of_return = if annual_net <= Decimal::ZERO {
        Metric::Undefined(UndefinedReason::NonPositiveNetCashFlow)
    } else {
        irr_metric(&flows, solver, &mut warnings)?
    };

    let payback_period_years = payback_period(inputs.total_capex, annual_net);
    match payback_period_years {
        Metric::Defined(p) if p > Decimal::from(years) => warnings.push(format!(
            "Payback of {p} years exceeds the {years}-year project life"
        )),
        Metric::Undefined(reason) => warnings.push(format!("No payback within project life: {reason}")),
        _ => {}
    }

    let levelized_cost_of_energy_usd_per_mwh = levelized_cost_of_energy(
        inputs.total_capex,
        inputs.annual_opex,
        inputs.annual_generation_mwh,
        rate,
        years,
    )?;

    let metrics = FinancialMetrics {
        net_present_value,
        internal_rate_of_return,
        payback_period_years,
        levelized_cost_of_energy_usd_per_mwh,
        return_on_investment: return_on_investment(&series, annual_net),
        discount_rate: rate,
        total_capex: inputs.total_capex,
        annual_revenue: revenue.total,
        annual_opex: inputs.annual_opex,
        annual_net_cash_flow: annual_net,
        lifetime_generation_mwh: inputs.annual_generation_mwh * Decimal::from(years),
    };

    debug!(
        npv = %metrics.net_present_value,
        irr = ?metrics.irr_rate(),
        payback = ?metrics.payback_years(),
        "case valued"
    );

    Ok(Valuation {
        revenue,
        series,
        metrics,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cash_flow::ProjectionInputs;
    use rust_decimal_macros::dec;

    fn scenario_case(price: Decimal, opex: Decimal) -> ValuationCase {
        ValuationCase {
            inputs: ProjectionInputs {
                total_capex: dec!(100000000),
                annual_opex: opex,
                annual_generation_mwh: dec!(200000),
                capacity_mw: dec!(100),
                electricity_price_usd_per_mwh: price,
                rec_price_usd_per_mwh: None,
                capacity_payment_usd_per_mw_year: None,
                lifetime_years: 25,
                commercial_operation_date: None,
            },
            discount_rate: dec!(0.08),
        }
    }

    #[test]
    fn test_reference_project_metrics() {
        let v = value_case(&scenario_case(dec!(50), dec!(2500000)), &IrrSolverSettings::default()).unwrap();
        let m = &v.metrics;
        // 7.5M * annuity factor(8%, 25y) 10.674776 - 100M
        assert!((m.net_present_value - dec!(-19939180)).abs() < dec!(100));
        let irr = m.internal_rate_of_return.value().unwrap();
        assert!(irr.converged);
        assert!((irr.rate - dec!(0.0556)).abs() < dec!(0.0005));
        assert_eq!(m.payback_years().unwrap().round_dp(4), dec!(13.3333));
        assert_eq!(m.return_on_investment, Metric::Defined(dec!(0.875)));
    }

    #[test]
    fn test_lcoe_formula() {
        // CAPEX 100M + PV(2.5M) over PV(200,000 MWh) at 8%, 25y
        let lcoe = levelized_cost_of_energy(dec!(100000000), dec!(2500000), dec!(200000), dec!(0.08), 25)
            .unwrap();
        let value = *lcoe.value().unwrap();
        // 100M / (200,000 * 10.674776) + 12.5 ≈ 59.34
        assert!((value - dec!(59.34)).abs() < dec!(0.01));
    }

    #[test]
    fn test_lcoe_positive_across_inputs() {
        for gen in [dec!(1), dec!(5000), dec!(876000)] {
            for rate in [dec!(0), dec!(0.05), dec!(0.12)] {
                let lcoe = levelized_cost_of_energy(dec!(1000000), dec!(10000), gen, rate, 20).unwrap();
                assert!(*lcoe.value().unwrap() > Decimal::ZERO);
            }
        }
        assert_eq!(
            levelized_cost_of_energy(dec!(1), dec!(1), dec!(0), dec!(0.08), 20).unwrap(),
            Metric::Undefined(UndefinedReason::NoGeneration)
        );
    }

    #[test]
    fn test_opex_above_revenue_leaves_irr_payback_and_roi_undefined() {
        let v = value_case(&scenario_case(dec!(50), dec!(12000000)), &IrrSolverSettings::default()).unwrap();
        let m = &v.metrics;
        assert_eq!(
            m.internal_rate_of_return,
            Metric::Undefined(UndefinedReason::NonPositiveNetCashFlow)
        );
        assert_eq!(
            m.payback_period_years,
            Metric::Undefined(UndefinedReason::NonPositiveNetCashFlow)
        );
        assert!(m.net_present_value < Decimal::ZERO);
        assert_eq!(
            m.return_on_investment,
            Metric::Undefined(UndefinedReason::NonPositiveNetCashFlow)
        );
        assert!(v.warnings.iter().any(|w| w.contains("No payback")));
    }

    #[test]
    fn test_irr_non_convergence_flagged_not_hidden() {
        // Net 3M/yr on 100M never pays back: IRR < 0, outside the search range
        let v = value_case(&scenario_case(dec!(20), dec!(1000000)), &IrrSolverSettings::default()).unwrap();
        let irr = v.metrics.internal_rate_of_return.value().unwrap();
        assert!(!irr.converged);
        assert_eq!(irr.rate, Decimal::ZERO);
        assert!(v.warnings.iter().any(|w| w.contains("did not converge")));
    }

    #[test]
    fn test_irr_root_property_at_tolerance() {
        let solver = IrrSolverSettings::default();
        let v = value_case(&scenario_case(dec!(80), dec!(2500000)), &solver).unwrap();
        let irr = v.metrics.internal_rate_of_return.value().unwrap();
        assert!(irr.converged);
        let residual = time_value::npv(irr.rate, &v.series.net_flows()).unwrap();
        assert!(residual.abs() < solver.npv_tolerance);
    }

    #[test]
    fn test_payback_helper() {
        assert_eq!(payback_period(dec!(100), dec!(25)), Metric::Defined(dec!(4)));
        assert_eq!(
            payback_period(dec!(100), dec!(0)),
            Metric::Undefined(UndefinedReason::NonPositiveNetCashFlow)
        );
    }
}
