use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::cost_model::estimator::build_cost_breakdown;
use crate::error::ViabilityError;
use crate::types::{with_metadata, ComputationOutput, FinancialAssumptions, Money, ProjectSpec};
use crate::valuation::{ValuationCase, ValueDriver};
use crate::ViabilityResult;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Which drivers to sweep and by how much.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    pub variables: Vec<ValueDriver>,
    /// Applied to each variable's baseline value, must be > 0
    pub multipliers: Vec<Decimal>,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            variables: vec![
                ValueDriver::ElectricityPrice,
                ValueDriver::DiscountRate,
                ValueDriver::Generation,
            ],
            multipliers: vec![dec!(0.8), dec!(0.9), dec!(1.0), dec!(1.1), dec!(1.2)],
        }
    }
}

impl SweepSettings {
    pub fn validate(&self) -> ViabilityResult<()> {
        if self.variables.is_empty() {
            return Err(ViabilityError::config(
                "sensitivity.variables",
                "At least one variable is required",
            ));
        }
        if self.multipliers.is_empty() {
            return Err(ViabilityError::config(
                "sensitivity.multipliers",
                "At least one multiplier is required",
            ));
        }
        if let Some(m) = self.multipliers.iter().find(|m| **m <= Decimal::ZERO) {
            return Err(ViabilityError::config(
                "sensitivity.multipliers",
                format!("Multipliers must be positive, got {m}"),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub multiplier: Decimal,
    /// Perturbed value of the driver
    pub input_value: Decimal,
    pub npv: Money,
    /// npv − baseline NPV
    pub npv_change: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSensitivity {
    pub variable: ValueDriver,
    pub baseline_value: Decimal,
    pub points: Vec<SensitivityPoint>,
    /// Max NPV − min NPV across the points
    pub npv_swing: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityTable {
    pub baseline_npv: Money,
    pub variables: Vec<VariableSensitivity>,
    /// Variables ordered by swing, largest first (tornado order)
    pub ranking: Vec<ValueDriver>,
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

/// One-at-a-time sweep of `settings.variables` around `baseline`.
///
/// `eval_fn` values each perturbed case. A point whose evaluation fails is
/// logged to `warnings` and left out of the table.
pub fn sweep_drivers<F>(
    baseline: &ValuationCase,
    settings: &SweepSettings,
    eval_fn: F,
    warnings: &mut Vec<String>,
) -> ViabilityResult<SensitivityTable>
where
    F: Fn(&ValuationCase) -> ViabilityResult<Money>,
{
    settings.validate()?;
    let baseline_npv = eval_fn(baseline)?;

    let mut variables = Vec::with_capacity(settings.variables.len());
    for &driver in &settings.variables {
        let mut points = Vec::with_capacity(settings.multipliers.len());
        for &multiplier in &settings.multipliers {
            let case = baseline.perturbed(driver, multiplier);
            match eval_fn(&case) {
                Ok(npv) => points.push(SensitivityPoint {
                    multiplier,
                    input_value: case.driver_value(driver),
                    npv,
                    npv_change: npv - baseline_npv,
                }),
                Err(e) => {
                    warn!(%driver, %multiplier, error = %e, "sensitivity point failed");
                    warnings.push(format!("Evaluation failed for {driver} x {multiplier}: {e}"));
                }
            }
        }

        let max = points.iter().map(|p| p.npv).max();
        let min = points.iter().map(|p| p.npv).min();
        let npv_swing = match (max, min) {
            (Some(max), Some(min)) => max - min,
            _ => Decimal::ZERO,
        };

        variables.push(VariableSensitivity {
            variable: driver,
            baseline_value: baseline.driver_value(driver),
            points,
            npv_swing,
        });
    }

    let mut ranked: Vec<&VariableSensitivity> = variables.iter().collect();
    ranked.sort_by(|a, b| b.npv_swing.cmp(&a.npv_swing));
    let ranking = ranked.into_iter().map(|v| v.variable).collect();

    debug!(
        baseline_npv = %baseline_npv,
        variables = variables.len(),
        "sensitivity sweep complete"
    );

    Ok(SensitivityTable {
        baseline_npv,
        variables,
        ranking,
    })
}

/// NPV sensitivity table for a case.
pub fn sensitivity_table(
    baseline: &ValuationCase,
    settings: &SweepSettings,
    warnings: &mut Vec<String>,
) -> ViabilityResult<SensitivityTable> {
    sweep_drivers(baseline, settings, ValuationCase::npv, warnings)
}

// ---------------------------------------------------------------------------
// Standalone entry point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub project: ProjectSpec,
    #[serde(default)]
    pub assumptions: FinancialAssumptions,
    /// Overrides the configured sweep
    #[serde(default)]
    pub settings: Option<SweepSettings>,
}

pub fn run_sensitivity(
    input: &SensitivityInput,
    config: &EngineConfig,
) -> ViabilityResult<ComputationOutput<SensitivityTable>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.project.validate()?;
    input.assumptions.validate()?;
    let settings = input.settings.as_ref().unwrap_or(&config.sensitivity);

    let costs = build_cost_breakdown(&input.project, &config.cost_tables)?;
    let baseline = ValuationCase::new(&input.project, &input.assumptions, &costs);
    let table = sensitivity_table(&baseline, settings, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "One-at-a-time NPV sensitivity (tornado)",
        &serde_json::json!({
            "variables": settings.variables,
            "multipliers": settings.multipliers.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
            "discount_rate": input.assumptions.discount_rate.to_string(),
        }),
        warnings,
        elapsed,
        table,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cash_flow::ProjectionInputs;
    use pretty_assertions::assert_eq;

    fn baseline() -> ValuationCase {
        ValuationCase {
            inputs: ProjectionInputs {
                total_capex: dec!(100000000),
                annual_opex: dec!(2500000),
                annual_generation_mwh: dec!(200000),
                capacity_mw: dec!(100),
                electricity_price_usd_per_mwh: dec!(50),
                rec_price_usd_per_mwh: None,
                capacity_payment_usd_per_mw_year: None,
                lifetime_years: 25,
                commercial_operation_date: None,
            },
            discount_rate: dec!(0.08),
        }
    }

    fn point(table: &SensitivityTable, driver: ValueDriver, m: Decimal) -> SensitivityPoint {
        table
            .variables
            .iter()
            .find(|v| v.variable == driver)
            .and_then(|v| v.points.iter().find(|p| p.multiplier == m))
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_unit_multiplier_reproduces_baseline() {
        let mut warnings = Vec::new();
        let base = baseline();
        let table = sensitivity_table(&base, &SweepSettings::default(), &mut warnings).unwrap();
        assert_eq!(table.baseline_npv, base.npv().unwrap());
        for driver in SweepSettings::default().variables {
            let p = point(&table, driver, dec!(1.0));
            assert_eq!(p.npv, table.baseline_npv);
            assert_eq!(p.npv_change, Decimal::ZERO);
        }
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_directions_of_change() {
        let mut warnings = Vec::new();
        let table = sensitivity_table(&baseline(), &SweepSettings::default(), &mut warnings).unwrap();

        let up = point(&table, ValueDriver::ElectricityPrice, dec!(1.2));
        assert!(up.npv_change > Decimal::ZERO);
        assert_eq!(up.input_value, dec!(60));

        let rate_up = point(&table, ValueDriver::DiscountRate, dec!(1.2));
        assert!(rate_up.npv_change < Decimal::ZERO);

        let gen_down = point(&table, ValueDriver::Generation, dec!(0.8));
        assert!(gen_down.npv_change < Decimal::ZERO);
    }

    #[test]
    fn test_price_and_generation_swing_equally() {
        // Revenue is price x generation, so both produce the same NPV shifts
        let mut warnings = Vec::new();
        let table = sensitivity_table(&baseline(), &SweepSettings::default(), &mut warnings).unwrap();
        let swing = |d| {
            table
                .variables
                .iter()
                .find(|v| v.variable == d)
                .map(|v| v.npv_swing)
                .unwrap()
        };
        assert_eq!(swing(ValueDriver::ElectricityPrice), swing(ValueDriver::Generation));
        assert_eq!(table.ranking.len(), 3);
        assert_ne!(table.ranking[0], ValueDriver::DiscountRate);
    }

    #[test]
    fn test_failed_point_becomes_warning() {
        let mut warnings = Vec::new();
        let settings = SweepSettings {
            variables: vec![ValueDriver::Capex],
            multipliers: vec![dec!(0.5), dec!(1.0), dec!(2.0)],
        };
        let table = sweep_drivers(
            &baseline(),
            &settings,
            |case| {
                if case.inputs.total_capex > dec!(150000000) {
                    return Err(ViabilityError::DivisionByZero {
                        context: "test model".into(),
                    });
                }
                case.npv()
            },
            &mut warnings,
        )
        .unwrap();
        assert_eq!(table.variables[0].points.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("capex"));
    }

    #[test]
    fn test_unit_point_is_evaluated_not_copied() {
        let calls = std::cell::Cell::new(0);
        let settings = SweepSettings {
            variables: vec![ValueDriver::Opex],
            multipliers: vec![dec!(1.0)],
        };
        let mut warnings = Vec::new();
        let table = sweep_drivers(
            &baseline(),
            &settings,
            |case| {
                calls.set(calls.get() + 1);
                case.npv()
            },
            &mut warnings,
        )
        .unwrap();
        // baseline plus the unit point
        assert_eq!(calls.get(), 2);
        assert_eq!(table.variables[0].points[0].npv, table.baseline_npv);
    }

    #[test]
    fn test_discount_overflow_over_long_life_becomes_warning() {
        let mut case = baseline();
        case.discount_rate = dec!(0.9);
        case.inputs.lifetime_years = 80;
        let settings = SweepSettings {
            variables: vec![ValueDriver::DiscountRate],
            multipliers: vec![dec!(1.0), dec!(2.0)],
        };
        let mut warnings = Vec::new();
        let table = sensitivity_table(&case, &settings, &mut warnings).unwrap();
        assert_eq!(table.variables[0].points.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("discount_rate x 2"), "{}", warnings[0]);
    }

    #[test]
    fn test_rejects_non_positive_multiplier() {
        let settings = SweepSettings {
            multipliers: vec![dec!(0), dec!(1)],
            ..Default::default()
        };
        let mut warnings = Vec::new();
        let err = sensitivity_table(&baseline(), &settings, &mut warnings).unwrap_err();
        assert!(matches!(err, ViabilityError::InvalidConfig { .. }));
    }
}
