use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cash_flow::{project_cash_flows, ProjectionInputs};
use crate::cost_model::breakdown::CostBreakdown;
use crate::error::ViabilityError;
use crate::time_value::{self, IrrSolverSettings};
use crate::types::{FinancialAssumptions, Money, ProjectSpec, Rate};
use crate::ViabilityResult;

use super::metrics::{value_case, Valuation};

/// An input that can be scaled to test how value responds to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueDriver {
    ElectricityPrice,
    DiscountRate,
    /// Annual energy yield, equivalent to scaling the capacity factor
    Generation,
    Capex,
    Opex,
}

impl ValueDriver {
    pub const ALL: [ValueDriver; 5] = [
        ValueDriver::ElectricityPrice,
        ValueDriver::DiscountRate,
        ValueDriver::Generation,
        ValueDriver::Capex,
        ValueDriver::Opex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueDriver::ElectricityPrice => "electricity_price",
            ValueDriver::DiscountRate => "discount_rate",
            ValueDriver::Generation => "generation",
            ValueDriver::Capex => "capex",
            ValueDriver::Opex => "opex",
        }
    }
}

impl fmt::Display for ValueDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueDriver {
    type Err = ViabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValueDriver::ALL
            .into_iter()
            .find(|d| d.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                ViabilityError::config(
                    "sensitivity.variables",
                    format!("unknown variable '{s}' (expected electricity_price, discount_rate, generation, capex or opex)"),
                )
            })
    }
}

/// The full set of numbers a valuation depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationCase {
    pub inputs: ProjectionInputs,
    pub discount_rate: Rate,
}

impl ValuationCase {
    pub fn new(spec: &ProjectSpec, assumptions: &FinancialAssumptions, costs: &CostBreakdown) -> Self {
        Self {
            inputs: ProjectionInputs::from_parts(spec, assumptions, costs),
            discount_rate: assumptions.discount_rate,
        }
    }

    /// Current value of a driver in this case.
    pub fn driver_value(&self, driver: ValueDriver) -> Decimal {
        match driver {
            ValueDriver::ElectricityPrice => self.inputs.electricity_price_usd_per_mwh,
            ValueDriver::DiscountRate => self.discount_rate,
            ValueDriver::Generation => self.inputs.annual_generation_mwh,
            ValueDriver::Capex => self.inputs.total_capex,
            ValueDriver::Opex => self.inputs.annual_opex,
        }
    }

    /// Copy of this case with one driver multiplied, all others unchanged.
    pub fn perturbed(&self, driver: ValueDriver, multiplier: Decimal) -> Self {
        // 1.0 and 1 must leave the inputs byte-identical
        let multiplier = multiplier.normalize();
        let mut case = self.clone();
        match driver {
            ValueDriver::ElectricityPrice => case.inputs.electricity_price_usd_per_mwh *= multiplier,
            ValueDriver::DiscountRate => case.discount_rate *= multiplier,
            ValueDriver::Generation => case.inputs.annual_generation_mwh *= multiplier,
            ValueDriver::Capex => case.inputs.total_capex *= multiplier,
            ValueDriver::Opex => case.inputs.annual_opex *= multiplier,
        }
        case
    }

    pub fn value(&self, solver: &IrrSolverSettings) -> ViabilityResult<Valuation> {
        value_case(self, solver)
    }

    /// NPV alone, skipping IRR and the other metrics.
    pub fn npv(&self) -> ViabilityResult<Money> {
        let series = project_cash_flows(&self.inputs)?;
        time_value::npv(self.discount_rate, &series.net_flows())
    }
}
