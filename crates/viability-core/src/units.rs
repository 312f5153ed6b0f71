//! Canonical units and boundary conversions.
//!
//! Energy is carried internally in MWh, power in MW, money in USD and every
//! rate as a decimal fraction. Producers that report energy in GWh go through
//! [`EnergyQuantity`], which is the only place the ×1000 conversion happens.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ViabilityError;
use crate::types::{Megawatts, MegawattHours, Rate};
use crate::ViabilityResult;

pub const HOURS_PER_YEAR: Decimal = dec!(8760);
pub const MWH_PER_GWH: Decimal = dec!(1000);

/// Unit tag for an energy amount supplied by an upstream collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyUnit {
    #[default]
    Mwh,
    Gwh,
}

/// An energy amount with an explicit unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyQuantity {
    pub value: Decimal,
    #[serde(default)]
    pub unit: EnergyUnit,
}

impl EnergyQuantity {
    pub fn mwh(value: Decimal) -> Self {
        Self {
            value,
            unit: EnergyUnit::Mwh,
        }
    }

    pub fn gwh(value: Decimal) -> Self {
        Self {
            value,
            unit: EnergyUnit::Gwh,
        }
    }

    /// Value in the canonical unit.
    pub fn to_mwh(&self) -> MegawattHours {
        match self.unit {
            EnergyUnit::Mwh => self.value,
            EnergyUnit::Gwh => self.value * MWH_PER_GWH,
        }
    }

    pub fn to_gwh(&self) -> Decimal {
        self.to_mwh() / MWH_PER_GWH
    }
}

/// Ratio of delivered energy to nameplate energy over one year.
pub fn implied_capacity_factor(
    annual_generation_mwh: MegawattHours,
    capacity_mw: Megawatts,
) -> ViabilityResult<Rate> {
    if capacity_mw <= Decimal::ZERO {
        return Err(ViabilityError::DivisionByZero {
            context: "capacity factor (capacity_mw)".into(),
        });
    }
    Ok(annual_generation_mwh / (capacity_mw * HOURS_PER_YEAR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gwh_converts_to_mwh() {
        assert_eq!(EnergyQuantity::gwh(dec!(200)).to_mwh(), dec!(200000));
        assert_eq!(EnergyQuantity::mwh(dec!(200000)).to_gwh(), dec!(200));
    }

    #[test]
    fn test_unit_defaults_to_mwh_when_omitted() {
        let q: EnergyQuantity = serde_json::from_str(r#"{"value": "1500"}"#).unwrap();
        assert_eq!(q.unit, EnergyUnit::Mwh);
        assert_eq!(q.to_mwh(), dec!(1500));
    }

    #[test]
    fn test_implied_capacity_factor() {
        // 100 MW running flat out for a year
        let cf = implied_capacity_factor(dec!(876000), dec!(100)).unwrap();
        assert_eq!(cf, Decimal::ONE);
        assert!(implied_capacity_factor(dec!(1), Decimal::ZERO).is_err());
    }
}
