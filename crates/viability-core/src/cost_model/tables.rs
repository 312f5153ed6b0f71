use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ViabilityError;
use crate::types::{Money, Rate, Technology};
use crate::ViabilityResult;

// ---------------------------------------------------------------------------
// Per-technology records
// ---------------------------------------------------------------------------

/// One-time capital cost components, USD per MW installed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapexUnitCosts {
    pub equipment: Money,
    pub installation: Money,
    pub grid_connection: Money,
    pub permitting: Money,
    pub engineering: Money,
}

impl CapexUnitCosts {
    pub fn total(&self) -> Money {
        self.equipment + self.installation + self.grid_connection + self.permitting + self.engineering
    }

    fn components(&self) -> [Money; 5] {
        [
            self.equipment,
            self.installation,
            self.grid_connection,
            self.permitting,
            self.engineering,
        ]
    }
}

/// Recurring operating cost components, USD per MW per year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpexUnitCosts {
    pub operations_maintenance: Money,
    pub land_lease: Money,
    pub administration: Money,
}

impl OpexUnitCosts {
    fn components(&self) -> [Money; 3] {
        [self.operations_maintenance, self.land_lease, self.administration]
    }
}

/// Full cost record for a single concrete technology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyCosts {
    pub capex: CapexUnitCosts,
    pub opex: OpexUnitCosts,
    /// Annual insurance premium as a fraction of notional project value
    pub insurance_rate: Rate,
}

impl TechnologyCosts {
    fn validate(&self, name: &str) -> ViabilityResult<()> {
        let negative = self
            .capex
            .components()
            .iter()
            .chain(self.opex.components().iter())
            .any(|c| *c < Decimal::ZERO);
        if negative {
            return Err(ViabilityError::config(
                &format!("cost_tables.{name}"),
                "Unit costs cannot be negative",
            ));
        }
        if self.insurance_rate < Decimal::ZERO || self.insurance_rate >= Decimal::ONE {
            return Err(ViabilityError::config(
                &format!("cost_tables.{name}.insurance_rate"),
                "Insurance rate must be a fraction in [0, 1)",
            ));
        }
        Ok(())
    }
}

/// Capacity split used for hybrid plants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridMix {
    pub solar_share: Rate,
    pub wind_share: Rate,
}

impl Default for HybridMix {
    fn default() -> Self {
        Self {
            solar_share: dec!(0.6),
            wind_share: dec!(0.4),
        }
    }
}

/// CAPEX multiplier applied when the grid is more than `above_km` away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationStep {
    pub above_km: Decimal,
    pub multiplier: Decimal,
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Immutable cost configuration, built once and passed to every estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTables {
    pub solar: TechnologyCosts,
    pub wind: TechnologyCosts,
    pub hydro: TechnologyCosts,
    pub hybrid_mix: HybridMix,
    /// Evaluated from the largest threshold down; the first match wins
    pub location_steps: Vec<LocationStep>,
}

impl Default for CostTables {
    fn default() -> Self {
        Self {
            solar: TechnologyCosts {
                capex: CapexUnitCosts {
                    equipment: dec!(600000),
                    installation: dec!(200000),
                    grid_connection: dec!(100000),
                    permitting: dec!(50000),
                    engineering: dec!(50000),
                },
                opex: OpexUnitCosts {
                    operations_maintenance: dec!(17000),
                    land_lease: dec!(4000),
                    administration: dec!(2000),
                },
                insurance_rate: dec!(0.002),
            },
            wind: TechnologyCosts {
                capex: CapexUnitCosts {
                    equipment: dec!(900000),
                    installation: dec!(300000),
                    grid_connection: dec!(150000),
                    permitting: dec!(75000),
                    engineering: dec!(75000),
                },
                opex: OpexUnitCosts {
                    operations_maintenance: dec!(28000),
                    land_lease: dec!(6000),
                    administration: dec!(3000),
                },
                insurance_rate: dec!(0.002),
            },
            hydro: TechnologyCosts {
                capex: CapexUnitCosts {
                    equipment: dec!(1500000),
                    installation: dec!(500000),
                    grid_connection: dec!(250000),
                    permitting: dec!(125000),
                    engineering: dec!(125000),
                },
                opex: OpexUnitCosts {
                    operations_maintenance: dec!(40000),
                    land_lease: dec!(3000),
                    administration: dec!(4500),
                },
                insurance_rate: dec!(0.002),
            },
            hybrid_mix: HybridMix::default(),
            location_steps: vec![
                LocationStep {
                    above_km: dec!(100),
                    multiplier: dec!(1.30),
                },
                LocationStep {
                    above_km: dec!(50),
                    multiplier: dec!(1.15),
                },
            ],
        }
    }
}

impl CostTables {
    /// Cost records making up `technology`, each with its share of capacity.
    pub fn weighted_costs(&self, technology: Technology) -> Vec<(Rate, &TechnologyCosts)> {
        match technology {
            Technology::Solar => vec![(Decimal::ONE, &self.solar)],
            Technology::Wind => vec![(Decimal::ONE, &self.wind)],
            Technology::Hydro => vec![(Decimal::ONE, &self.hydro)],
            Technology::Hybrid => vec![
                (self.hybrid_mix.solar_share, &self.solar),
                (self.hybrid_mix.wind_share, &self.wind),
            ],
        }
    }

    /// Blended CAPEX per MW before any location adjustment.
    pub fn capex_per_mw(&self, technology: Technology) -> Money {
        self.weighted_costs(technology)
            .iter()
            .map(|(share, costs)| *share * costs.capex.total())
            .sum()
    }

    /// Step-function CAPEX multiplier for a site's distance to grid.
    pub fn location_multiplier(&self, distance_to_grid_km: Decimal) -> Decimal {
        let mut steps: Vec<&LocationStep> = self.location_steps.iter().collect();
        steps.sort_by(|a, b| b.above_km.cmp(&a.above_km));
        steps
            .into_iter()
            .find(|s| distance_to_grid_km > s.above_km)
            .map(|s| s.multiplier)
            .unwrap_or(Decimal::ONE)
    }

    pub fn validate(&self) -> ViabilityResult<()> {
        self.solar.validate("solar")?;
        self.wind.validate("wind")?;
        self.hydro.validate("hydro")?;

        let mix = &self.hybrid_mix;
        if mix.solar_share < Decimal::ZERO || mix.wind_share < Decimal::ZERO {
            return Err(ViabilityError::config(
                "cost_tables.hybrid_mix",
                "Capacity shares cannot be negative",
            ));
        }
        if mix.solar_share + mix.wind_share != Decimal::ONE {
            return Err(ViabilityError::config(
                "cost_tables.hybrid_mix",
                format!(
                    "Capacity shares must sum to 1, got {}",
                    mix.solar_share + mix.wind_share
                ),
            ));
        }

        for step in &self.location_steps {
            if step.multiplier <= Decimal::ZERO {
                return Err(ViabilityError::config(
                    "cost_tables.location_steps",
                    format!("Multiplier above {} km must be positive", step.above_km),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capex_per_mw() {
        let t = CostTables::default();
        assert_eq!(t.capex_per_mw(Technology::Solar), dec!(1000000));
        assert_eq!(t.capex_per_mw(Technology::Wind), dec!(1500000));
        assert_eq!(t.capex_per_mw(Technology::Hydro), dec!(2500000));
        // 0.6 * 1.0M + 0.4 * 1.5M
        assert_eq!(t.capex_per_mw(Technology::Hybrid), dec!(1200000));
    }

    #[test]
    fn test_location_multiplier_steps() {
        let t = CostTables::default();
        assert_eq!(t.location_multiplier(dec!(0)), dec!(1));
        assert_eq!(t.location_multiplier(dec!(50)), dec!(1));
        assert_eq!(t.location_multiplier(dec!(50.1)), dec!(1.15));
        assert_eq!(t.location_multiplier(dec!(100)), dec!(1.15));
        assert_eq!(t.location_multiplier(dec!(150)), dec!(1.30));
    }

    #[test]
    fn test_location_steps_order_independent() {
        let mut t = CostTables::default();
        t.location_steps.reverse();
        assert_eq!(t.location_multiplier(dec!(150)), dec!(1.30));
    }

    #[test]
    fn test_validate_rejects_bad_hybrid_mix() {
        let mut t = CostTables::default();
        assert!(t.validate().is_ok());
        t.hybrid_mix.wind_share = dec!(0.5);
        assert!(matches!(
            t.validate(),
            Err(ViabilityError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let json = r#"{"hybrid_mix": {"solar_share": "0.5", "wind_share": "0.5"}}"#;
        let t: CostTables = serde_json::from_str(json).unwrap();
        assert_eq!(t.solar, CostTables::default().solar);
        assert_eq!(t.capex_per_mw(Technology::Hybrid), dec!(1250000));
    }
}
