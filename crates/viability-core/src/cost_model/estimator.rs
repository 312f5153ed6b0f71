use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::breakdown::{CostBreakdown, CostCategory, CostLineItem};
use super::tables::{CostTables, TechnologyCosts};
use crate::error::ViabilityError;
use crate::types::{with_metadata, ComputationOutput, Megawatts, Money, ProjectSpec, Rate};
use crate::ViabilityResult;

/// Line-item CAPEX/OPEX for a project, with the location multiplier applied.
///
/// Each CAPEX component is `capacity × unit cost` (capacity-weighted across
/// the hybrid mix), then every CAPEX line is scaled by the same location
/// multiplier. OPEX uses flat per-MW rates plus insurance on the notional
/// (pre-multiplier) project value.
pub fn build_cost_breakdown(spec: &ProjectSpec, tables: &CostTables) -> ViabilityResult<CostBreakdown> {
    if spec.capacity_mw <= Decimal::ZERO {
        return Err(ViabilityError::project(
            "capacity_mw",
            "Installed capacity must be positive",
        ));
    }
    if spec.location.distance_to_grid_km < Decimal::ZERO {
        return Err(ViabilityError::project(
            "location.distance_to_grid_km",
            "Distance to grid cannot be negative",
        ));
    }

    let cap = spec.capacity_mw;
    let mix = tables.weighted_costs(spec.technology);
    let weighted = |f: fn(&TechnologyCosts) -> Money| -> Money {
        mix.iter().map(|(share, costs)| *share * cap * f(costs)).sum()
    };

    let tech = spec.technology;
    let mut items = vec![
        CostLineItem::capital(
            "equipment",
            CostCategory::Capital,
            weighted(|c| c.capex.equipment),
            format!("Generating equipment for {cap} MW {tech}"),
        ),
        CostLineItem::capital(
            "installation",
            CostCategory::Capital,
            weighted(|c| c.capex.installation),
            "Civil works, mounting and commissioning",
        ),
        CostLineItem::capital(
            "grid_connection",
            CostCategory::Capital,
            weighted(|c| c.capex.grid_connection),
            "Substation, transformers and interconnection",
        ),
        CostLineItem::capital(
            "permitting",
            CostCategory::Regulatory,
            weighted(|c| c.capex.permitting),
            "Permits, environmental studies and approvals",
        ),
        CostLineItem::capital(
            "engineering",
            CostCategory::Capital,
            weighted(|c| c.capex.engineering),
            "Design and owner's engineering",
        ),
    ];

    // Insurance is priced on the notional value, before location adjustment
    let notional_value = tables.capex_per_mw(tech) * cap;
    let insurance: Money = mix
        .iter()
        .map(|(share, costs)| *share * cap * costs.capex.total() * costs.insurance_rate)
        .sum();
    let blended_insurance_rate: Rate = if notional_value.is_zero() {
        Decimal::ZERO
    } else {
        insurance / notional_value
    };

    items.extend([
        CostLineItem::annual(
            "operations_maintenance",
            CostCategory::Operating,
            weighted(|c| c.opex.operations_maintenance),
            "Scheduled and corrective maintenance",
        ),
        CostLineItem::annual(
            "insurance",
            CostCategory::Insurance,
            insurance,
            format!("Property cover at {blended_insurance_rate} of notional value {notional_value}"),
        ),
        CostLineItem::annual(
            "land_lease",
            CostCategory::Operating,
            weighted(|c| c.opex.land_lease),
            "Site lease payments",
        ),
        CostLineItem::annual(
            "administration",
            CostCategory::Operating,
            weighted(|c| c.opex.administration),
            "Asset management and overheads",
        ),
    ]);

    let mut breakdown = CostBreakdown::new(items);
    let multiplier = tables.location_multiplier(spec.location.distance_to_grid_km);
    breakdown.apply_location_multiplier(multiplier);

    debug!(
        technology = %tech,
        capacity_mw = %cap,
        location_multiplier = %multiplier,
        total_capex = %breakdown.total_capex(),
        annual_opex = %breakdown.annual_opex(),
        "cost breakdown built"
    );

    Ok(breakdown)
}

/// Input for a standalone cost estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimateInput {
    pub project: ProjectSpec,
}

/// Cost estimate output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimateOutput {
    pub breakdown: CostBreakdown,
    pub total_capex: Money,
    pub annual_opex: Money,
    pub capex_per_mw: Money,
    pub capacity_mw: Megawatts,
    pub location_multiplier: Decimal,
}

/// Cost model only: no generation or price data needed.
pub fn estimate_costs(
    input: &CostEstimateInput,
    tables: &CostTables,
) -> ViabilityResult<ComputationOutput<CostEstimateOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let spec = &input.project;
    let breakdown = build_cost_breakdown(spec, tables)?;

    if breakdown.location_multiplier() > Decimal::ONE {
        warnings.push(format!(
            "Site is {} km from the grid; CAPEX scaled by {}",
            spec.location.distance_to_grid_km,
            breakdown.location_multiplier()
        ));
    }

    let output = CostEstimateOutput {
        total_capex: breakdown.total_capex(),
        annual_opex: breakdown.annual_opex(),
        capex_per_mw: breakdown.total_capex() / spec.capacity_mw,
        capacity_mw: spec.capacity_mw,
        location_multiplier: breakdown.location_multiplier(),
        breakdown,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Bottom-up CAPEX/OPEX estimate with location multiplier",
        &serde_json::json!({
            "technology": spec.technology,
            "capacity_mw": spec.capacity_mw.to_string(),
            "distance_to_grid_km": spec.location.distance_to_grid_km.to_string(),
            "hybrid_mix": tables.hybrid_mix,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LocationProfile, Technology};
    use crate::units::EnergyQuantity;
    use rust_decimal_macros::dec;

    fn spec(technology: Technology, capacity: Decimal, distance: Decimal) -> ProjectSpec {
        ProjectSpec {
            name: Some("test".into()),
            technology,
            capacity_mw: capacity,
            location: LocationProfile {
                distance_to_grid_km: distance,
                ..Default::default()
            },
            annual_generation: EnergyQuantity::mwh(dec!(100000)),
            commercial_operation_date: None,
        }
    }

    #[test]
    fn test_solar_100mw_near_grid() {
        let b = build_cost_breakdown(&spec(Technology::Solar, dec!(100), dec!(10)), &CostTables::default())
            .unwrap();
        assert_eq!(b.total_capex(), dec!(100000000));
        assert_eq!(b.annual_opex(), dec!(2500000));
        assert_eq!(b.capex_items().count(), 5);
        assert_eq!(b.opex_items().count(), 4);
    }

    #[test]
    fn test_remote_capex_is_exactly_130_pct() {
        let tables = CostTables::default();
        for tech in Technology::ALL {
            let near = build_cost_breakdown(&spec(tech, dec!(80), dec!(10)), &tables).unwrap();
            let far = build_cost_breakdown(&spec(tech, dec!(80), dec!(150)), &tables).unwrap();
            assert_eq!(far.total_capex(), near.total_capex() * dec!(1.30));
            assert_eq!(far.annual_opex(), near.annual_opex());
            for (n, f) in near.capex_items().zip(far.capex_items()) {
                assert_eq!(f.amount, n.amount * dec!(1.30), "line {}", n.name);
            }
        }
    }

    #[test]
    fn test_hybrid_is_sixty_forty_blend() {
        let tables = CostTables::default();
        let hybrid = build_cost_breakdown(&spec(Technology::Hybrid, dec!(100), dec!(0)), &tables).unwrap();
        let solar = build_cost_breakdown(&spec(Technology::Solar, dec!(60), dec!(0)), &tables).unwrap();
        let wind = build_cost_breakdown(&spec(Technology::Wind, dec!(40), dec!(0)), &tables).unwrap();
        assert_eq!(hybrid.total_capex(), solar.total_capex() + wind.total_capex());
        assert_eq!(hybrid.annual_opex(), solar.annual_opex() + wind.annual_opex());
    }

    #[test]
    fn test_capex_percentages_sum_to_100() {
        let b = build_cost_breakdown(&spec(Technology::Hydro, dec!(37.5), dec!(75)), &CostTables::default())
            .unwrap();
        let capex_pct: Decimal = b.capex_items().map(|i| i.percentage_of_total).sum();
        let opex_pct: Decimal = b.opex_items().map(|i| i.percentage_of_total).sum();
        assert!((capex_pct - dec!(100)).abs() < dec!(0.000001));
        assert!((opex_pct - dec!(100)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_insurance_uses_notional_value() {
        let b = build_cost_breakdown(&spec(Technology::Wind, dec!(10), dec!(200)), &CostTables::default())
            .unwrap();
        let insurance = b.opex_items().find(|i| i.name == "insurance").unwrap();
        // 0.2% of 10 MW * $1.5M, unaffected by the 1.30 multiplier
        assert_eq!(insurance.amount, dec!(30000));
    }

    #[test]
    fn test_rejects_non_positive_capacity() {
        let err = build_cost_breakdown(&spec(Technology::Solar, dec!(0), dec!(0)), &CostTables::default());
        assert!(matches!(err, Err(ViabilityError::InvalidProjectSpec { .. })));
    }

    #[test]
    fn test_estimate_costs_envelope_warns_for_remote_site() {
        let input = CostEstimateInput {
            project: spec(Technology::Solar, dec!(50), dec!(120)),
        };
        let out = estimate_costs(&input, &CostTables::default()).unwrap();
        assert_eq!(out.result.capex_per_mw, dec!(1300000));
        assert_eq!(out.warnings.len(), 1);
    }
}
