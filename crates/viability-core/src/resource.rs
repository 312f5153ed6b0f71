use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::config::EngineConfig;
use crate::cost_model::tables::HybridMix;
use crate::error::ViabilityError;
use crate::types::{with_metadata, ComputationOutput, Megawatts, MegawattHours, Rate, Technology};
use crate::units::{EnergyQuantity, HOURS_PER_YEAR, MWH_PER_GWH};
use crate::ViabilityResult;

/// Typical capacity factors for a site scoring 1.0
pub const BASE_SOLAR_CAPACITY_FACTOR: Rate = dec!(0.20);
pub const BASE_WIND_CAPACITY_FACTOR: Rate = dec!(0.35);
pub const BASE_HYDRO_CAPACITY_FACTOR: Rate = dec!(0.45);

/// Average grid emissions displaced, tCO2 per MWh
pub const DEFAULT_GRID_EMISSION_FACTOR: Decimal = dec!(0.5);

const SOLAR_SEASONAL: [Decimal; 12] = [
    dec!(0.07), dec!(0.08), dec!(0.09), dec!(0.10), dec!(0.11), dec!(0.10),
    dec!(0.10), dec!(0.10), dec!(0.09), dec!(0.08), dec!(0.07), dec!(0.06),
];
const WIND_SEASONAL: [Decimal; 12] = [
    dec!(0.09), dec!(0.09), dec!(0.09), dec!(0.08), dec!(0.07), dec!(0.07),
    dec!(0.07), dec!(0.07), dec!(0.08), dec!(0.09), dec!(0.09), dec!(0.10),
];
const BALANCED_SEASONAL: [Decimal; 12] = [
    dec!(0.08), dec!(0.08), dec!(0.09), dec!(0.09), dec!(0.09), dec!(0.08),
    dec!(0.08), dec!(0.08), dec!(0.09), dec!(0.09), dec!(0.08), dec!(0.08),
];

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

/// Site quality scores, each in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteScores {
    pub solar_potential: Decimal,
    pub wind_potential: Decimal,
    pub hydro_potential: Decimal,
    /// Derating for environmental constraints (shading, icing, flow limits)
    pub environmental_factor: Decimal,
}

impl Default for SiteScores {
    fn default() -> Self {
        Self {
            solar_potential: dec!(0.5),
            wind_potential: dec!(0.5),
            hydro_potential: dec!(0.5),
            environmental_factor: dec!(0.8),
        }
    }
}

impl SiteScores {
    fn validate(&self) -> ViabilityResult<()> {
        let scores = [
            ("site.solar_potential", self.solar_potential),
            ("site.wind_potential", self.wind_potential),
            ("site.hydro_potential", self.hydro_potential),
            ("site.environmental_factor", self.environmental_factor),
        ];
        for (field, value) in scores {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(ViabilityError::project(field, "Site scores must be within [0, 1]"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationInput {
    pub technology: Technology,
    pub capacity_mw: Megawatts,
    #[serde(default)]
    pub site: SiteScores,
    /// Replaces the score-derived capacity factor
    #[serde(default)]
    pub capacity_factor: Option<Rate>,
    #[serde(default)]
    pub grid_emission_factor_t_per_mwh: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationEstimate {
    pub technology: Technology,
    pub capacity_mw: Megawatts,
    pub capacity_factor: Rate,
    pub annual_generation_mwh: MegawattHours,
    pub annual_generation_gwh: Decimal,
    /// January first
    pub monthly_generation_mwh: Vec<MegawattHours>,
    pub carbon_offset_tonnes: Decimal,
    pub site_quality_factor: Decimal,
}

impl GenerationEstimate {
    /// Annual yield in the form a `ProjectSpec` takes.
    pub fn annual_generation(&self) -> EnergyQuantity {
        EnergyQuantity::mwh(self.annual_generation_mwh)
    }
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Base factor scaled by the matching site score. Hybrid blends solar and
/// wind by the same capacity shares the cost model prices.
pub fn capacity_factor_for(technology: Technology, site: &SiteScores, mix: &HybridMix) -> Rate {
    match technology {
        Technology::Solar => BASE_SOLAR_CAPACITY_FACTOR * site.solar_potential,
        Technology::Wind => BASE_WIND_CAPACITY_FACTOR * site.wind_potential,
        Technology::Hydro => BASE_HYDRO_CAPACITY_FACTOR * site.hydro_potential,
        Technology::Hybrid => {
            BASE_SOLAR_CAPACITY_FACTOR * mix.solar_share * site.solar_potential
                + BASE_WIND_CAPACITY_FACTOR * mix.wind_share * site.wind_potential
        }
    }
}

/// Monthly weights normalised to sum to one.
pub fn seasonal_profile(technology: Technology) -> [Decimal; 12] {
    let raw = match technology {
        Technology::Solar => SOLAR_SEASONAL,
        Technology::Wind => WIND_SEASONAL,
        Technology::Hydro | Technology::Hybrid => BALANCED_SEASONAL,
    };
    let total: Decimal = raw.iter().sum();
    raw.map(|w| w / total)
}

pub fn estimate_generation(input: &GenerationInput, mix: &HybridMix) -> ViabilityResult<GenerationEstimate> {
    if input.capacity_mw <= Decimal::ZERO {
        return Err(ViabilityError::project(
            "capacity_mw",
            "Installed capacity must be positive",
        ));
    }
    input.site.validate()?;

    let capacity_factor = match input.capacity_factor {
        Some(cf) if cf <= Decimal::ZERO || cf > Decimal::ONE => {
            return Err(ViabilityError::project(
                "capacity_factor",
                "Capacity factor must be in (0, 1]",
            ));
        }
        Some(cf) => cf,
        None => capacity_factor_for(input.technology, &input.site, mix),
    };

    let emission_factor = input
        .grid_emission_factor_t_per_mwh
        .unwrap_or(DEFAULT_GRID_EMISSION_FACTOR);
    if emission_factor < Decimal::ZERO {
        return Err(ViabilityError::project(
            "grid_emission_factor_t_per_mwh",
            "Emission factor cannot be negative",
        ));
    }

    let annual_generation_mwh =
        input.capacity_mw * capacity_factor * HOURS_PER_YEAR * input.site.environmental_factor;
    let monthly_generation_mwh = seasonal_profile(input.technology)
        .iter()
        .map(|w| annual_generation_mwh * w)
        .collect();

    let site_quality_factor =
        (input.site.solar_potential + input.site.wind_potential) / dec!(2) * input.site.environmental_factor;

    debug!(
        technology = %input.technology,
        capacity_factor = %capacity_factor,
        annual_generation_mwh = %annual_generation_mwh,
        "generation estimated"
    );

    Ok(GenerationEstimate {
        technology: input.technology,
        capacity_mw: input.capacity_mw,
        capacity_factor,
        annual_generation_mwh,
        annual_generation_gwh: annual_generation_mwh / MWH_PER_GWH,
        monthly_generation_mwh,
        carbon_offset_tonnes: annual_generation_mwh * emission_factor,
        site_quality_factor,
    })
}

pub fn run_generation_estimate(
    input: &GenerationInput,
    config: &EngineConfig,
) -> ViabilityResult<ComputationOutput<GenerationEstimate>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    config.cost_tables.validate()?;
    let estimate = estimate_generation(input, &config.cost_tables.hybrid_mix)?;
    if estimate.annual_generation_mwh.is_zero() {
        warnings.push("Site scores give zero generation; the project cannot be valued".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Capacity-factor yield estimate with seasonal profile",
        &serde_json::json!({
            "hours_per_year": HOURS_PER_YEAR.to_string(),
            "capacity_factor_override": input.capacity_factor.map(|c| c.to_string()),
            "hybrid_solar_share": config.cost_tables.hybrid_mix.solar_share.to_string(),
            "grid_emission_factor_t_per_mwh": input
                .grid_emission_factor_t_per_mwh
                .unwrap_or(DEFAULT_GRID_EMISSION_FACTOR)
                .to_string(),
        }),
        warnings,
        elapsed,
        estimate,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(technology: Technology) -> GenerationInput {
        GenerationInput {
            technology,
            capacity_mw: dec!(100),
            site: SiteScores::default(),
            capacity_factor: None,
            grid_emission_factor_t_per_mwh: None,
        }
    }

    #[test]
    fn test_default_site_solar() {
        let e = estimate_generation(&input(Technology::Solar), &HybridMix::default()).unwrap();
        // 100 MW * 0.10 * 8760 * 0.8
        assert_eq!(e.capacity_factor, dec!(0.10));
        assert_eq!(e.annual_generation_mwh, dec!(70080));
        assert_eq!(e.annual_generation_gwh, dec!(70.08));
        assert_eq!(e.carbon_offset_tonnes, dec!(35040));
        assert_eq!(e.annual_generation(), EnergyQuantity::mwh(dec!(70080)));
    }

    #[test]
    fn test_hybrid_blend() {
        let e = estimate_generation(&input(Technology::Hybrid), &HybridMix::default()).unwrap();
        // 0.2*0.6*0.5 + 0.35*0.4*0.5
        assert_eq!(e.capacity_factor, dec!(0.13));
    }

    #[test]
    fn test_hybrid_follows_configured_mix() {
        let config = EngineConfig::from_json_str(
            r#"{ "cost_tables": { "hybrid_mix": { "solar_share": "0.5", "wind_share": "0.5" } } }"#,
        )
        .unwrap();
        let out = run_generation_estimate(&input(Technology::Hybrid), &config).unwrap();
        // 0.2*0.5*0.5 + 0.35*0.5*0.5
        assert_eq!(out.result.capacity_factor, dec!(0.1375));
    }

    #[test]
    fn test_monthly_profile_sums_to_annual() {
        for tech in Technology::ALL {
            let e = estimate_generation(&input(tech), &HybridMix::default()).unwrap();
            assert_eq!(e.monthly_generation_mwh.len(), 12);
            let total: Decimal = e.monthly_generation_mwh.iter().sum();
            assert!((total - e.annual_generation_mwh).abs() < dec!(0.000001), "{tech}");
        }
    }

    #[test]
    fn test_solar_peaks_in_may() {
        let profile = seasonal_profile(Technology::Solar);
        let peak = profile
            .iter()
            .enumerate()
            .max_by_key(|(_, w)| **w)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 4);
    }

    #[test]
    fn test_override_and_validation() {
        let mut i = input(Technology::Wind);
        i.capacity_factor = Some(dec!(0.4));
        assert_eq!(estimate_generation(&i, &HybridMix::default()).unwrap().capacity_factor, dec!(0.4));

        i.capacity_factor = Some(dec!(1.2));
        assert!(estimate_generation(&i, &HybridMix::default()).is_err());

        let mut bad_site = input(Technology::Solar);
        bad_site.site.environmental_factor = dec!(1.5);
        assert!(matches!(
            estimate_generation(&bad_site, &HybridMix::default()),
            Err(ViabilityError::InvalidProjectSpec { .. })
        ));
    }
}
