use std::fmt;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ViabilityError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Years};
use crate::valuation::FinancialMetrics;
use crate::ViabilityResult;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Three descending cut-offs worth 3, 2 and 1 points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBands {
    pub high: Decimal,
    pub mid: Decimal,
    pub low: Decimal,
}

/// Scoring rule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViabilityThresholds {
    /// NPV strictly above each band, USD
    pub npv: ScoreBands,
    /// IRR strictly above each band; `low` is the hurdle rate
    pub irr: ScoreBands,
    /// Payback strictly below each band, years
    pub payback_years: ScoreBands,
    pub highly_viable_min_score: u8,
    pub viable_min_score: u8,
    pub marginal_min_score: u8,
}

impl Default for ViabilityThresholds {
    fn default() -> Self {
        Self {
            npv: ScoreBands {
                high: dec!(50000000),
                mid: dec!(20000000),
                low: Decimal::ZERO,
            },
            irr: ScoreBands {
                high: dec!(0.15),
                mid: dec!(0.10),
                low: dec!(0.08),
            },
            payback_years: ScoreBands {
                high: dec!(10),
                mid: dec!(15),
                low: dec!(20),
            },
            highly_viable_min_score: 7,
            viable_min_score: 5,
            marginal_min_score: 3,
        }
    }
}

impl ViabilityThresholds {
    pub fn validate(&self) -> ViabilityResult<()> {
        let descending = |b: &ScoreBands| b.high >= b.mid && b.mid >= b.low;
        if !descending(&self.npv) || !descending(&self.irr) {
            return Err(ViabilityError::config(
                "viability",
                "NPV and IRR bands must be ordered high >= mid >= low",
            ));
        }
        let p = &self.payback_years;
        if !(p.high <= p.mid && p.mid <= p.low) {
            return Err(ViabilityError::config(
                "viability.payback_years",
                "Payback bands must be ordered high <= mid <= low",
            ));
        }
        if !(self.highly_viable_min_score >= self.viable_min_score
            && self.viable_min_score >= self.marginal_min_score)
        {
            return Err(ViabilityError::config(
                "viability",
                "Verdict score cut-offs must be descending",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ViabilityVerdict {
    #[serde(rename = "Not Viable")]
    NotViable,
    #[serde(rename = "Marginally Viable")]
    MarginallyViable,
    #[serde(rename = "Viable")]
    Viable,
    #[serde(rename = "Highly Viable")]
    HighlyViable,
}

impl fmt::Display for ViabilityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViabilityVerdict::NotViable => "Not Viable",
            ViabilityVerdict::MarginallyViable => "Marginally Viable",
            ViabilityVerdict::Viable => "Viable",
            ViabilityVerdict::HighlyViable => "Highly Viable",
        };
        f.write_str(s)
    }
}

/// Component scores and the resulting verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViabilityAssessment {
    pub npv_score: u8,
    pub irr_score: u8,
    pub payback_score: u8,
    /// 0..=9
    pub total_score: u8,
    pub verdict: ViabilityVerdict,
}

fn score_above(value: Decimal, bands: &ScoreBands) -> u8 {
    if value > bands.high {
        3
    } else if value > bands.mid {
        2
    } else if value > bands.low {
        1
    } else {
        0
    }
}

fn score_below(value: Decimal, bands: &ScoreBands) -> u8 {
    if value < bands.high {
        3
    } else if value < bands.mid {
        2
    } else if value < bands.low {
        1
    } else {
        0
    }
}

/// Additive score over NPV, IRR and payback. Undefined IRR or payback
/// contributes nothing.
pub fn score_viability(
    npv: Money,
    irr: Option<Rate>,
    payback_years: Option<Years>,
    thresholds: &ViabilityThresholds,
) -> ViabilityAssessment {
    let npv_score = score_above(npv, &thresholds.npv);
    let irr_score = irr.map_or(0, |r| score_above(r, &thresholds.irr));
    let payback_score = payback_years.map_or(0, |p| score_below(p, &thresholds.payback_years));
    let total_score = npv_score + irr_score + payback_score;

    let verdict = if total_score >= thresholds.highly_viable_min_score {
        ViabilityVerdict::HighlyViable
    } else if total_score >= thresholds.viable_min_score {
        ViabilityVerdict::Viable
    } else if total_score >= thresholds.marginal_min_score {
        ViabilityVerdict::MarginallyViable
    } else {
        ViabilityVerdict::NotViable
    };

    ViabilityAssessment {
        npv_score,
        irr_score,
        payback_score,
        total_score,
        verdict,
    }
}

pub fn assess_metrics(metrics: &FinancialMetrics, thresholds: &ViabilityThresholds) -> ViabilityAssessment {
    score_viability(
        metrics.net_present_value,
        metrics.irr_rate(),
        metrics.payback_years(),
        thresholds,
    )
}

// ---------------------------------------------------------------------------
// Standalone entry point
// ---------------------------------------------------------------------------

/// Pre-computed metrics to score. Absent IRR or payback means undefined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViabilityInput {
    pub net_present_value: Money,
    #[serde(default)]
    pub internal_rate_of_return: Option<Rate>,
    #[serde(default)]
    pub payback_period_years: Option<Years>,
}

pub fn assess_viability(
    input: &ViabilityInput,
    thresholds: &ViabilityThresholds,
) -> ViabilityResult<ComputationOutput<ViabilityAssessment>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.internal_rate_of_return.is_none() {
        warnings.push("IRR undefined; scored as 0".into());
    }
    if input.payback_period_years.is_none() {
        warnings.push("Payback undefined; scored as 0".into());
    }

    let output = score_viability(
        input.net_present_value,
        input.internal_rate_of_return,
        input.payback_period_years,
        thresholds,
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Additive NPV/IRR/payback viability score (0-9)",
        &serde_json::json!({
            "irr_hurdle": thresholds.irr.low.to_string(),
            "highly_viable_min_score": thresholds.highly_viable_min_score,
            "viable_min_score": thresholds.viable_min_score,
            "marginal_min_score": thresholds.marginal_min_score,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn score(npv: Decimal, irr: Option<Decimal>, payback: Option<Decimal>) -> ViabilityAssessment {
        score_viability(npv, irr, payback, &ViabilityThresholds::default())
    }

    #[test]
    fn test_top_score() {
        let a = score(dec!(60000000), Some(dec!(0.2)), Some(dec!(5)));
        assert_eq!(a.total_score, 9);
        assert_eq!(a.verdict, ViabilityVerdict::HighlyViable);
    }

    #[test]
    fn test_band_edges_are_strict() {
        // Exactly on a threshold does not earn that band
        let a = score(dec!(50000000), Some(dec!(0.15)), Some(dec!(10)));
        assert_eq!((a.npv_score, a.irr_score, a.payback_score), (2, 2, 2));
        assert_eq!(a.verdict, ViabilityVerdict::Viable);

        let zero = score(Decimal::ZERO, Some(dec!(0.08)), Some(dec!(20)));
        assert_eq!(zero.total_score, 0);
        assert_eq!(zero.verdict, ViabilityVerdict::NotViable);
    }

    #[test]
    fn test_undefined_metrics_score_zero() {
        let a = score(dec!(-5000000), None, None);
        assert_eq!(
            a,
            ViabilityAssessment {
                npv_score: 0,
                irr_score: 0,
                payback_score: 0,
                total_score: 0,
                verdict: ViabilityVerdict::NotViable,
            }
        );
    }

    #[test]
    fn test_marginal_band() {
        let a = score(dec!(1), Some(dec!(0.09)), Some(dec!(19)));
        assert_eq!(a.total_score, 3);
        assert_eq!(a.verdict, ViabilityVerdict::MarginallyViable);
    }

    #[test]
    fn test_score_monotone_in_npv() {
        let mut prev = 0u8;
        let mut prev_verdict = ViabilityVerdict::NotViable;
        let mut npv = dec!(-10000000);
        while npv <= dec!(80000000) {
            let a = score(npv, Some(dec!(0.11)), Some(dec!(12)));
            assert!(a.total_score >= prev);
            assert!(a.verdict >= prev_verdict);
            prev = a.total_score;
            prev_verdict = a.verdict;
            npv += dec!(2500000);
        }
    }

    #[test]
    fn test_configurable_hurdle() {
        let mut t = ViabilityThresholds::default();
        t.irr.low = dec!(0.06);
        let a = score_viability(dec!(1), Some(dec!(0.07)), None, &t);
        assert_eq!(a.irr_score, 1);
        assert_eq!(score(dec!(1), Some(dec!(0.07)), None).irr_score, 0);
    }

    #[test]
    fn test_verdict_serialises_as_label() {
        let s = serde_json::to_string(&ViabilityVerdict::MarginallyViable).unwrap();
        assert_eq!(s, "\"Marginally Viable\"");
    }

    #[test]
    fn test_assess_viability_envelope() {
        let input = ViabilityInput {
            net_present_value: dec!(25000000),
            internal_rate_of_return: Some(dec!(0.12)),
            payback_period_years: None,
        };
        let out = assess_viability(&input, &ViabilityThresholds::default()).unwrap();
        assert_eq!(out.result.total_score, 4);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_thresholds_validate() {
        let mut t = ViabilityThresholds::default();
        assert!(t.validate().is_ok());
        t.payback_years.high = dec!(30);
        assert!(t.validate().is_err());
    }
}
