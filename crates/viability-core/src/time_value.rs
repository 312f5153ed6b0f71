use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ViabilityError;
use crate::types::{Money, Rate};
use crate::ViabilityResult;

/// Lower edge of the IRR search interval
pub const IRR_LOWER_BOUND: Rate = Decimal::ZERO;
/// Upper edge of the IRR search interval
pub const IRR_UPPER_BOUND: Rate = Decimal::ONE;

/// Stopping rules for the IRR bisection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IrrSolverSettings {
    /// Stop once |NPV(r)| falls below this many dollars
    pub npv_tolerance: Money,
    pub max_iterations: u32,
}

impl Default for IrrSolverSettings {
    fn default() -> Self {
        Self {
            npv_tolerance: dec!(1000),
            max_iterations: 50,
        }
    }
}

impl IrrSolverSettings {
    pub fn validate(&self) -> ViabilityResult<()> {
        if self.npv_tolerance <= Decimal::ZERO {
            return Err(ViabilityError::config(
                "solver.npv_tolerance",
                "NPV tolerance must be positive",
            ));
        }
        if self.max_iterations == 0 {
            return Err(ViabilityError::config(
                "solver.max_iterations",
                "Iteration cap must be at least 1",
            ));
        }
        Ok(())
    }
}

/// A converged IRR.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrSolution {
    pub rate: Rate,
    pub iterations: u32,
    /// NPV at `rate`
    pub residual_npv: Money,
}

/// Net Present Value of a series of cash flows, first flow at t = 0
pub fn npv(rate: Rate, cash_flows: &[Money]) -> ViabilityResult<Money> {
    if rate <= dec!(-1) {
        return Err(ViabilityError::assumptions(
            "discount_rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = grow_discount(discount, one_plus_r, t)?;
        }
        if discount.is_zero() {
            return Err(ViabilityError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

fn grow_discount(discount: Decimal, one_plus_r: Decimal, period: usize) -> ViabilityResult<Decimal> {
    discount.checked_mul(one_plus_r).ok_or_else(|| {
        ViabilityError::assumptions(
            "discount_rate",
            format!("Discount factor overflows at period {period}; rate too high for this horizon"),
        )
    })
}

/// Present value of a level amount received at the end of years 1..=years.
pub fn pv_level_stream(rate: Rate, amount: Decimal, years: u32) -> ViabilityResult<Decimal> {
    if rate <= dec!(-1) {
        return Err(ViabilityError::assumptions(
            "discount_rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut total = Decimal::ZERO;
    for t in 1..=years as usize {
        discount = grow_discount(discount, one_plus_r, t)?;
        total += amount / discount;
    }
    Ok(total)
}

/// Internal Rate of Return by bisection over [0, 1].
///
/// The half to keep is chosen by comparing the sign of NPV at the midpoint
/// with its sign at the lower bound, so any series with a single sign change
/// of NPV inside the interval converges.
///
/// Errors:
/// - `UndefinedMetric` when there is no initial outflow or no positive
///   inflow afterwards.
/// - `NonConvergence` when the root lies outside [0, 1] or the iteration cap
///   is hit. `best_estimate` is the closest rate examined, clamped to [0, 1].
pub fn irr(cash_flows: &[Money], settings: &IrrSolverSettings) -> ViabilityResult<IrrSolution> {
    if cash_flows.len() < 2 {
        return Err(ViabilityError::UndefinedMetric {
            metric: "irr".into(),
            reason: "IRR requires at least 2 cash flows".into(),
        });
    }
    if cash_flows[0] >= Decimal::ZERO {
        return Err(ViabilityError::UndefinedMetric {
            metric: "irr".into(),
            reason: "no initial investment outflow".into(),
        });
    }
    if !cash_flows[1..].iter().any(|cf| *cf > Decimal::ZERO) {
        return Err(ViabilityError::UndefinedMetric {
            metric: "irr".into(),
            reason: "net cash flow after year 0 is never positive".into(),
        });
    }

    let tol = settings.npv_tolerance;
    let mut lo = IRR_LOWER_BOUND;
    let mut hi = IRR_UPPER_BOUND;
    let npv_lo = npv(lo, cash_flows)?;
    let npv_hi = npv(hi, cash_flows)?;

    if npv_lo.abs() < tol {
        return Ok(IrrSolution {
            rate: lo,
            iterations: 0,
            residual_npv: npv_lo,
        });
    }
    if npv_hi.abs() < tol {
        return Ok(IrrSolution {
            rate: hi,
            iterations: 0,
            residual_npv: npv_hi,
        });
    }

    // No sign change: the root sits outside the search interval
    if npv_lo.is_sign_negative() == npv_hi.is_sign_negative() {
        let (best_estimate, residual) = if npv_lo.abs() <= npv_hi.abs() {
            (lo, npv_lo)
        } else {
            (hi, npv_hi)
        };
        return Err(ViabilityError::NonConvergence {
            function: "IRR (no root in [0, 1])".into(),
            iterations: 0,
            best_estimate,
            residual,
        });
    }

    let lo_negative = npv_lo.is_sign_negative();
    let mut best = (lo, npv_lo);
    if npv_hi.abs() < best.1.abs() {
        best = (hi, npv_hi);
    }

    for i in 1..=settings.max_iterations {
        let mid = (lo + hi) / dec!(2);
        let npv_mid = npv(mid, cash_flows)?;

        if npv_mid.abs() < best.1.abs() {
            best = (mid, npv_mid);
        }
        if npv_mid.abs() < tol {
            return Ok(IrrSolution {
                rate: mid,
                iterations: i,
                residual_npv: npv_mid,
            });
        }

        if npv_mid.is_sign_negative() == lo_negative {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Err(ViabilityError::NonConvergence {
        function: "IRR".into(),
        iterations: settings.max_iterations,
        best_estimate: best.0.clamp(IRR_LOWER_BOUND, IRR_UPPER_BOUND),
        residual: best.1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tight() -> IrrSolverSettings {
        IrrSolverSettings {
            npv_tolerance: dec!(0.0001),
            max_iterations: 100,
        }
    }

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_at_minus_one() {
        assert!(matches!(
            npv(dec!(-1), &[dec!(-1), dec!(2)]),
            Err(ViabilityError::InvalidAssumptions { .. })
        ));
    }

    #[test]
    fn test_discount_factor_overflow_is_an_error() {
        // 2.8^80 exceeds the Decimal range
        let mut cfs = vec![dec!(-1000)];
        cfs.extend(std::iter::repeat(dec!(100)).take(80));
        assert!(matches!(
            npv(dec!(1.8), &cfs),
            Err(ViabilityError::InvalidAssumptions { .. })
        ));
        assert!(matches!(
            pv_level_stream(dec!(1.8), dec!(100), 80),
            Err(ViabilityError::InvalidAssumptions { .. })
        ));
        assert!(npv(dec!(0.9), &cfs).is_ok());
    }

    #[test]
    fn test_npv_strictly_decreasing_in_rate() {
        let cfs = vec![dec!(-1000), dec!(150), dec!(150), dec!(150), dec!(150), dec!(150), dec!(150), dec!(150), dec!(150)];
        let mut prev = npv(Decimal::ZERO, &cfs).unwrap();
        let mut rate = dec!(0.01);
        while rate < dec!(0.5) {
            let current = npv(rate, &cfs).unwrap();
            assert!(current < prev, "NPV did not fall between rates at {rate}");
            prev = current;
            rate += dec!(0.01);
        }
    }

    #[test]
    fn test_pv_level_stream_matches_npv() {
        let pv = pv_level_stream(dec!(0.08), dec!(100), 10).unwrap();
        let mut flows = vec![Decimal::ZERO];
        flows.extend(std::iter::repeat(dec!(100)).take(10));
        let reference = npv(dec!(0.08), &flows).unwrap();
        assert!((pv - reference).abs() < dec!(0.0000001));
        // Annuity factor at 8% over 10 years ≈ 6.7101
        assert!((pv - dec!(671.01)).abs() < dec!(0.01));
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, &tight()).unwrap();
        // IRR should be ~9.7%
        assert!((result.rate - dec!(0.097)).abs() < dec!(0.001));
        assert!(result.residual_npv.abs() < dec!(0.0001));
    }

    #[test]
    fn test_irr_root_property_on_uneven_flows() {
        let cfs = vec![dec!(-5000), dec!(800), dec!(1200), dec!(1500), dec!(2000), dec!(2500)];
        let settings = tight();
        let sol = irr(&cfs, &settings).unwrap();
        let at_root = npv(sol.rate, &cfs).unwrap();
        assert!(at_root.abs() < settings.npv_tolerance);
        assert!(sol.rate > Decimal::ZERO && sol.rate < Decimal::ONE);
    }

    #[test]
    fn test_irr_undefined_without_positive_inflows() {
        let cfs = vec![dec!(-1000), dec!(-50), dec!(-50)];
        assert!(matches!(
            irr(&cfs, &tight()),
            Err(ViabilityError::UndefinedMetric { .. })
        ));

        let no_outflow = vec![dec!(100), dec!(50)];
        assert!(matches!(
            irr(&no_outflow, &tight()),
            Err(ViabilityError::UndefinedMetric { .. })
        ));
    }

    #[test]
    fn test_irr_root_below_range_reports_non_convergence() {
        // Undiscounted inflows never repay the outlay, so IRR < 0
        let cfs = vec![dec!(-1000), dec!(100), dec!(100), dec!(100)];
        match irr(&cfs, &tight()) {
            Err(ViabilityError::NonConvergence { best_estimate, .. }) => {
                assert_eq!(best_estimate, Decimal::ZERO);
            }
            other => panic!("expected NonConvergence, got {other:?}"),
        }
    }

    #[test]
    fn test_irr_root_above_range_reports_non_convergence() {
        let cfs = vec![dec!(-100), dec!(500), dec!(500)];
        match irr(&cfs, &tight()) {
            Err(ViabilityError::NonConvergence { best_estimate, .. }) => {
                assert_eq!(best_estimate, Decimal::ONE);
            }
            other => panic!("expected NonConvergence, got {other:?}"),
        }
    }

    #[test]
    fn test_irr_iteration_cap_is_honoured() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let settings = IrrSolverSettings {
            npv_tolerance: dec!(0.0000000001),
            max_iterations: 3,
        };
        match irr(&cfs, &settings) {
            Err(ViabilityError::NonConvergence {
                iterations,
                best_estimate,
                ..
            }) => {
                assert_eq!(iterations, 3);
                assert!(best_estimate >= Decimal::ZERO && best_estimate <= Decimal::ONE);
            }
            other => panic!("expected NonConvergence, got {other:?}"),
        }
    }
}
