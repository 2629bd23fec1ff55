//! Correction bolus calculation.
//!
//! Corrections are floored onto the 0.05 U pump grid. The IOB-adjusted
//! correction rounds twice: once for the pure correction and again after
//! subtracting insulin on board.

use crate::precision::round_to_basal_precision;
use crate::{Error, Result};

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidInput(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Units needed to bring `current_bg` down to `target_bg`, ignoring IOB
///
/// Never negative. `correction_factor` is mg/dL dropped per unit and must
/// be positive.
pub fn calc_pure_correction(current_bg: f64, target_bg: f64, correction_factor: f64) -> Result<f64> {
    if !correction_factor.is_finite() || correction_factor <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "correction factor must be positive, got {}",
            correction_factor
        )));
    }
    check_non_negative("current BG", current_bg)?;
    check_non_negative("target BG", target_bg)?;

    Ok(round_to_basal_precision((current_bg - target_bg) / correction_factor).max(0.0))
}

/// Pure correction reduced by insulin already on board
pub fn calc_correction(
    current_bg: f64,
    target_bg: f64,
    correction_factor: f64,
    insulin_on_board: f64,
) -> Result<f64> {
    check_non_negative("insulin on board", insulin_on_board)?;
    let c = calc_pure_correction(current_bg, target_bg, correction_factor)?;
    Ok(round_to_basal_precision(c - insulin_on_board).max(0.0))
}

/// Recommended correction bolus, logged at debug level
pub fn recommend_correction(
    current_bg: f64,
    target_bg: f64,
    correction_factor: f64,
    insulin_on_board: f64,
) -> Result<f64> {
    let units = calc_correction(current_bg, target_bg, correction_factor, insulin_on_board)?;
    tracing::debug!(
        current_bg,
        target_bg,
        correction_factor,
        insulin_on_board,
        units,
        "Computed correction"
    );
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_correction() {
        assert_eq!(calc_pure_correction(200.0, 100.0, 40.0).unwrap(), 2.5);
        // 43 / 40 = 1.075 floors to 1.05
        assert_eq!(calc_pure_correction(143.0, 100.0, 40.0).unwrap(), 1.05);
    }

    #[test]
    fn test_pure_correction_never_negative() {
        assert_eq!(calc_pure_correction(80.0, 110.0, 40.0).unwrap(), 0.0);
        assert_eq!(calc_pure_correction(110.0, 110.0, 40.0).unwrap(), 0.0);
    }

    #[test]
    fn test_correction_subtracts_iob() {
        assert_eq!(calc_correction(200.0, 100.0, 40.0, 1.0).unwrap(), 1.5);
        assert_eq!(calc_correction(200.0, 100.0, 40.0, 3.0).unwrap(), 0.0);
    }

    #[test]
    fn test_correction_rounds_after_subtraction() {
        // 2.5 - 0.73 = 1.77 floors to 1.75
        assert_eq!(calc_correction(200.0, 100.0, 40.0, 0.73).unwrap(), 1.75);
    }

    #[test]
    fn test_correction_non_increasing_in_iob() {
        for bg in (40..=400).step_by(15) {
            let mut prev = f64::INFINITY;
            for step in 0..=60 {
                let iob = step as f64 * 0.1;
                let c = calc_correction(bg as f64, 110.0, 35.0, iob).unwrap();
                assert!(c >= 0.0);
                assert!(c <= prev, "bg={} iob={} rose to {}", bg, iob, c);
                prev = c;
            }
        }
    }

    #[test]
    fn test_recommend_validates_inputs() {
        assert!(matches!(
            recommend_correction(200.0, 100.0, 0.0, 0.0),
            Err(Error::InvalidInput(_))
        ));
        assert!(recommend_correction(200.0, 100.0, 40.0, -1.0).is_err());
        assert!(recommend_correction(f64::NAN, 100.0, 40.0, 0.0).is_err());
        assert_eq!(recommend_correction(200.0, 100.0, 40.0, 0.5).unwrap(), 2.0);
    }

    #[test]
    fn test_non_positive_factor_is_an_error() {
        for cf in [0.0, -40.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                calc_pure_correction(200.0, 100.0, cf),
                Err(Error::InvalidInput(_))
            ));
            assert!(matches!(
                calc_correction(200.0, 100.0, cf, 0.0),
                Err(Error::InvalidInput(_))
            ));
        }
        // 0 / 0 must not collapse to a zero-unit recommendation
        assert!(calc_correction(100.0, 100.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_correction_rejects_bad_iob() {
        assert!(calc_correction(200.0, 100.0, 40.0, -0.5).is_err());
        assert!(calc_correction(200.0, 100.0, 40.0, f64::NAN).is_err());
    }
}
