//! Hypoglycemia dampening.
//!
//! Near hypoglycemia the body resists further glucose decline. The model
//! scales a BG-lowering insulin effect down quadratically as BG approaches
//! the cutoff, and suppresses it entirely below the cutoff.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Parameters of the dampening transform (mg/dL)
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct HypoDampening {
    /// BG at or above which insulin acts undampened
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// BG below which insulin has no further effect
    #[serde(default = "default_cutoff")]
    pub cutoff: f64,

    /// BG at which the quadratic scaling curve reaches zero
    #[serde(default = "default_curve_origin")]
    pub curve_origin: f64,

    /// Smallest scale factor applied between cutoff and threshold
    #[serde(default = "default_min_factor")]
    pub min_factor: f64,
}

fn default_threshold() -> f64 {
    55.0
}

fn default_cutoff() -> f64 {
    25.0
}

fn default_curve_origin() -> f64 {
    20.0
}

fn default_min_factor() -> f64 {
    0.01
}

impl Default for HypoDampening {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            cutoff: default_cutoff(),
            curve_origin: default_curve_origin(),
            min_factor: default_min_factor(),
        }
    }
}

impl HypoDampening {
    /// Check that the parameters describe a usable curve
    pub fn validate(&self) -> Result<()> {
        let values = [self.threshold, self.cutoff, self.curve_origin, self.min_factor];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::Config("dampening parameters must be finite".into()));
        }
        if self.curve_origin >= self.threshold {
            return Err(Error::Config(format!(
                "dampening curve origin ({}) must be below the threshold ({})",
                self.curve_origin, self.threshold
            )));
        }
        if self.cutoff > self.threshold {
            return Err(Error::Config(format!(
                "dampening cutoff ({}) must not exceed the threshold ({})",
                self.cutoff, self.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.min_factor) {
            return Err(Error::Config(format!(
                "dampening minimum factor must be in [0, 1], got {}",
                self.min_factor
            )));
        }
        Ok(())
    }

    /// Scale factor applied to a BG-lowering effect at `current_bg`
    pub fn factor(&self, current_bg: f64) -> f64 {
        if current_bg >= self.threshold {
            return 1.0;
        }
        if current_bg < self.cutoff {
            return 0.0;
        }
        let span = self.threshold - self.curve_origin;
        let f = ((current_bg - self.curve_origin) / span).powi(2);
        f.clamp(self.min_factor, 1.0)
    }

    /// Dampen a raw BG effect given the current BG
    ///
    /// Non-negative effects pass through untouched. Only insulin effects
    /// should be routed through here.
    pub fn dampen(&self, raw_effect: f64, current_bg: f64) -> f64 {
        if raw_effect >= 0.0 {
            return raw_effect;
        }
        let f = self.factor(current_bg);
        if f == 0.0 {
            return 0.0;
        }
        raw_effect * f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precision::one_decimal;

    #[test]
    fn test_positive_effects_not_dampened() {
        let d = HypoDampening::default();
        assert_eq!(d.dampen(5.0, 40.0), 5.0);
        assert_eq!(d.dampen(0.0, 10.0), 0.0);
    }

    #[test]
    fn test_safe_range_not_dampened() {
        let d = HypoDampening::default();
        assert_eq!(d.dampen(-5.0, 90.0), -5.0);
        assert_eq!(d.dampen(-5.0, 55.0), -5.0);
    }

    #[test]
    fn test_dampening_table() {
        let d = HypoDampening::default();
        let cases = [
            (55.0, -10.0),
            (50.0, -7.3),
            (45.0, -5.1),
            (40.0, -3.3),
            (35.0, -1.8),
            (30.0, -0.8),
            (25.0, -0.2),
            (20.0, 0.0),
        ];
        for (bg, expected) in cases {
            assert_eq!(
                one_decimal(d.dampen(-10.0, bg)),
                expected,
                "dampening -10 at BG {}",
                bg
            );
        }
    }

    #[test]
    fn test_below_cutoff_fully_suppressed() {
        let d = HypoDampening::default();
        assert_eq!(d.dampen(-10.0, 24.9), 0.0);
        assert_eq!(d.dampen(-0.001, 0.0), 0.0);
    }

    #[test]
    fn test_min_factor_floor() {
        let d = HypoDampening {
            curve_origin: 25.0,
            ..HypoDampening::default()
        };
        assert_eq!(d.factor(25.0), 0.01);
        assert!(d.dampen(-10.0, 25.0) < 0.0);
    }

    #[test]
    fn test_factor_monotone_in_bg() {
        let d = HypoDampening::default();
        let mut prev = 0.0;
        for bg in 0..=80 {
            let f = d.factor(bg as f64);
            assert!(f >= prev);
            prev = f;
        }
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let bad = HypoDampening {
            curve_origin: 60.0,
            ..HypoDampening::default()
        };
        assert!(bad.validate().is_err());

        let bad = HypoDampening {
            min_factor: 2.0,
            ..HypoDampening::default()
        };
        assert!(bad.validate().is_err());

        assert!(HypoDampening::default().validate().is_ok());
    }
}
