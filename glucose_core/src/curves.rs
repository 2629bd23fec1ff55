//! Absorption curve models.
//!
//! Every dose is released through one or more [`AbsorptionSegment`]s. A
//! segment's curve is normalized so that its rate integrates to exactly
//! `amount` over `[0, duration]`; [`AbsorptionSegment::released`] gives the
//! closed-form integral so the simulator can step without drift.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// ============================================================================
// Presets (minutes)
// ============================================================================

/// Exponential insulin action parameters
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct InsulinCurve {
    pub peak: f64,
    pub duration: f64,
}

impl InsulinCurve {
    /// Rapid-acting insulin: peak at 1h05m, active for 4h
    pub const RAPID: InsulinCurve = InsulinCurve {
        peak: 65.0,
        duration: 240.0,
    };
}

impl Default for InsulinCurve {
    fn default() -> Self {
        Self::RAPID
    }
}

/// Carbohydrate digestion speed presets
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CarbSpeed {
    VeryFast,
    Fast,
    Medium,
    Slow,
    VerySlow,
}

impl CarbSpeed {
    /// Absorption window in minutes
    pub fn duration(self) -> f64 {
        match self {
            CarbSpeed::VeryFast => 60.0,
            CarbSpeed::Fast => 105.0,
            CarbSpeed::Medium => 150.0,
            CarbSpeed::Slow => 195.0,
            CarbSpeed::VerySlow => 240.0,
        }
    }
}

/// Protein starts raising BG ~3h after the meal and keeps going for 4h
pub const PROTEIN_DELAY: f64 = 180.0;
pub const PROTEIN_DURATION: f64 = 240.0;

// ============================================================================
// Curve shapes
// ============================================================================

/// Shape of a segment's release curve
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CurveShape {
    /// Insulin activity curve parameterized by time-to-peak
    Exponential { peak: f64 },
    /// Triangular (Walsh) carb absorption
    Sawtooth,
    /// Half-sine carb absorption
    Sine,
}

impl CurveShape {
    pub fn is_exponential(&self) -> bool {
        matches!(self, CurveShape::Exponential { .. })
    }
}

/// Carb-only shape selector, used by config and the scenario generator
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CarbCurve {
    #[default]
    Sawtooth,
    Sine,
}

impl From<CarbCurve> for CurveShape {
    fn from(curve: CarbCurve) -> Self {
        match curve {
            CarbCurve::Sawtooth => CurveShape::Sawtooth,
            CarbCurve::Sine => CurveShape::Sine,
        }
    }
}

/// Derived constants of the exponential insulin curve
///
/// `tau` is the time constant, `a` the rise-time factor and `s` the
/// normalization that makes the curve integrate to 1 over `[0, duration]`.
#[derive(Clone, Copy, Debug)]
struct ExponentialParams {
    duration: f64,
    tau: f64,
    a: f64,
    s: f64,
}

/// Largest accepted error of the closed-form curve area
const NORMALIZATION_TOLERANCE: f64 = 1e-6;

impl ExponentialParams {
    fn new(peak: f64, duration: f64) -> Self {
        let tau = peak * (1.0 - peak / duration) / (1.0 - 2.0 * peak / duration);
        let a = 2.0 * tau / duration;
        let s = 1.0 / (1.0 - a + (1.0 + a) * (-duration / tau).exp());
        Self { duration, tau, a, s }
    }

    /// Constants for a curve that is numerically usable
    ///
    /// Close to `peak == duration / 2` the normalization cancels to zero
    /// or loses its precision, so the closed-form area must come back as 1.
    fn checked(peak: f64, duration: f64) -> Result<Self> {
        let p = Self::new(peak, duration);
        let usable = p.tau.is_finite()
            && p.a.is_finite()
            && p.s.is_finite()
            && p.s > 0.0
            && (p.released(duration) - 1.0).abs() < NORMALIZATION_TOLERANCE;
        if !usable {
            return Err(Error::InvalidSegment(format!(
                "exponential peak {} is too close to duration/2 = {}",
                peak,
                duration / 2.0
            )));
        }
        Ok(p)
    }

    fn rate(&self, t: f64) -> f64 {
        let d = self.duration;
        (self.s / self.tau.powi(2)) * t * (1.0 - t / d) * (-t / self.tau).exp()
    }

    fn released(&self, t: f64) -> f64 {
        let d = self.duration;
        let poly = t.powi(2) / (self.tau * d * (1.0 - self.a)) - t / self.tau - 1.0;
        self.s * (1.0 - self.a) * (poly * (-t / self.tau).exp() + 1.0)
    }
}

// ============================================================================
// Segments
// ============================================================================

/// One phase of a dose's release curve
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawSegment")]
pub struct AbsorptionSegment {
    amount: f64,
    delay: f64,
    duration: f64,
    #[serde(flatten)]
    shape: CurveShape,
}

#[derive(Deserialize)]
struct RawSegment {
    amount: f64,
    #[serde(default)]
    delay: f64,
    duration: f64,
    #[serde(flatten)]
    shape: CurveShape,
}

impl TryFrom<RawSegment> for AbsorptionSegment {
    type Error = Error;

    fn try_from(raw: RawSegment) -> Result<Self> {
        AbsorptionSegment::new(raw.amount, raw.delay, raw.duration, raw.shape)
    }
}

impl AbsorptionSegment {
    /// Build a validated segment
    ///
    /// Rejects non-positive amounts and durations, negative delays, and
    /// exponential peaks outside `(0, duration / 2)`. At `peak == duration / 2`
    /// the time constant is undefined.
    pub fn new(amount: f64, delay: f64, duration: f64, shape: CurveShape) -> Result<Self> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::InvalidSegment(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        if !delay.is_finite() || delay < 0.0 {
            return Err(Error::InvalidSegment(format!(
                "delay must be non-negative, got {}",
                delay
            )));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(Error::InvalidSegment(format!(
                "duration must be positive, got {}",
                duration
            )));
        }
        if let CurveShape::Exponential { peak } = shape {
            if !peak.is_finite() || peak <= 0.0 || peak >= duration / 2.0 {
                return Err(Error::InvalidSegment(format!(
                    "exponential peak must lie in (0, duration/2) = (0, {}), got {}",
                    duration / 2.0,
                    peak
                )));
            }
            ExponentialParams::checked(peak, duration)?;
        }

        Ok(Self {
            amount,
            delay,
            duration,
            shape,
        })
    }

    /// Insulin segment using an exponential curve preset
    pub fn insulin(units: f64, curve: InsulinCurve) -> Result<Self> {
        Self::new(
            units,
            0.0,
            curve.duration,
            CurveShape::Exponential { peak: curve.peak },
        )
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn shape(&self) -> CurveShape {
        self.shape
    }

    /// Offset from dose start at which this segment is fully released
    pub fn end(&self) -> f64 {
        self.delay + self.duration
    }

    /// Instantaneous release rate (amount per minute)
    ///
    /// `elapsed` is measured from the end of the segment's delay. Zero
    /// outside `[0, duration]`.
    pub fn rate(&self, elapsed: f64) -> f64 {
        if elapsed < 0.0 || elapsed > self.duration {
            return 0.0;
        }
        self.unit_rate(elapsed) * self.amount
    }

    /// Amount released on `[0, elapsed]`
    ///
    /// Closed-form integral of [`rate`](Self::rate); `0` before the segment
    /// starts and exactly `amount` once `elapsed >= duration`.
    pub fn released(&self, elapsed: f64) -> f64 {
        if elapsed <= 0.0 {
            return 0.0;
        }
        if elapsed >= self.duration {
            return self.amount;
        }
        self.unit_released(elapsed).clamp(0.0, 1.0) * self.amount
    }

    /// Amount not yet released at `elapsed`
    pub fn remaining(&self, elapsed: f64) -> f64 {
        self.amount - self.released(elapsed)
    }

    fn unit_rate(&self, t: f64) -> f64 {
        let d = self.duration;
        match self.shape {
            CurveShape::Exponential { peak } => {
                ExponentialParams::new(peak, d).rate(t).max(0.0)
            }
            CurveShape::Sawtooth => {
                let a = t / d;
                let q = 4.0 / d;
                if t <= d / 2.0 {
                    q * a
                } else {
                    q * (1.0 - a)
                }
            }
            CurveShape::Sine => {
                let q = (PI / 2.0) / d;
                q * (t * PI / d).sin()
            }
        }
    }

    fn unit_released(&self, t: f64) -> f64 {
        let d = self.duration;
        match self.shape {
            CurveShape::Exponential { peak } => ExponentialParams::new(peak, d).released(t),
            CurveShape::Sawtooth => {
                if t <= d / 2.0 {
                    2.0 * (t / d).powi(2)
                } else {
                    1.0 - 2.0 * ((d - t) / d).powi(2)
                }
            }
            CurveShape::Sine => (1.0 - (PI * t / d).cos()) / 2.0,
        }
    }
}
