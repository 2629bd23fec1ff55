//! Trajectory statistics.
//!
//! Summaries are a display boundary, so reported figures are rounded to
//! one decimal. The free functions return full precision.

use crate::precision::one_decimal;
use crate::{Error, Result, Trajectory};
use serde::{Deserialize, Serialize};

pub const VERY_HIGH_RANGE: f64 = 250.0;
pub const UPPER_RANGE: f64 = 180.0;
pub const LOWER_RANGE: f64 = 70.0;
pub const VERY_LOW_RANGE: f64 = 55.0;

/// Glycemic band a single reading falls into
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BgRange {
    VeryLow,
    Low,
    InRange,
    High,
    VeryHigh,
}

impl BgRange {
    /// Classify a reading; 70 and 180 are both in range
    pub fn classify(bg: f64) -> Self {
        if bg < VERY_LOW_RANGE {
            BgRange::VeryLow
        } else if bg < LOWER_RANGE {
            BgRange::Low
        } else if bg <= UPPER_RANGE {
            BgRange::InRange
        } else if bg <= VERY_HIGH_RANGE {
            BgRange::High
        } else {
            BgRange::VeryHigh
        }
    }
}

/// Percentage of readings in each band
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct RangeBreakdown {
    pub very_low: f64,
    pub low: f64,
    pub in_range: f64,
    pub high: f64,
    pub very_high: f64,
}

impl RangeBreakdown {
    /// Unrounded percentages; all zero for an empty slice
    pub fn from_values(values: &[f64]) -> Self {
        let mut counts = [0usize; 5];
        for &bg in values {
            let idx = match BgRange::classify(bg) {
                BgRange::VeryLow => 0,
                BgRange::Low => 1,
                BgRange::InRange => 2,
                BgRange::High => 3,
                BgRange::VeryHigh => 4,
            };
            counts[idx] += 1;
        }
        if values.is_empty() {
            return Self::default();
        }
        let pct = |c: usize| c as f64 * 100.0 / values.len() as f64;
        Self {
            very_low: pct(counts[0]),
            low: pct(counts[1]),
            in_range: pct(counts[2]),
            high: pct(counts[3]),
            very_high: pct(counts[4]),
        }
    }

    pub fn get(&self, range: BgRange) -> f64 {
        match range {
            BgRange::VeryLow => self.very_low,
            BgRange::Low => self.low,
            BgRange::InRange => self.in_range,
            BgRange::High => self.high,
            BgRange::VeryHigh => self.very_high,
        }
    }

    fn rounded(self) -> Self {
        Self {
            very_low: one_decimal(self.very_low),
            low: one_decimal(self.low),
            in_range: one_decimal(self.in_range),
            high: one_decimal(self.high),
            very_high: one_decimal(self.very_high),
        }
    }
}

pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Arithmetic mean; `NaN` for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    sum(values) / values.len() as f64
}

/// Sample standard deviation (N - 1 denominator)
pub fn std_dev(values: &[f64]) -> Result<f64> {
    if values.len() <= 1 {
        return Err(Error::InsufficientData(format!(
            "standard deviation needs at least 2 samples, got {}",
            values.len()
        )));
    }
    let mu = mean(values);
    let squares: f64 = values.iter().map(|v| (v - mu).powi(2)).sum();
    Ok((squares / (values.len() - 1) as f64).sqrt())
}

/// Sorted copy in ascending order
pub fn sort_ascending(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Quantile of an ascending slice, interpolating between closest ranks
///
/// Returns `None` for an empty slice. `q` is clamped to `[0, 1]`.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let base = pos.floor() as usize;
    let rest = pos - base as f64;
    match sorted.get(base + 1) {
        Some(next) => Some(sorted[base] + rest * (next - sorted[base])),
        None => Some(sorted[base]),
    }
}

/// Summary of a trajectory's BG readings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub time_in_range: RangeBreakdown,
}

/// Summarize BG readings
pub fn summarize_values(values: &[f64]) -> Result<Summary> {
    let sd = std_dev(values)?;
    let sorted = sort_ascending(values);
    let q = |p: f64| quantile(&sorted, p).unwrap_or(f64::NAN);

    Ok(Summary {
        count: values.len(),
        mean: one_decimal(mean(values)),
        std_dev: one_decimal(sd),
        min: one_decimal(sorted[0]),
        max: one_decimal(sorted[sorted.len() - 1]),
        q25: one_decimal(q(0.25)),
        median: one_decimal(q(0.5)),
        q75: one_decimal(q(0.75)),
        time_in_range: RangeBreakdown::from_values(values).rounded(),
    })
}

/// Summarize a trajectory's BG series
pub fn summarize(trajectory: &Trajectory) -> Result<Summary> {
    summarize_values(&trajectory.bg_values())
}
