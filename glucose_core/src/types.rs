//! Core domain types for the glucose simulator.
//!
//! This module defines the fundamental types used throughout the system:
//! - Dose events (insulin boluses and food) and their absorption segments
//! - Per-step simulation state and whole trajectories

use crate::curves::{AbsorptionSegment, CurveShape, InsulinCurve, PROTEIN_DELAY, PROTEIN_DURATION};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Dose Events
// ============================================================================

/// What a dose event delivers
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DoseKind {
    Insulin,
    Carb,
    Protein,
}

/// A single insulin bolus or food item
///
/// Immutable once built. `amount` always equals the sum of the segment
/// amounts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawEvent")]
pub struct DoseEvent {
    id: Uuid,
    kind: DoseKind,
    amount: f64,
    start_time: f64,
    segments: Vec<AbsorptionSegment>,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    kind: DoseKind,
    amount: Option<f64>,
    start_time: f64,
    segments: Vec<AbsorptionSegment>,
}

impl TryFrom<RawEvent> for DoseEvent {
    type Error = Error;

    fn try_from(raw: RawEvent) -> Result<Self> {
        let event = match raw.amount {
            Some(amount) => Self::with_amount(raw.kind, amount, raw.start_time, raw.segments)?,
            None => Self::new(raw.kind, raw.start_time, raw.segments)?,
        };
        Ok(Self { id: raw.id, ..event })
    }
}

/// Relative tolerance when checking a declared total against its segments
const AMOUNT_TOLERANCE: f64 = 1e-9;

impl DoseEvent {
    /// Build an event whose total is the sum of its segments
    pub fn new(kind: DoseKind, start_time: f64, segments: Vec<AbsorptionSegment>) -> Result<Self> {
        let amount = segments.iter().map(|s| s.amount()).sum();
        Self::with_amount(kind, amount, start_time, segments)
    }

    /// Build an event with an explicit total, checked against the segments
    pub fn with_amount(
        kind: DoseKind,
        amount: f64,
        start_time: f64,
        segments: Vec<AbsorptionSegment>,
    ) -> Result<Self> {
        if !start_time.is_finite() {
            return Err(Error::InvalidEvent(format!(
                "start time must be finite, got {}",
                start_time
            )));
        }
        if segments.is_empty() {
            return Err(Error::InvalidEvent(format!(
                "{:?} event has no absorption segments",
                kind
            )));
        }

        match kind {
            DoseKind::Insulin => {
                if segments.len() != 1 || !segments[0].shape().is_exponential() {
                    return Err(Error::InvalidEvent(
                        "insulin events take exactly one exponential segment".into(),
                    ));
                }
            }
            DoseKind::Carb | DoseKind::Protein => {
                if segments.iter().any(|s| s.shape().is_exponential()) {
                    return Err(Error::InvalidEvent(format!(
                        "{:?} events cannot use the exponential insulin curve",
                        kind
                    )));
                }
            }
        }

        let segment_total: f64 = segments.iter().map(|s| s.amount()).sum();
        if (segment_total - amount).abs() > AMOUNT_TOLERANCE * amount.abs().max(1.0) {
            return Err(Error::InvalidEvent(format!(
                "segments sum to {} but event amount is {}",
                segment_total, amount
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            amount,
            start_time,
            segments,
        })
    }

    /// Insulin bolus released through an exponential action curve
    pub fn insulin(units: f64, start_time: f64, curve: InsulinCurve) -> Result<Self> {
        let segment = AbsorptionSegment::insulin(units, curve)?;
        Self::new(DoseKind::Insulin, start_time, vec![segment])
    }

    /// Carbohydrate intake split across digestion phases
    pub fn carbs(start_time: f64, segments: Vec<AbsorptionSegment>) -> Result<Self> {
        Self::new(DoseKind::Carb, start_time, segments)
    }

    /// Protein intake using the delayed protein absorption window
    pub fn protein(grams: f64, start_time: f64, shape: CurveShape) -> Result<Self> {
        let segment = AbsorptionSegment::new(grams, PROTEIN_DELAY, PROTEIN_DURATION, shape)?;
        Self::new(DoseKind::Protein, start_time, vec![segment])
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> DoseKind {
        self.kind
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn segments(&self) -> &[AbsorptionSegment] {
        &self.segments
    }

    /// Clock time after which no segment contributes
    pub fn end_time(&self) -> f64 {
        let last = self
            .segments
            .iter()
            .map(|s| s.end())
            .fold(0.0_f64, f64::max);
        self.start_time + last
    }

    /// True once every segment has fully released
    pub fn is_inert(&self, now: f64) -> bool {
        now >= self.end_time()
    }

    /// Amount released between dose start and clock time `now`
    pub fn released_at(&self, now: f64) -> f64 {
        let since_start = now - self.start_time;
        self.segments
            .iter()
            .map(|s| s.released(since_start - s.delay()))
            .sum()
    }

    /// Unreleased remainder at clock time `now`
    pub fn remaining_at(&self, now: f64) -> f64 {
        (self.amount - self.released_at(now)).max(0.0)
    }

    /// Summed instantaneous release rate at clock time `now`
    pub fn rate_at(&self, now: f64) -> f64 {
        let since_start = now - self.start_time;
        self.segments
            .iter()
            .map(|s| s.rate(since_start - s.delay()))
            .sum()
    }
}

// ============================================================================
// Simulation State
// ============================================================================

/// Result of one simulation step
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct SimulationState {
    /// Simulation clock (minutes)
    pub time: f64,
    /// Blood glucose (mg/dL), never negative
    pub bg: f64,
    /// Unreleased insulin across active insulin events (U)
    pub insulin_on_board: f64,
    /// Unreleased carbohydrate across active carb events (g)
    pub carbs_on_board: f64,
    /// Insulin released during the step ending here (U)
    pub insulin_released: f64,
    /// Carbohydrate released during the step ending here (g)
    pub carbs_released: f64,
    /// BG change from insulin over the step, after dampening (mg/dL)
    pub insulin_effect: f64,
    /// BG change from carbs and protein over the step (mg/dL)
    pub carb_effect: f64,
}

/// Ordered, immutable sequence of simulation states
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct Trajectory {
    states: Vec<SimulationState>,
}

impl Trajectory {
    pub fn new(states: Vec<SimulationState>) -> Self {
        Self { states }
    }

    pub fn states(&self) -> &[SimulationState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn last(&self) -> Option<&SimulationState> {
        self.states.last()
    }

    /// BG readings in time order
    pub fn bg_values(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.bg).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SimulationState> {
        self.states.iter()
    }
}

impl FromIterator<SimulationState> for Trajectory {
    fn from_iter<I: IntoIterator<Item = SimulationState>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a SimulationState;
    type IntoIter = std::slice::Iter<'a, SimulationState>;

    fn into_iter(self) -> Self::IntoIter {
        self.states.iter()
    }
}
