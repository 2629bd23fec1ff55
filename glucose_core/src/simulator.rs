//! Trajectory simulator.
//!
//! Each step is a pure transition from the previous [`SimulationState`]:
//! release amounts are taken from every dose's curves over `[t, t + dt]`,
//! the insulin effect is dampened using the previous BG, and BG is clamped
//! at zero. [`simulate`] folds that transition over a horizon; the
//! [`Simulator`] stepper allows events to be added between steps.

use crate::config::{Config, PatientProfile};
use crate::dampening::HypoDampening;
use crate::{DoseEvent, DoseKind, Error, Result, SimulationState, Trajectory};
use serde::{Deserialize, Serialize};

/// Slack when comparing accumulated clock values
const TIME_EPSILON: f64 = 1e-9;

/// How released amounts are computed for a step
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Integration {
    /// Closed-form curve integral over the step; conserves dose exactly
    #[default]
    Exact,
    /// Left-endpoint rate times step size
    Euler,
}

/// Everything a step needs besides the previous state and the events
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationParams {
    pub patient: PatientProfile,
    pub dampening: HypoDampening,
    pub step_size: f64,
    pub integration: Integration,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SimulationParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            patient: config.patient,
            dampening: config.dampening,
            step_size: config.simulation.step_minutes,
            integration: config.simulation.integration,
        }
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_integration(mut self, integration: Integration) -> Self {
        self.integration = integration;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "step size must be positive, got {}",
                self.step_size
            )));
        }
        self.patient.validate()?;
        self.dampening.validate()?;
        Ok(())
    }
}

/// Amount an event releases over `[t0, t0 + dt]`
fn released_during(event: &DoseEvent, t0: f64, dt: f64, integration: Integration) -> f64 {
    match integration {
        Integration::Exact => event.released_at(t0 + dt) - event.released_at(t0),
        Integration::Euler => event.rate_at(t0) * dt,
    }
}

/// Unreleased insulin and carbohydrate at `now`, counting only started events
fn on_board(events: &[DoseEvent], now: f64) -> (f64, f64) {
    events
        .iter()
        .filter(|e| e.start_time() <= now + TIME_EPSILON)
        .fold((0.0, 0.0), |(iob, cob), e| match e.kind() {
            DoseKind::Insulin => (iob + e.remaining_at(now), cob),
            DoseKind::Carb => (iob, cob + e.remaining_at(now)),
            DoseKind::Protein => (iob, cob),
        })
}

/// Advance one step from `prev`
///
/// Pure: the result depends only on the arguments. Events that have not
/// started or have already finished contribute nothing.
pub fn advance(
    prev: &SimulationState,
    events: &[DoseEvent],
    params: &SimulationParams,
) -> SimulationState {
    let dt = params.step_size;
    let t0 = prev.time;
    let t1 = t0 + dt;

    let mut insulin_released = 0.0;
    let mut carbs_released = 0.0;
    let mut protein_released = 0.0;
    for event in events {
        let amount = released_during(event, t0, dt, params.integration);
        match event.kind() {
            DoseKind::Insulin => insulin_released += amount,
            DoseKind::Carb => carbs_released += amount,
            DoseKind::Protein => protein_released += amount,
        }
    }

    let patient = &params.patient;
    let raw_insulin_rate = -(insulin_released / dt) * patient.insulin_sensitivity;
    let carb_equivalent = carbs_released + protein_released * patient.protein_carb_equivalence;
    let carb_rate = (carb_equivalent / dt) * patient.carb_sensitivity();

    let insulin_rate = params.dampening.dampen(raw_insulin_rate, prev.bg);
    let insulin_effect = insulin_rate * dt;
    let carb_effect = carb_rate * dt;

    let mut bg = prev.bg + insulin_effect + carb_effect;
    if bg < 0.0 {
        tracing::warn!(time = t1, bg, "BG driven below zero, clamping");
        bg = 0.0;
    }

    let (insulin_on_board, carbs_on_board) = on_board(events, t1);

    tracing::trace!(
        time = t1,
        bg,
        insulin_on_board,
        carbs_on_board,
        insulin_effect,
        carb_effect,
        "Simulation step"
    );

    SimulationState {
        time: t1,
        bg,
        insulin_on_board,
        carbs_on_board,
        insulin_released,
        carbs_released,
        insulin_effect,
        carb_effect,
    }
}

/// Stateful stepper over [`advance`]
///
/// Holds the latest state and the events that can still contribute.
/// Events may be added between steps, with start times in the past (their
/// remaining release is picked up from the next step) or in the future
/// (they stay pending until reached).
#[derive(Clone, Debug)]
pub struct Simulator {
    params: SimulationParams,
    state: SimulationState,
    events: Vec<DoseEvent>,
}

impl Simulator {
    pub fn new(initial_bg: f64, start_time: f64, params: SimulationParams) -> Result<Self> {
        params.validate()?;
        if !initial_bg.is_finite() || initial_bg < 0.0 {
            return Err(Error::InvalidInput(format!(
                "initial BG must be a non-negative number, got {}",
                initial_bg
            )));
        }
        if !start_time.is_finite() {
            return Err(Error::InvalidInput(format!(
                "start time must be finite, got {}",
                start_time
            )));
        }

        Ok(Self {
            params,
            state: SimulationState {
                time: start_time,
                bg: initial_bg,
                ..SimulationState::default()
            },
            events: Vec::new(),
        })
    }

    /// Register a dose event
    ///
    /// Events that finished before the current clock are ignored.
    pub fn add_event(&mut self, event: DoseEvent) {
        if event.is_inert(self.state.time) {
            tracing::debug!(
                id = %event.id(),
                "Ignoring {:?} event that ended at {}",
                event.kind(),
                event.end_time()
            );
            return;
        }

        tracing::debug!(
            id = %event.id(),
            start = event.start_time(),
            amount = event.amount(),
            "Added {:?} event",
            event.kind()
        );
        self.events.push(event);

        let (iob, cob) = on_board(&self.events, self.state.time);
        self.state.insulin_on_board = iob;
        self.state.carbs_on_board = cob;
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Events that are pending or still releasing
    pub fn active_events(&self) -> &[DoseEvent] {
        &self.events
    }

    /// Advance one step and drop events that have fully released
    pub fn step(&mut self) -> SimulationState {
        self.state = advance(&self.state, &self.events, &self.params);

        let now = self.state.time;
        self.events.retain(|e| {
            let keep = !e.is_inert(now);
            if !keep {
                tracing::debug!(id = %e.id(), "Dropping finished {:?} event", e.kind());
            }
            keep
        });

        self.state
    }

    /// Step until the clock reaches `end_time`, returning each new state
    pub fn run_until(&mut self, end_time: f64) -> Vec<SimulationState> {
        let mut states = Vec::new();
        while self.state.time + TIME_EPSILON < end_time {
            states.push(self.step());
        }
        states
    }
}

/// Number of steps needed to cover `horizon`
fn step_count(horizon: f64, step_size: f64) -> usize {
    ((horizon / step_size) - TIME_EPSILON).ceil().max(0.0) as usize
}

/// Simulate a BG trajectory from clock zero
///
/// The first state is the initial condition at time 0; one state follows
/// per step until `horizon` is covered.
pub fn simulate(
    initial_bg: f64,
    events: &[DoseEvent],
    horizon: f64,
    params: &SimulationParams,
) -> Result<Trajectory> {
    if !horizon.is_finite() || horizon < 0.0 {
        return Err(Error::InvalidInput(format!(
            "horizon must be non-negative, got {}",
            horizon
        )));
    }

    let mut sim = Simulator::new(initial_bg, 0.0, params.clone())?;
    for event in events {
        sim.add_event(event.clone());
    }

    let steps = step_count(horizon, params.step_size);
    tracing::info!(
        initial_bg,
        events = events.len(),
        steps,
        step_size = params.step_size,
        "Running simulation"
    );

    let initial = *sim.state();
    let trajectory = std::iter::once(initial)
        .chain((0..steps).map(|_| sim.step()))
        .collect();
    Ok(trajectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::{AbsorptionSegment, CarbSpeed, CurveShape, InsulinCurve};

    fn params() -> SimulationParams {
        SimulationParams::default()
    }

    fn meal(start: f64) -> DoseEvent {
        DoseEvent::carbs(
            start,
            vec![
                AbsorptionSegment::new(20.0, 0.0, CarbSpeed::Fast.duration(), CurveShape::Sawtooth)
                    .unwrap(),
                AbsorptionSegment::new(30.0, 0.0, CarbSpeed::Slow.duration(), CurveShape::Sine)
                    .unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_no_events_is_flat() {
        let t = simulate(120.0, &[], 60.0, &params()).unwrap();
        assert_eq!(t.len(), 13);
        assert!(t.iter().all(|s| s.bg == 120.0));
        assert_eq!(t.last().unwrap().time, 60.0);
    }

    #[test]
    fn test_horizon_rounds_up_to_whole_steps() {
        let t = simulate(120.0, &[], 62.0, &params()).unwrap();
        assert_eq!(t.len(), 14);
        let t = simulate(120.0, &[], 0.0, &params()).unwrap();
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_insulin_conserved_exactly() {
        crate::logging::init_test();
        let event = DoseEvent::insulin(2.0, 0.0, InsulinCurve::RAPID).unwrap();
        let t = simulate(300.0, &[event], 300.0, &params()).unwrap();

        let released: f64 = t.iter().map(|s| s.insulin_released).sum();
        assert!((released - 2.0).abs() < 1e-9, "released {}", released);

        let final_bg = t.last().unwrap().bg;
        assert!((final_bg - (300.0 - 2.0 * 40.0)).abs() < 1e-6, "bg {}", final_bg);
        assert_eq!(t.last().unwrap().insulin_on_board, 0.0);
    }

    #[test]
    fn test_euler_approximately_conserves() {
        let event = DoseEvent::insulin(2.0, 0.0, InsulinCurve::RAPID).unwrap();
        let p = params().with_integration(Integration::Euler);
        let t = simulate(300.0, &[event], 300.0, &p).unwrap();

        let released: f64 = t.iter().map(|s| s.insulin_released).sum();
        assert!((released - 2.0).abs() < 1e-2, "released {}", released);
    }

    #[test]
    fn test_iob_non_increasing_and_zero_after_duration() {
        let event = DoseEvent::insulin(3.0, 0.0, InsulinCurve::RAPID).unwrap();
        let t = simulate(250.0, &[event], 300.0, &params()).unwrap();

        assert_eq!(t.states()[0].insulin_on_board, 3.0);
        for pair in t.states().windows(2) {
            assert!(pair[1].insulin_on_board <= pair[0].insulin_on_board + 1e-12);
        }
        let after = t.iter().find(|s| s.time >= 240.0).unwrap();
        assert_eq!(after.insulin_on_board, 0.0);
    }

    #[test]
    fn test_carbs_raise_bg_by_sensitivity() {
        let t = simulate(100.0, &[meal(0.0)], 300.0, &params()).unwrap();
        // 50 g at 4 mg/dL per gram
        let final_bg = t.last().unwrap().bg;
        assert!((final_bg - 300.0).abs() < 1e-6, "bg {}", final_bg);
        assert_eq!(t.last().unwrap().carbs_on_board, 0.0);
        assert_eq!(t.states()[0].carbs_on_board, 50.0);
    }

    #[test]
    fn test_protein_raises_bg_but_not_cob() {
        let event = DoseEvent::protein(20.0, 0.0, CurveShape::Sawtooth).unwrap();
        let t = simulate(100.0, &[event], 480.0, &params()).unwrap();
        // 20 g protein = 10 g carb-equivalent = 40 mg/dL
        assert!((t.last().unwrap().bg - 140.0).abs() < 1e-6);
        assert!(t.iter().all(|s| s.carbs_on_board == 0.0));
        let before_delay = t.iter().find(|s| s.time == 175.0).unwrap();
        assert_eq!(before_delay.bg, 100.0);
    }

    #[test]
    fn test_overlapping_events_add() {
        let a = DoseEvent::insulin(1.0, 0.0, InsulinCurve::RAPID).unwrap();
        let b = DoseEvent::insulin(1.5, 30.0, InsulinCurve::RAPID).unwrap();
        let t = simulate(400.0, &[a, b], 300.0, &params()).unwrap();
        assert!((t.last().unwrap().bg - (400.0 - 2.5 * 40.0)).abs() < 1e-6);
    }

    #[test]
    fn test_dampening_holds_bg_off_the_floor() {
        let event = DoseEvent::insulin(10.0, 0.0, InsulinCurve::RAPID).unwrap();
        let t = simulate(100.0, &[event], 360.0, &params()).unwrap();

        let min = t.iter().map(|s| s.bg).fold(f64::INFINITY, f64::min);
        assert!(min > 20.0, "min bg {}", min);

        // Once below the cutoff, insulin stops acting
        for pair in t.states().windows(2) {
            if pair[0].bg < 25.0 {
                assert_eq!(pair[1].insulin_effect, 0.0);
            }
        }
    }

    #[test]
    fn test_dampening_never_touches_carbs() {
        let t = simulate(10.0, &[meal(0.0)], 60.0, &params()).unwrap();
        assert!(t.last().unwrap().bg > 10.0);
        assert!(t.iter().all(|s| s.insulin_effect == 0.0));
    }

    #[test]
    fn test_bg_clamped_at_zero() {
        let mut p = params();
        p.dampening = HypoDampening {
            threshold: 0.0,
            cutoff: -10.0,
            curve_origin: -10.0,
            min_factor: 0.01,
        };
        let event = DoseEvent::insulin(10.0, 0.0, InsulinCurve::RAPID).unwrap();
        let t = simulate(50.0, &[event], 300.0, &p).unwrap();
        assert!(t.iter().all(|s| s.bg >= 0.0));
        assert_eq!(t.last().unwrap().bg, 0.0);
    }

    #[test]
    fn test_event_added_mid_run_matches_upfront() {
        let upfront = simulate(120.0, &[meal(30.0)], 120.0, &params()).unwrap();

        let mut sim = Simulator::new(120.0, 0.0, params()).unwrap();
        let mut states = vec![*sim.state()];
        states.extend(sim.run_until(30.0));
        sim.add_event(meal(30.0));
        states.extend(sim.run_until(120.0));

        assert_eq!(states.len(), upfront.len());
        for (a, b) in states.iter().zip(upfront.iter()) {
            assert!((a.bg - b.bg).abs() < 1e-9);
        }
    }

    #[test]
    fn test_past_event_contributes_remaining_portion() {
        let event = DoseEvent::insulin(2.0, 0.0, InsulinCurve::RAPID).unwrap();
        let full = simulate(300.0, &[event.clone()], 300.0, &params()).unwrap();
        let at_60 = *full.iter().find(|s| s.time == 60.0).unwrap();

        let mut sim = Simulator::new(at_60.bg, 60.0, params()).unwrap();
        sim.add_event(event);
        assert!((sim.state().insulin_on_board - at_60.insulin_on_board).abs() < 1e-12);

        let late = sim.run_until(300.0);
        let expected: Vec<_> = full.iter().filter(|s| s.time > 60.0).collect();
        assert_eq!(late.len(), expected.len());
        for (a, b) in late.iter().zip(expected) {
            assert!((a.bg - b.bg).abs() < 1e-9);
            assert!((a.insulin_released - b.insulin_released).abs() < 1e-12);
        }
    }

    #[test]
    fn test_finished_events_dropped() {
        let mut sim = Simulator::new(120.0, 0.0, params()).unwrap();
        sim.add_event(meal(0.0));
        assert_eq!(sim.active_events().len(), 1);
        sim.run_until(195.0);
        assert!(sim.active_events().is_empty());

        // Already finished before the clock: ignored
        sim.add_event(meal(-500.0));
        assert!(sim.active_events().is_empty());
    }

    #[test]
    fn test_pending_event_not_on_board() {
        let mut sim = Simulator::new(120.0, 0.0, params()).unwrap();
        sim.add_event(DoseEvent::insulin(1.0, 60.0, InsulinCurve::RAPID).unwrap());
        assert_eq!(sim.state().insulin_on_board, 0.0);
        let states = sim.run_until(60.0);
        assert!(states.iter().all(|s| s.bg == 120.0));
        assert_eq!(states.last().unwrap().insulin_on_board, 1.0);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(simulate(-1.0, &[], 60.0, &params()).is_err());
        assert!(simulate(120.0, &[], -5.0, &params()).is_err());
        assert!(simulate(120.0, &[], 60.0, &params().with_step_size(0.0)).is_err());
    }
}
