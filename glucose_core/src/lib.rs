#![forbid(unsafe_code)]

//! Core glucose-insulin effect simulation for the bgsim what-if simulator.
//!
//! This crate provides:
//! - Absorption curve models for insulin, carbohydrate and protein
//! - Hypoglycemia dampening and pump-precision rounding
//! - The feedback-coupled trajectory simulator
//! - Correction bolus calculation
//! - Trajectory statistics
//! - A food catalog and randomized meal scenarios
//!
//! This is an educational simulation, not a clinically validated dosing
//! algorithm.

pub mod types;
pub mod error;
pub mod curves;
pub mod precision;
pub mod dampening;
pub mod correction;
pub mod config;
pub mod logging;
pub mod simulator;
pub mod stats;
pub mod nutrition;
pub mod catalog;
pub mod scenario;
pub mod scale;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use curves::{AbsorptionSegment, CarbCurve, CarbSpeed, CurveShape, InsulinCurve};
pub use config::{Config, PatientProfile};
pub use dampening::HypoDampening;
pub use correction::{calc_correction, calc_pure_correction, recommend_correction};
pub use simulator::{simulate, Integration, SimulationParams, Simulator};
pub use stats::{summarize, BgRange, RangeBreakdown, Summary};
pub use catalog::{get_default_catalog, Food, MealCategory};
pub use scenario::ScenarioGenerator;
pub use export::{CsvSink, JsonlSink, TrajectorySink};
