//! Configuration file support for bgsim.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/bgsim/config.toml`.
//! Every section is optional and falls back to defaults.

use crate::curves::{CarbCurve, InsulinCurve};
use crate::dampening::HypoDampening;
use crate::simulator::Integration;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub patient: PatientProfile,

    #[serde(default)]
    pub dampening: HypoDampening,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub insulin: InsulinCurve,
}

/// How doses translate into BG change for one person
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct PatientProfile {
    /// mg/dL drop per unit of insulin; also the correction factor
    #[serde(default = "default_insulin_sensitivity")]
    pub insulin_sensitivity: f64,

    /// Grams of carbohydrate covered by one unit
    #[serde(default = "default_carb_ratio")]
    pub carb_ratio: f64,

    /// Grams of carb-equivalent per gram of protein
    #[serde(default = "default_protein_carb_equivalence")]
    pub protein_carb_equivalence: f64,

    #[serde(default = "default_target_bg")]
    pub target_bg: f64,
}

impl Default for PatientProfile {
    fn default() -> Self {
        Self {
            insulin_sensitivity: default_insulin_sensitivity(),
            carb_ratio: default_carb_ratio(),
            protein_carb_equivalence: default_protein_carb_equivalence(),
            target_bg: default_target_bg(),
        }
    }
}

impl PatientProfile {
    /// mg/dL rise per gram of carbohydrate
    pub fn carb_sensitivity(&self) -> f64 {
        self.insulin_sensitivity / self.carb_ratio
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("insulin_sensitivity", self.insulin_sensitivity),
            ("carb_ratio", self.carb_ratio),
            ("protein_carb_equivalence", self.protein_carb_equivalence),
            ("target_bg", self.target_bg),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!(
                    "patient.{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Simulation run defaults
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    #[serde(default = "default_initial_bg")]
    pub initial_bg: f64,

    #[serde(default = "default_step_minutes")]
    pub step_minutes: f64,

    #[serde(default = "default_horizon_minutes")]
    pub horizon_minutes: f64,

    #[serde(default)]
    pub integration: Integration,

    #[serde(default)]
    pub carb_curve: CarbCurve,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_bg: default_initial_bg(),
            step_minutes: default_step_minutes(),
            horizon_minutes: default_horizon_minutes(),
            integration: Integration::default(),
            carb_curve: CarbCurve::default(),
        }
    }
}

// Default value functions
fn default_insulin_sensitivity() -> f64 {
    40.0
}

fn default_carb_ratio() -> f64 {
    10.0
}

fn default_protein_carb_equivalence() -> f64 {
    0.5
}

fn default_target_bg() -> f64 {
    110.0
}

fn default_initial_bg() -> f64 {
    120.0
}

fn default_step_minutes() -> f64 {
    5.0
}

fn default_horizon_minutes() -> f64 {
    360.0
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        base.join("bgsim").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check every section for values the simulator cannot use
    pub fn validate(&self) -> Result<()> {
        self.patient.validate()?;
        self.dampening.validate()?;

        let sim = &self.simulation;
        if !sim.step_minutes.is_finite() || sim.step_minutes <= 0.0 {
            return Err(Error::Config(format!(
                "simulation.step_minutes must be positive, got {}",
                sim.step_minutes
            )));
        }
        if !sim.horizon_minutes.is_finite() || sim.horizon_minutes < 0.0 {
            return Err(Error::Config(format!(
                "simulation.horizon_minutes must be non-negative, got {}",
                sim.horizon_minutes
            )));
        }
        if !sim.initial_bg.is_finite() || sim.initial_bg < 0.0 {
            return Err(Error::Config(format!(
                "simulation.initial_bg must be non-negative, got {}",
                sim.initial_bg
            )));
        }

        let peak = self.insulin.peak;
        let duration = self.insulin.duration;
        if !(duration > 0.0 && peak > 0.0 && peak < duration / 2.0) {
            return Err(Error::Config(format!(
                "insulin peak must lie in (0, duration/2); got peak {} duration {}",
                peak, duration
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.patient.insulin_sensitivity, 40.0);
        assert_eq!(config.patient.carb_sensitivity(), 4.0);
        assert_eq!(config.dampening.threshold, 55.0);
        assert_eq!(config.simulation.step_minutes, 5.0);
        assert_eq!(config.insulin, InsulinCurve::RAPID);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.patient, parsed.patient);
        assert_eq!(config.simulation, parsed.simulation);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[patient]
carb_ratio = 12

[simulation]
integration = "euler"
carb_curve = "sine"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.patient.carb_ratio, 12.0);
        assert_eq!(config.patient.insulin_sensitivity, 40.0); // default
        assert_eq!(config.simulation.integration, Integration::Euler);
        assert_eq!(config.simulation.carb_curve, CarbCurve::Sine);
        assert_eq!(config.dampening.cutoff, 25.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.patient.target_bg = 100.0;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.patient.target_bg, 100.0);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[insulin]\npeak = 120\nduration = 240\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_patient_rejected() {
        let mut config = Config::default();
        config.patient.carb_ratio = 0.0;
        assert!(config.validate().is_err());
    }
}
