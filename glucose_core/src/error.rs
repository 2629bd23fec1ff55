//! Error types for the glucose_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for glucose_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Absorption segment parameters that cannot produce a finite curve
    #[error("Invalid absorption segment: {0}")]
    InvalidSegment(String),

    /// Dose event whose segments do not describe its total
    #[error("Invalid dose event: {0}")]
    InvalidEvent(String),

    /// Caller-supplied value outside its domain
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not enough samples for a statistic
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}
