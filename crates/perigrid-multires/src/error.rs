//! Error types for grid schedule and upsampling operations.

use thiserror::Error;

/// Main error type for control-grid operations.
#[derive(Error, Debug)]
pub enum GridError {
    /// User-supplied configuration is inconsistent. Fatal, never corrected
    /// silently.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A parameter entry could not be parsed.
    #[error("Invalid value for parameter '{key}' entry {index}: '{value}'")]
    InvalidParameter {
        key: String,
        index: usize,
        value: String,
    },

    /// Two grids that must share a coordinate frame do not.
    #[error("Incompatible grids: {0}")]
    IncompatibleGrids(String),

    /// Coefficient vector length does not match the grid it is claimed for.
    #[error("Coefficient length mismatch: expected {expected}, got {actual}")]
    CoefficientLength { expected: usize, actual: usize },

    /// The level driver was advanced out of order.
    #[error("Level transition error: {0}")]
    LevelTransition(String),
}

/// Result type for control-grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

impl GridError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an incompatible grids error.
    pub fn incompatible_grids(msg: impl Into<String>) -> Self {
        Self::IncompatibleGrids(msg.into())
    }

    /// Create a level transition error.
    pub fn level_transition(msg: impl Into<String>) -> Self {
        Self::LevelTransition(msg.into())
    }
}
