//! Error types for the simulation kernel.

use thiserror::Error;

/// Conditions that reject an operation before it mutates anything.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A configuration value cannot be used (k < 2, p outside [0,1], ...)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The population is too small for the requested lattice degree
    #[error("insufficient entities: need at least {required}, found {available}")]
    InsufficientEntities { required: usize, available: usize },
}

impl SimError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SimError::InvalidConfig(message.into())
    }
}
