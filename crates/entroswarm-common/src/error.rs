//! Error types for Entroswarm
//!
//! Provides a unified error type and the construction-time configuration errors.
//! A round that fails to improve the best record is not an error.

use thiserror::Error;

/// Result type alias using SwarmError
pub type Result<T> = std::result::Result<T, SwarmError>;

/// Unified error type for Entroswarm operations
#[derive(Debug, Error)]
pub enum SwarmError {
    // Fatal, raised before the controller starts
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    // Fatal, raised when an environment gave up after its own recovery
    #[error("Collaborator unavailable: {agent} failed to {operation}: {reason}")]
    CollaboratorUnavailable {
        agent: String,
        operation: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SwarmError {
    /// Build a collaborator failure for the named agent and operation
    pub fn unavailable(
        agent: impl Into<String>,
        operation: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        SwarmError::CollaboratorUnavailable {
            agent: agent.into(),
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error must stop the controller before it starts
    pub fn is_configuration(&self) -> bool {
        matches!(self, SwarmError::Configuration(_))
    }
}

/// Construction-time configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Exploration mode not recognized: {0}")]
    UnknownExplorationMode(String),

    #[error("Fitness mode not recognized: {0}")]
    UnknownFitnessMode(String),

    #[error("Action generation mode not recognized: {0}")]
    UnknownActionMode(String),

    #[error("{mode} needs at least {required} assignable agents, got {actual}")]
    InsufficientPopulation {
        mode: String,
        required: usize,
        actual: usize,
    },

    #[error("Physical key pool is empty")]
    EmptyKeyPool,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<serde_json::Error> for SwarmError {
    fn from(err: serde_json::Error) -> Self {
        SwarmError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SwarmError {
    fn from(err: std::io::Error) -> Self {
        SwarmError::Io(err.to_string())
    }
}

impl From<anyhow::Error> for SwarmError {
    fn from(err: anyhow::Error) -> Self {
        SwarmError::Internal(err.to_string())
    }
}
