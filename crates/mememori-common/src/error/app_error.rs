//! Client error types
//!
//! Unified error handling for the application shell around the chat core.

use mememori_core::DomainError;

use crate::config::ConfigError;
use crate::telemetry::TracingError;

/// Client-wide error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // Startup errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TracingError),

    // Input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Internal errors
    #[error("Internal client error")]
    Internal(#[source] anyhow::Error),
}

impl ClientError {
    /// Get error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Telemetry(_) => "TELEMETRY_ERROR",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Domain(e) => e.code(),
        }
    }

    /// Check if the failed operation may succeed when tried again
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Domain(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(msg: impl std::fmt::Display) -> Self {
        Self::InvalidInput(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
