//! Domain errors - error types for the domain layer and its ports

use thiserror::Error;

use crate::value_objects::{ItemId, MessageId};

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("No thread for item: {0}")]
    ThreadNotFound(ItemId),

    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Message has neither text nor attachment")]
    EmptyMessage,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for logs and UI mapping
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::ThreadNotFound(_) => "UNKNOWN_THREAD",
            Self::MessageNotFound(_) => "UNKNOWN_MESSAGE",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::EmptyMessage => "EMPTY_MESSAGE",

            // Infrastructure
            Self::Backend { .. } => "BACKEND_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Build a backend error from an HTTP status and body
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ThreadNotFound(_) | Self::MessageNotFound(_) | Self::Backend { status: 404, .. }
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::EmptyMessage | Self::Backend { status: 400, .. }
        )
    }

    /// Check if retrying the same call later could succeed
    ///
    /// The core never retries on its own; this only drives log levels and UI hints.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Transport(_) => true,
            Self::Backend { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
