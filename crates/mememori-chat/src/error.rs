//! Chat core errors

use mememori_common::ClientError;
use mememori_core::DomainError;

/// Chat core error type
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    // Wrap domain and port errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Chat view is closed")]
    NotMounted,

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ChatError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Get the error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::NotMounted => "VIEW_CLOSED",
            Self::Validation(_) => "VALIDATION_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_not_found())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_transient())
    }
}

impl From<ChatError> for ClientError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Domain(e) => ClientError::Domain(e),
            ChatError::Validation(msg) => ClientError::InvalidInput(msg),
            ChatError::NotMounted => ClientError::internal(ChatError::NotMounted),
        }
    }
}

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;
