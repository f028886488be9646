//! Transport channel errors

use mememori_core::DomainError;
use tokio_tungstenite::tungstenite;

use crate::protocol::FrameError;

/// Error type for channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Outbound buffer full")]
    BufferFull,

    #[error("Channel closed")]
    Closed,
}

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

impl From<ChannelError> for DomainError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Frame(FrameError::Json(e)) => DomainError::Decode(e.to_string()),
            other => DomainError::Transport(other.to_string()),
        }
    }
}
