//! Event frame format
//!
//! Every event travels as one JSON text frame: `{"event": "<name>", "data": <payload>}`.

use mememori_core::{ChatEvent, ChatEventKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One frame on the realtime channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Event name
    pub event: String,

    /// Event payload
    #[serde(default)]
    pub data: Value,
}

/// Result of decoding a received frame
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Event(ChatEvent),
    /// Well-formed frame with an event name this client does not handle
    Unknown(String),
}

/// Frame encoding and decoding errors
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {event} payload: {source}")]
    Payload {
        event: ChatEventKind,
        #[source]
        source: serde_json::Error,
    },
}

impl Frame {
    /// Build the frame for an outgoing event
    pub fn from_event(event: &ChatEvent) -> Result<Self, FrameError> {
        Ok(Self {
            event: event.kind().as_str().to_string(),
            data: event.to_data()?,
        })
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON string
    pub fn from_json(text: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Interpret the payload according to the event name
    pub fn into_event(self) -> Result<Decoded, FrameError> {
        let Some(kind) = ChatEventKind::parse(&self.event) else {
            return Ok(Decoded::Unknown(self.event));
        };
        ChatEvent::from_data(kind, self.data)
            .map(Decoded::Event)
            .map_err(|source| FrameError::Payload { event: kind, source })
    }

    /// Encode an event straight to frame text
    pub fn encode(event: &ChatEvent) -> Result<String, FrameError> {
        Self::from_event(event)?.to_json()
    }

    /// Decode frame text straight to an event
    pub fn decode(text: &str) -> Result<Decoded, FrameError> {
        Self::from_json(text)?.into_event()
    }
}
