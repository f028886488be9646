//! Realtime chat events
//!
//! These are the message lifecycle events carried by the shared transport channel.
//! Clients emit the first five; the server relays them and additionally sends
//! `reaction_added` / `reaction_removed`, which receivers treat as refetch triggers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::entities::{Attachment, Message, ReactionType};
use crate::value_objects::{MessageId, UserId};

/// Event names on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatEventKind {
    SendMessage,
    DeleteMessage,
    NewAttachment,
    AddReaction,
    RemoveReaction,
    ReactionAdded,
    ReactionRemoved,
}

impl ChatEventKind {
    /// Get the string representation of the event name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SendMessage => "send_message",
            Self::DeleteMessage => "delete_message",
            Self::NewAttachment => "new_attachment",
            Self::AddReaction => "add_reaction",
            Self::RemoveReaction => "remove_reaction",
            Self::ReactionAdded => "reaction_added",
            Self::ReactionRemoved => "reaction_removed",
        }
    }

    /// Parse an event name; `receive_message` is the older name of `send_message`
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "send_message" | "receive_message" => Some(Self::SendMessage),
            "delete_message" => Some(Self::DeleteMessage),
            "new_attachment" => Some(Self::NewAttachment),
            "add_reaction" => Some(Self::AddReaction),
            "remove_reaction" => Some(Self::RemoveReaction),
            "reaction_added" => Some(Self::ReactionAdded),
            "reaction_removed" => Some(Self::ReactionRemoved),
            _ => None,
        }
    }
}

impl fmt::Display for ChatEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `delete_message` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub message_id: MessageId,
}

/// `new_attachment` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentsEvent {
    pub message_id: MessageId,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Payload of every reaction event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSignal {
    pub message_id: MessageId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction_type: Option<ReactionType>,
}

/// A decoded realtime event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    SendMessage(Message),
    DeleteMessage(MessageRef),
    NewAttachment(AttachmentsEvent),
    AddReaction(ReactionSignal),
    RemoveReaction(ReactionSignal),
    ReactionAdded(ReactionSignal),
    ReactionRemoved(ReactionSignal),
}

impl ChatEvent {
    pub fn delete_message(message_id: MessageId) -> Self {
        Self::DeleteMessage(MessageRef { message_id })
    }

    pub fn new_attachment(message_id: MessageId, attachments: Vec<Attachment>) -> Self {
        Self::NewAttachment(AttachmentsEvent {
            message_id,
            attachments,
        })
    }

    pub fn add_reaction(message_id: MessageId, user_id: UserId, kind: ReactionType) -> Self {
        Self::AddReaction(ReactionSignal {
            message_id,
            user_id,
            reaction_type: Some(kind),
        })
    }

    pub fn remove_reaction(message_id: MessageId, user_id: UserId) -> Self {
        Self::RemoveReaction(ReactionSignal {
            message_id,
            user_id,
            reaction_type: None,
        })
    }

    /// Get the event name
    pub fn kind(&self) -> ChatEventKind {
        match self {
            Self::SendMessage(_) => ChatEventKind::SendMessage,
            Self::DeleteMessage(_) => ChatEventKind::DeleteMessage,
            Self::NewAttachment(_) => ChatEventKind::NewAttachment,
            Self::AddReaction(_) => ChatEventKind::AddReaction,
            Self::RemoveReaction(_) => ChatEventKind::RemoveReaction,
            Self::ReactionAdded(_) => ChatEventKind::ReactionAdded,
            Self::ReactionRemoved(_) => ChatEventKind::ReactionRemoved,
        }
    }

    /// The message this event is about
    pub fn message_id(&self) -> MessageId {
        match self {
            Self::SendMessage(msg) => msg.message_id,
            Self::DeleteMessage(r) => r.message_id,
            Self::NewAttachment(e) => e.message_id,
            Self::AddReaction(s)
            | Self::RemoveReaction(s)
            | Self::ReactionAdded(s)
            | Self::ReactionRemoved(s) => s.message_id,
        }
    }

    /// Encode the payload
    pub fn to_data(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::SendMessage(msg) => serde_json::to_value(msg),
            Self::DeleteMessage(r) => serde_json::to_value(r),
            Self::NewAttachment(e) => serde_json::to_value(e),
            Self::AddReaction(s)
            | Self::RemoveReaction(s)
            | Self::ReactionAdded(s)
            | Self::ReactionRemoved(s) => serde_json::to_value(s),
        }
    }

    /// Decode a payload received under `kind`
    pub fn from_data(kind: ChatEventKind, data: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            ChatEventKind::SendMessage => Self::SendMessage(serde_json::from_value(data)?),
            ChatEventKind::DeleteMessage => Self::DeleteMessage(serde_json::from_value(data)?),
            ChatEventKind::NewAttachment => Self::NewAttachment(serde_json::from_value(data)?),
            ChatEventKind::AddReaction => Self::AddReaction(serde_json::from_value(data)?),
            ChatEventKind::RemoveReaction => Self::RemoveReaction(serde_json::from_value(data)?),
            ChatEventKind::ReactionAdded => Self::ReactionAdded(serde_json::from_value(data)?),
            ChatEventKind::ReactionRemoved => Self::ReactionRemoved(serde_json::from_value(data)?),
        })
    }
}
