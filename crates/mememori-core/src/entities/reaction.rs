//! Reaction entity - one reactor's emoji choice on one message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::{timestamp, MessageId, UserId};

/// The fixed reaction palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionType {
    Like,
    Heart,
    Smile,
    Sad,
    Agree,
}

impl ReactionType {
    /// Palette in display order
    pub const PALETTE: [ReactionType; 5] = [
        Self::Like,
        Self::Heart,
        Self::Smile,
        Self::Sad,
        Self::Agree,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Heart => "heart",
            Self::Smile => "smile",
            Self::Sad => "sad",
            Self::Agree => "agree",
        }
    }

    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Like => "👍",
            Self::Heart => "❤️",
            Self::Smile => "😄",
            Self::Sad => "😢",
            Self::Agree => "👌",
        }
    }

    /// Parse the wire name
    pub fn parse(s: &str) -> Option<Self> {
        Self::PALETTE.into_iter().find(|kind| kind.as_str() == s)
    }

    /// Map a palette emoji back to its type
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        Self::PALETTE.into_iter().find(|kind| kind.emoji() == emoji)
    }
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reaction entity
///
/// At most one row exists per (message, user); choosing another emoji replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Omitted inside the by-message batch response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    pub user_id: UserId,
    pub reaction_type: ReactionType,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Reaction {
    /// Create a new Reaction
    pub fn new(message_id: MessageId, user_id: UserId, reaction_type: ReactionType) -> Self {
        Self {
            message_id: Some(message_id),
            user_id,
            reaction_type,
            created_at: Some(Utc::now()),
        }
    }

    /// Check if reaction uses a specific type
    #[inline]
    pub fn is_type(&self, reaction_type: ReactionType) -> bool {
        self.reaction_type == reaction_type
    }
}

/// Body of `POST /reactions`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionInput {
    pub message_id: MessageId,
    pub user_id: UserId,
    pub reaction_type: ReactionType,
}
