//! Message entity - represents a chat message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{timestamp, MessageId, ThreadId, UserId};

/// Message entity
///
/// Messages are never edited in place: they are created by an explicit send and
/// hard-deleted by an explicit delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    /// List responses may omit the thread id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    pub user_id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Empty for attachment-only messages
    #[serde(default)]
    pub content: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub parent_message_id: Option<MessageId>,
}

impl Message {
    /// Create a new Message
    pub fn new(
        message_id: MessageId,
        thread_id: ThreadId,
        user_id: UserId,
        username: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            message_id,
            thread_id: Some(thread_id),
            user_id,
            username: username.into(),
            photo_url: None,
            content: content.into(),
            created_at,
            parent_message_id: None,
        }
    }

    /// Mark this message as a reply to `parent`
    #[must_use]
    pub fn replying_to(mut self, parent: MessageId) -> Self {
        self.parent_message_id = Some(parent);
        self
    }

    /// Check if message is a reply
    #[inline]
    pub fn is_reply(&self) -> bool {
        self.parent_message_id.is_some()
    }

    /// Check if message text is empty (attachment-only message)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Check if the message belongs to `thread_id`
    ///
    /// A message without a thread id belongs to no known thread.
    #[inline]
    pub fn is_in_thread(&self, thread_id: ThreadId) -> bool {
        self.thread_id == Some(thread_id)
    }

    /// Get a truncated preview of the message (for reply quotes)
    pub fn preview(&self, max_len: usize) -> &str {
        if self.content.len() <= max_len {
            &self.content
        } else {
            let mut end = max_len;
            while !self.content.is_char_boundary(end) && end > 0 {
                end -= 1;
            }
            &self.content[..end]
        }
    }
}

/// Body of `POST /messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub thread_id: ThreadId,
    pub user_id: UserId,
    pub content: String,
    pub parent_message_id: Option<MessageId>,
}

impl NewMessage {
    pub fn new(thread_id: ThreadId, user_id: UserId, content: impl Into<String>) -> Self {
        Self {
            thread_id,
            user_id,
            content: content.into(),
            parent_message_id: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Option<MessageId>) -> Self {
        self.parent_message_id = parent;
        self
    }
}
