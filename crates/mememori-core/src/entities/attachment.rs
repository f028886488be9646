//! Attachment entity - media bound to exactly one message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{timestamp, AttachmentId, MessageId};

/// Kind of media an attachment carries
///
/// Anything the backend reports that is not image, video or voice is treated as a
/// plain file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    Voice,
    #[serde(other)]
    File,
}

impl AttachmentKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Voice => "voice",
            Self::File => "file",
        }
    }

    /// Guess the kind from a MIME type
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else if mime.starts_with("audio/") {
            Self::Voice
        } else {
            Self::File
        }
    }
}

/// Attachment entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_id: AttachmentId,
    /// Lookups keyed by message id may omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    pub attachment_url: String,
    pub attachment_type: AttachmentKind,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl Attachment {
    pub fn new(
        attachment_id: AttachmentId,
        message_id: MessageId,
        attachment_url: impl Into<String>,
        attachment_type: AttachmentKind,
    ) -> Self {
        Self {
            attachment_id,
            message_id: Some(message_id),
            attachment_url: attachment_url.into(),
            attachment_type,
            uploaded_at: None,
        }
    }
}

/// A file chosen for upload but not sent yet
#[derive(Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl PendingFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// A recorded voice clip, named the way the recorder names it
    pub fn voice_clip(bytes: Vec<u8>) -> Self {
        Self::new("voice-message.webm", "audio/webm", bytes)
    }

    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::from_mime(&self.mime_type)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for PendingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
