//! Timeline - the render model of the open thread
//!
//! Built on demand from the message store, the attachment map and the reaction book.
//! A date separator precedes the first message and every message whose local
//! calendar day differs from the one before it.

use chrono::{FixedOffset, NaiveDate};
use mememori_core::{Attachment, AttachmentKind, Message, MessageId, UserId};

use crate::attachments::AttachmentMap;
use crate::messages::MessageStore;
use crate::reactions::{ReactionBadge, ReactionBook};
use crate::time;

/// Shown in place of a quote whose parent is gone
pub const DELETED_PLACEHOLDER: &str = "メッセージは削除されました";

/// Link text of an attachment with no usable file name
pub const FILE_LINK_LABEL: &str = "添付ファイルを開く";

/// Bytes of the parent's content quoted in a reply
const QUOTE_LEN: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSeparator {
    pub date: NaiveDate,
    pub label: String,
}

/// Quote shown above a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPreview {
    None,
    Quoted { username: String, content: String },
    /// The parent is no longer in the thread
    Deleted,
}

impl ReplyPreview {
    fn for_message(message: &Message, store: &MessageStore) -> Self {
        let Some(parent_id) = message.parent_message_id else {
            return Self::None;
        };
        match store.find(parent_id) {
            Some(parent) => Self::Quoted {
                username: parent.username.clone(),
                content: parent.preview(QUOTE_LEN).to_string(),
            },
            None => Self::Deleted,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }

    /// Text of the quote, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Quoted { content, .. } => Some(content),
            Self::Deleted => Some(DELETED_PLACEHOLDER),
        }
    }
}

/// How one attachment renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentView {
    Image { url: String },
    Video { url: String },
    Voice { url: String },
    FileLink { url: String, name: String },
}

impl AttachmentView {
    pub fn url(&self) -> &str {
        match self {
            Self::Image { url } | Self::Video { url } | Self::Voice { url } | Self::FileLink { url, .. } => url,
        }
    }
}

impl From<&Attachment> for AttachmentView {
    fn from(attachment: &Attachment) -> Self {
        let url = attachment.attachment_url.clone();
        match attachment.attachment_type {
            AttachmentKind::Image => Self::Image { url },
            AttachmentKind::Video => Self::Video { url },
            AttachmentKind::Voice => Self::Voice { url },
            AttachmentKind::File => {
                let name = file_name(&url).unwrap_or(FILE_LINK_LABEL).to_string();
                Self::FileLink { url, name }
            }
        }
    }
}

/// Last path segment of a URL, without query or fragment
fn file_name(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    path.rsplit('/').next().filter(|name| !name.is_empty() && !name.contains(':'))
}

/// One message as rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub message: Message,
    /// Authored by the current user
    pub is_own: bool,
    pub time_label: String,
    pub reply: ReplyPreview,
    pub attachments: Vec<AttachmentView>,
    pub reactions: Vec<ReactionBadge>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEntry {
    DateSeparator(DateSeparator),
    Message(MessageRow),
}

impl TimelineEntry {
    pub fn as_message(&self) -> Option<&MessageRow> {
        match self {
            Self::Message(row) => Some(row),
            Self::DateSeparator(_) => None,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, Self::DateSeparator(_))
    }
}

/// Inputs of one timeline build
pub struct TimelineBuilder<'a> {
    messages: &'a MessageStore,
    attachments: &'a AttachmentMap,
    reactions: &'a ReactionBook,
    offset: FixedOffset,
    user_id: UserId,
    hovered: Option<MessageId>,
}

impl<'a> TimelineBuilder<'a> {
    pub fn new(
        messages: &'a MessageStore,
        attachments: &'a AttachmentMap,
        reactions: &'a ReactionBook,
        offset: FixedOffset,
        user_id: UserId,
    ) -> Self {
        Self {
            messages,
            attachments,
            reactions,
            offset,
            user_id,
            hovered: None,
        }
    }

    /// The hovered message shows every palette emoji
    #[must_use]
    pub fn hovered(mut self, message_id: Option<MessageId>) -> Self {
        self.hovered = message_id;
        self
    }

    pub fn build(&self) -> Vec<TimelineEntry> {
        let mut entries = Vec::with_capacity(self.messages.len() * 2);
        let mut previous_day: Option<NaiveDate> = None;

        for message in self.messages.iter() {
            let day = time::local_day(message.created_at, self.offset);
            if previous_day != Some(day) {
                entries.push(TimelineEntry::DateSeparator(DateSeparator {
                    date: day,
                    label: time::format_date_label(day),
                }));
            }
            previous_day = Some(day);
            entries.push(TimelineEntry::Message(self.row(message)));
        }
        entries
    }

    fn row(&self, message: &Message) -> MessageRow {
        let id = message.message_id;
        MessageRow {
            message: message.clone(),
            is_own: message.user_id == self.user_id,
            time_label: time::format_time(message.created_at, self.offset),
            reply: ReplyPreview::for_message(message, self.messages),
            attachments: self.attachments.get(id).iter().map(AttachmentView::from).collect(),
            reactions: self
                .reactions
                .badges(id, self.user_id, self.hovered == Some(id)),
        }
    }
}
