//! Composer - the pending outbound message and the send sequence
//!
//! The send sequence is: resolve the thread, create the message, upload the staged
//! file against it, then announce both on the channel. `ChatView::send` drives it
//! under the `SendingFlag` and finishes with a full refetch.

use std::sync::atomic::{AtomicBool, Ordering};

use mememori_core::{
    Attachment, ChatEvent, ItemId, Message, MessageId, NewMessage, PendingFile, ThreadId,
};
use tracing::{debug, instrument, warn};

use crate::context::ChatContext;
use crate::error::ChatResult;
use crate::thread::ThreadResolver;

/// Bytes of the reply target's content shown above the input
const REPLY_PREVIEW_LEN: usize = 80;

/// What the composer shows while a reply target is set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDraft {
    pub message_id: MessageId,
    pub username: String,
    pub preview: String,
}

/// A snapshot of the composer, taken when a send starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub content: String,
    pub file: Option<PendingFile>,
    pub parent_message_id: Option<MessageId>,
}

impl Draft {
    /// Whitespace-only text and no file
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.file.is_none()
    }
}

/// Pending outbound message
#[derive(Debug, Clone, Default)]
pub struct Composer {
    text: String,
    file: Option<PendingFile>,
    reply_target: Option<Message>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Stage a file, replacing any file staged before
    pub fn stage_file(&mut self, file: PendingFile) {
        self.file = Some(file);
    }

    pub fn clear_file(&mut self) {
        self.file = None;
    }

    pub fn staged_file_name(&self) -> Option<&str> {
        self.file.as_ref().map(|f| f.file_name.as_str())
    }

    pub fn reply_to(&mut self, target: Message) {
        self.reply_target = Some(target);
    }

    pub fn cancel_reply(&mut self) {
        self.reply_target = None;
    }

    pub fn reply_target(&self) -> Option<&Message> {
        self.reply_target.as_ref()
    }

    pub fn reply_preview(&self) -> Option<ReplyDraft> {
        self.reply_target.as_ref().map(|target| ReplyDraft {
            message_id: target.message_id,
            username: target.username.clone(),
            preview: target.preview(REPLY_PREVIEW_LEN).to_string(),
        })
    }

    pub fn draft(&self) -> Draft {
        Draft {
            content: self.text.clone(),
            file: self.file.clone(),
            parent_message_id: self.reply_target.as_ref().map(|m| m.message_id),
        }
    }

    /// Reset text, staged file and reply target
    pub fn clear(&mut self) {
        self.text.clear();
        self.file = None;
        self.reply_target = None;
    }
}

/// Guard flag allowing one send at a time
#[derive(Debug, Default)]
pub struct SendingFlag(AtomicBool);

impl SendingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the flag, or `None` while a send is in flight
    pub fn try_acquire(&self) -> Option<SendingGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SendingGuard { flag: self })
    }

    pub fn is_sending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the `SendingFlag` on every exit path
#[derive(Debug)]
pub struct SendingGuard<'a> {
    flag: &'a SendingFlag,
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.flag.0.store(false, Ordering::Release);
    }
}

/// Result of a send call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent(MessageId),
    /// Another send was in flight
    Busy,
    /// Nothing to send
    Empty,
    /// The item has no thread yet
    NoThread,
}

/// Send sequence steps
pub struct SendSequence<'a> {
    ctx: &'a ChatContext,
}

impl<'a> SendSequence<'a> {
    /// Create a new SendSequence
    pub fn new(ctx: &'a ChatContext) -> Self {
        Self { ctx }
    }

    /// Resolve the thread and create the message
    ///
    /// Returns `None` when the item has no thread.
    #[instrument(skip(self, content), fields(item_id = %item_id))]
    pub async fn create(
        &self,
        item_id: &ItemId,
        content: &str,
        parent_message_id: Option<MessageId>,
    ) -> ChatResult<Option<(ThreadId, Message)>> {
        let thread_id = match ThreadResolver::new(self.ctx).resolve(item_id).await {
            Ok(thread_id) => thread_id,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let new = NewMessage::new(thread_id, self.ctx.user_id(), content).with_parent(parent_message_id);
        let message = self.ctx.backend().create_message(&new).await?;
        debug!(message_id = %message.message_id, "Message created");
        Ok(Some((thread_id, message)))
    }

    /// Upload the staged file against a created message
    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.len()))]
    pub async fn attach(&self, message_id: MessageId, file: &PendingFile) -> ChatResult<Attachment> {
        Ok(self.ctx.backend().upload_attachment(message_id, file).await?)
    }

    /// Announce the attachment, then the message
    ///
    /// The emitted message always carries `thread_id`. Emit failures are logged only:
    /// the message exists on the server and peers pick it up on their next fetch.
    #[instrument(skip_all, fields(message_id = %message.message_id))]
    pub async fn announce(&self, thread_id: ThreadId, mut message: Message, attachment: Option<Attachment>) {
        let channel = self.ctx.channel();
        if let Some(attachment) = attachment {
            let event = ChatEvent::new_attachment(message.message_id, vec![attachment]);
            if let Err(e) = channel.emit(event).await {
                warn!(error = %e, "Failed to announce attachment");
            }
        }

        message.thread_id.get_or_insert(thread_id);
        if let Err(e) = channel.emit(ChatEvent::SendMessage(message)).await {
            warn!(error = %e, "Failed to announce message");
        }
    }
}
