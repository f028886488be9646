//! # mememori-chat
//!
//! The per-item chat core.
//!
//! ## Overview
//!
//! - `thread`: item to thread resolution, creating the thread on demand
//! - `messages`: the ordered message list of the open thread
//! - `attachments`: per-message attachments, fetched with one lookup per message
//! - `reactions`: per-message reactions with optimistic edits and versioned refetches
//! - `composer`: the pending outbound message and the send sequence
//! - `selection`: the context menu state machine and long-press detection
//! - `timeline`: the render model (date separators, reply previews, badges)
//! - `view`: `ChatView`, which wires all of the above to one item and the shared channel
//!
//! All I/O goes through the `ChatBackend` and `EventChannel` ports carried by
//! `ChatContext`.

pub mod attachments;
pub mod composer;
pub mod context;
pub mod error;
pub mod messages;
pub mod reactions;
pub mod selection;
pub mod thread;
pub mod time;
pub mod timeline;
pub mod view;

#[cfg(test)]
mod testing;

pub use attachments::{AttachmentMap, AttachmentResolver};
pub use composer::{Composer, Draft, ReplyDraft, SendOutcome, SendSequence, SendingFlag};
pub use context::{ChatContext, ChatContextBuilder};
pub use error::{ChatError, ChatResult};
pub use messages::MessageStore;
pub use reactions::{ReactOutcome, ReactionAggregator, ReactionBadge, ReactionBook, ReactionChange};
pub use selection::{ContextMenu, DeleteOutcome, DeleteRequest, DismissReason, LongPress, Point};
pub use thread::ThreadResolver;
pub use timeline::{AttachmentView, DateSeparator, MessageRow, ReplyPreview, TimelineEntry};
pub use view::{ChatView, EventDisposition, FetchOutcome};
