//! # mememori-core
//!
//! Domain layer for the item chat: entities, realtime events, domain errors, and the
//! ports the chat core talks through. This crate performs no I/O of its own.

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Attachment, AttachmentKind, Message, NewMessage, PendingFile, Reaction, ReactionInput,
    ReactionType, Thread,
};
pub use error::DomainError;
pub use events::{AttachmentsEvent, ChatEvent, ChatEventKind, MessageRef, ReactionSignal};
pub use traits::{ChatBackend, EventChannel, PortResult};
pub use value_objects::{AttachmentId, IdParseError, ItemId, MessageId, ThreadId, UserId};
