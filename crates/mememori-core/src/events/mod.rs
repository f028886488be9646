//! Realtime events exchanged over the transport channel

mod chat_event;

pub use chat_event::{AttachmentsEvent, ChatEvent, ChatEventKind, MessageRef, ReactionSignal};
