//! Port traits
//!
//! The chat core defines what it needs from the REST backend and from the realtime
//! channel; the adapter crates provide the implementations.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{broadcast, watch};

use crate::entities::{Attachment, Message, NewMessage, PendingFile, Reaction, ReactionInput};
use crate::error::DomainError;
use crate::events::ChatEvent;
use crate::value_objects::{ItemId, MessageId, ThreadId, UserId};

/// Result type for port operations
pub type PortResult<T> = Result<T, DomainError>;

// ============================================================================
// REST backend
// ============================================================================

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// `GET /threads/by-item/{item_id}`; `None` when the item has no thread yet
    async fn find_thread_by_item(&self, item_id: &ItemId) -> PortResult<Option<ThreadId>>;

    /// `POST /threads`
    async fn create_thread(&self, item_id: &ItemId) -> PortResult<ThreadId>;

    /// `GET /messages?thread_id=`, in server order (oldest first)
    async fn list_messages(&self, thread_id: ThreadId) -> PortResult<Vec<Message>>;

    /// `POST /messages`
    async fn create_message(&self, message: &NewMessage) -> PortResult<Message>;

    /// `DELETE /messages/{message_id}`
    async fn delete_message(&self, message_id: MessageId) -> PortResult<()>;

    /// `GET /attachments/by-message/{message_id}`
    async fn list_attachments(&self, message_id: MessageId) -> PortResult<Vec<Attachment>>;

    /// `POST /message_attachments` (multipart)
    async fn upload_attachment(
        &self,
        message_id: MessageId,
        file: &PendingFile,
    ) -> PortResult<Attachment>;

    /// `POST /reactions` (upsert: the server keeps one row per message and user)
    async fn put_reaction(&self, reaction: &ReactionInput) -> PortResult<()>;

    /// `DELETE /reactions?message_id=&user_id=`
    async fn delete_reaction(&self, message_id: MessageId, user_id: UserId) -> PortResult<()>;

    /// `GET /reactions/batch/by-message-ids?ids=`
    async fn reactions_for_messages(
        &self,
        message_ids: &[MessageId],
    ) -> PortResult<HashMap<MessageId, Vec<Reaction>>>;
}

// ============================================================================
// Realtime channel
// ============================================================================

#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Publish an event to the other connected clients
    async fn emit(&self, event: ChatEvent) -> PortResult<()>;

    /// Receive every event delivered to this connection from now on
    fn subscribe(&self) -> broadcast::Receiver<ChatEvent>;

    /// Reconnection counter, bumped each time the connection is re-established
    ///
    /// Events sent while disconnected are lost, so subscribers refetch on every change.
    /// A channel that never reconnects returns a receiver whose sender is already gone.
    fn resyncs(&self) -> watch::Receiver<u64> {
        watch::channel(0).1
    }
}
