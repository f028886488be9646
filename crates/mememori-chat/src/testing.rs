//! In-memory backend for unit tests

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use mememori_common::ChatSettings;
use mememori_core::traits::{ChatBackend, EventChannel, PortResult};
use mememori_core::value_objects::timestamp;
use mememori_core::{
    Attachment, AttachmentId, AttachmentKind, DomainError, ItemId, Message, MessageId,
    NewMessage, PendingFile, Reaction, ReactionInput, ReactionType, ThreadId, UserId,
};
use mememori_realtime::MemoryHub;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::context::ChatContext;

pub(crate) const ME: UserId = UserId::new(1);
pub(crate) const PEER: UserId = UserId::new(2);

/// Backend operations, for call counting, failure injection and gating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    FindThread,
    CreateThread,
    ListMessages,
    CreateMessage,
    DeleteMessage,
    ListAttachments,
    UploadAttachment,
    PutReaction,
    DeleteReaction,
    BatchReactions,
}

/// Holds one call in flight until released
#[derive(Default)]
pub(crate) struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    /// Wait until the gated call has started
    pub(crate) async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the gated call continue
    pub(crate) fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
struct FakeState {
    threads: HashMap<ItemId, ThreadId>,
    messages: Vec<Message>,
    attachments: HashMap<MessageId, Vec<Attachment>>,
    reactions: Vec<Reaction>,
    next_id: i64,
    failing: HashSet<Op>,
    failing_attachments: HashSet<MessageId>,
    calls: HashMap<Op, usize>,
    gates: HashMap<Op, Arc<Gate>>,
    reaction_batches: Vec<Vec<MessageId>>,
    strip_thread_ids: bool,
}

impl FakeState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: 100,
                ..FakeState::default()
            }),
        }
    }

    pub(crate) fn with_thread(&self, item_id: &str, thread_id: i64) -> ThreadId {
        let thread_id = ThreadId::new(thread_id);
        self.state.lock().threads.insert(ItemId::new(item_id), thread_id);
        thread_id
    }

    pub(crate) fn seed_message(
        &self,
        id: i64,
        thread_id: ThreadId,
        user_id: UserId,
        content: &str,
        created_at: &str,
    ) -> Message {
        let created_at = timestamp::parse(created_at).expect("valid timestamp");
        let message = Message::new(
            MessageId::new(id),
            thread_id,
            user_id,
            format!("user{user_id}"),
            content,
            created_at,
        );
        self.state.lock().messages.push(message.clone());
        message
    }

    pub(crate) fn seed_reply(&self, id: i64, thread_id: ThreadId, parent: MessageId, created_at: &str) -> Message {
        let message = self
            .seed_message(id, thread_id, PEER, "reply", created_at)
            .replying_to(parent);
        let mut state = self.state.lock();
        if let Some(stored) = state.messages.iter_mut().find(|m| m.message_id == message.message_id) {
            stored.parent_message_id = Some(parent);
        }
        message
    }

    pub(crate) fn seed_attachment(&self, message_id: MessageId, kind: AttachmentKind, url: &str) -> Attachment {
        let mut state = self.state.lock();
        let id = AttachmentId::new(state.next_id());
        let attachment = Attachment::new(id, message_id, url, kind);
        state.attachments.entry(message_id).or_default().push(attachment.clone());
        attachment
    }

    pub(crate) fn seed_reaction(&self, message_id: MessageId, user_id: UserId, kind: ReactionType) {
        self.state
            .lock()
            .reactions
            .push(Reaction::new(message_id, user_id, kind));
    }

    pub(crate) fn fail(&self, op: Op) {
        self.state.lock().failing.insert(op);
    }

    pub(crate) fn recover(&self, op: Op) {
        self.state.lock().failing.remove(&op);
    }

    pub(crate) fn fail_attachments_for(&self, message_id: MessageId) {
        self.state.lock().failing_attachments.insert(message_id);
    }

    /// Omit `thread_id` from created and listed messages
    pub(crate) fn strip_thread_ids(&self) {
        self.state.lock().strip_thread_ids = true;
    }

    /// Hold the next call of `op` until the returned gate is released
    pub(crate) fn hold(&self, op: Op) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.state.lock().gates.insert(op, gate.clone());
        gate
    }

    pub(crate) fn calls(&self, op: Op) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub(crate) fn stored_messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    pub(crate) fn stored_reactions(&self, message_id: MessageId) -> Vec<Reaction> {
        self.state
            .lock()
            .reactions
            .iter()
            .filter(|r| r.message_id == Some(message_id))
            .cloned()
            .collect()
    }

    pub(crate) fn reaction_batches(&self) -> Vec<Vec<MessageId>> {
        self.state.lock().reaction_batches.clone()
    }

    /// Count the call, then fail, hold, or pass
    async fn enter(&self, op: Op) -> PortResult<()> {
        let gate = {
            let mut state = self.state.lock();
            *state.calls.entry(op).or_default() += 1;
            if state.failing.contains(&op) {
                return Err(DomainError::backend(503, "injected failure"));
            }
            state.gates.remove(&op)
        };

        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Ok(())
    }

    fn created_at(id: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(id)
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn find_thread_by_item(&self, item_id: &ItemId) -> PortResult<Option<ThreadId>> {
        self.enter(Op::FindThread).await?;
        Ok(self.state.lock().threads.get(item_id).copied())
    }

    async fn create_thread(&self, item_id: &ItemId) -> PortResult<ThreadId> {
        self.enter(Op::CreateThread).await?;
        let mut state = self.state.lock();
        let id = ThreadId::new(state.next_id());
        Ok(*state.threads.entry(item_id.clone()).or_insert(id))
    }

    async fn list_messages(&self, thread_id: ThreadId) -> PortResult<Vec<Message>> {
        self.enter(Op::ListMessages).await?;
        let state = self.state.lock();
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.is_in_thread(thread_id))
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        if state.strip_thread_ids {
            for message in &mut messages {
                message.thread_id = None;
            }
        }
        Ok(messages)
    }

    async fn create_message(&self, new: &NewMessage) -> PortResult<Message> {
        self.enter(Op::CreateMessage).await?;
        let mut state = self.state.lock();
        let id = state.next_id();
        let mut message = Message::new(
            MessageId::new(id),
            new.thread_id,
            new.user_id,
            format!("user{}", new.user_id),
            new.content.clone(),
            Self::created_at(id),
        );
        message.parent_message_id = new.parent_message_id;
        state.messages.push(message.clone());
        if state.strip_thread_ids {
            message.thread_id = None;
        }
        Ok(message)
    }

    async fn delete_message(&self, message_id: MessageId) -> PortResult<()> {
        self.enter(Op::DeleteMessage).await?;
        let mut state = self.state.lock();
        let before = state.messages.len();
        state.messages.retain(|m| m.message_id != message_id);
        if state.messages.len() == before {
            return Err(DomainError::backend(404, "message not found"));
        }
        state.attachments.remove(&message_id);
        state.reactions.retain(|r| r.message_id != Some(message_id));
        Ok(())
    }

    async fn list_attachments(&self, message_id: MessageId) -> PortResult<Vec<Attachment>> {
        self.enter(Op::ListAttachments).await?;
        let state = self.state.lock();
        if state.failing_attachments.contains(&message_id) {
            return Err(DomainError::Network("connection reset".to_string()));
        }
        Ok(state.attachments.get(&message_id).cloned().unwrap_or_default())
    }

    async fn upload_attachment(&self, message_id: MessageId, file: &PendingFile) -> PortResult<Attachment> {
        self.enter(Op::UploadAttachment).await?;
        let mut state = self.state.lock();
        let id = AttachmentId::new(state.next_id());
        let attachment = Attachment::new(
            id,
            message_id,
            format!("https://cdn.test/{}", file.file_name),
            file.kind(),
        );
        state.attachments.entry(message_id).or_default().push(attachment.clone());
        Ok(attachment)
    }

    async fn put_reaction(&self, input: &ReactionInput) -> PortResult<()> {
        self.enter(Op::PutReaction).await?;
        let mut state = self.state.lock();
        state
            .reactions
            .retain(|r| !(r.message_id == Some(input.message_id) && r.user_id == input.user_id));
        state
            .reactions
            .push(Reaction::new(input.message_id, input.user_id, input.reaction_type));
        Ok(())
    }

    async fn delete_reaction(&self, message_id: MessageId, user_id: UserId) -> PortResult<()> {
        self.enter(Op::DeleteReaction).await?;
        self.state
            .lock()
            .reactions
            .retain(|r| !(r.message_id == Some(message_id) && r.user_id == user_id));
        Ok(())
    }

    async fn reactions_for_messages(
        &self,
        message_ids: &[MessageId],
    ) -> PortResult<HashMap<MessageId, Vec<Reaction>>> {
        self.enter(Op::BatchReactions).await?;
        let mut state = self.state.lock();
        state.reaction_batches.push(message_ids.to_vec());
        let mut map: HashMap<MessageId, Vec<Reaction>> = HashMap::new();
        for id in message_ids {
            let list = state
                .reactions
                .iter()
                .filter(|r| r.message_id == Some(*id))
                .cloned()
                .collect();
            map.insert(*id, list);
        }
        Ok(map)
    }
}

/// Context for `ME` on a fresh hub
pub(crate) fn context(backend: Arc<FakeBackend>) -> ChatContext {
    context_on(backend, &MemoryHub::new(), ME)
}

/// Context for `user_id` attached to `hub`
pub(crate) fn context_on(backend: Arc<FakeBackend>, hub: &MemoryHub, user_id: UserId) -> ChatContext {
    let channel: Arc<dyn EventChannel> = Arc::new(hub.attach());
    ChatContext::new(backend, channel, user_id, ChatSettings::default())
}
