//! Chat view - one item's chat, wired to the backend and the shared channel
//!
//! The view owns the message store, attachment map, reaction book, composer and
//! context menu of the open item. Every async result is checked against the mount
//! generation before it is applied, so a slow response for a previous item never
//! lands in the current one. Locks are never held across an await.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mememori_core::{
    Attachment, ChatEvent, ItemId, Message, MessageId, PendingFile, Reaction, ReactionType, ThreadId,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::attachments::{AttachmentMap, AttachmentResolver};
use crate::composer::{Composer, SendOutcome, SendSequence, SendingFlag};
use crate::context::ChatContext;
use crate::error::{ChatError, ChatResult};
use crate::messages::MessageStore;
use crate::reactions::{ReactOutcome, ReactionAggregator, ReactionBook};
use crate::selection::{ContextMenu, DeleteOutcome, DeleteRequest, DismissReason, LongPress, Point};
use crate::thread::ThreadResolver;
use crate::timeline::{TimelineBuilder, TimelineEntry};

/// Result of a message fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { count: usize },
    /// A newer fetch or an item switch overtook this one
    Stale,
    /// The item has no thread yet
    NoThread,
}

/// What a realtime event did to the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Applied,
    /// The event triggered a reaction refetch
    Refetched,
    Ignored,
}

struct ViewState {
    item_id: ItemId,
    thread_id: Option<ThreadId>,
    messages: MessageStore,
    attachments: AttachmentMap,
    reactions: ReactionBook,
    menu: ContextMenu,
    long_press: LongPress,
    /// Messages this view created, with the last fetch ticket issued before each;
    /// their realtime echo is skipped
    own_sent: HashMap<MessageId, u64>,
    applied_ticket: u64,
    hovered: Option<MessageId>,
}

impl ViewState {
    fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            thread_id: None,
            messages: MessageStore::new(),
            attachments: AttachmentMap::new(),
            reactions: ReactionBook::new(),
            menu: ContextMenu::default(),
            long_press: LongPress::new(),
            own_sent: HashMap::new(),
            applied_ticket: 0,
            hovered: None,
        }
    }

    fn forget_message(&mut self, message_id: MessageId) -> bool {
        let removed = self.messages.apply_deletion(message_id).is_some();
        self.attachments.remove(message_id);
        self.reactions.remove(message_id);
        if self.menu.target().is_some_and(|m| m.message_id == message_id) {
            self.menu = ContextMenu::Idle;
        }
        removed
    }
}

struct ViewInner {
    ctx: ChatContext,
    state: RwLock<ViewState>,
    composer: Mutex<Composer>,
    sending: SendingFlag,
    generation: AtomicU64,
    fetch_tickets: AtomicU64,
    mounted: watch::Sender<bool>,
}

/// The chat of one item
#[derive(Clone)]
pub struct ChatView {
    inner: Arc<ViewInner>,
}

impl ChatView {
    /// Mount a view on `item_id`; nothing is fetched until `fetch_messages`
    pub fn open(ctx: ChatContext, item_id: ItemId) -> Self {
        let (mounted, _) = watch::channel(true);
        Self {
            inner: Arc::new(ViewInner {
                ctx,
                state: RwLock::new(ViewState::new(item_id)),
                composer: Mutex::new(Composer::new()),
                sending: SendingFlag::new(),
                generation: AtomicU64::new(0),
                fetch_tickets: AtomicU64::new(0),
                mounted,
            }),
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.inner.state.read().item_id.clone()
    }

    /// Thread of the last applied fetch
    pub fn thread_id(&self) -> Option<ThreadId> {
        self.inner.state.read().thread_id
    }

    pub fn is_mounted(&self) -> bool {
        *self.inner.mounted.borrow()
    }

    /// Show another item; results still in flight for the old one are dropped
    #[instrument(skip(self))]
    pub fn switch_item(&self, item_id: ItemId) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        *self.inner.state.write() = ViewState::new(item_id);
        self.inner.composer.lock().clear();
        info!("Chat view switched");
    }

    /// Unmount; the listener stops and later results are dropped
    pub fn close(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.state.write().long_press.cancel();
        self.inner.mounted.send_replace(false);
        info!(item_id = %self.item_id(), "Chat view closed");
    }

    fn generation(&self) -> ChatResult<u64> {
        if self.is_mounted() {
            Ok(self.inner.generation.load(Ordering::SeqCst))
        } else {
            Err(ChatError::NotMounted)
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.is_mounted() && self.inner.generation.load(Ordering::SeqCst) == generation
    }

    /// Replace the message list with the server's, then load attachments and reactions
    #[instrument(skip(self), fields(item_id = %self.item_id()))]
    pub async fn fetch_messages(&self) -> ChatResult<FetchOutcome> {
        let generation = self.generation()?;
        let ticket = self.inner.fetch_tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let ctx = &self.inner.ctx;
        let item_id = self.item_id();

        let thread_id = match ThreadResolver::new(ctx).resolve(&item_id).await {
            Ok(thread_id) => thread_id,
            Err(e) if e.is_not_found() => return Ok(FetchOutcome::NoThread),
            Err(e) => {
                error!(error = %e, code = e.error_code(), "Thread lookup failed");
                return Err(e);
            }
        };

        let mut messages = ctx.backend().list_messages(thread_id).await.map_err(|e| {
            error!(error = %e, code = e.code(), thread_id = %thread_id, "Message fetch failed");
            ChatError::from(e)
        })?;
        for message in &mut messages {
            message.thread_id.get_or_insert(thread_id);
        }

        let (ids, versions, since) = {
            let mut guard = self.inner.state.write();
            let state = &mut *guard;
            if !self.is_current(generation) || ticket <= state.applied_ticket {
                debug!(ticket, "Discarding stale message fetch");
                return Ok(FetchOutcome::Stale);
            }
            state.applied_ticket = ticket;
            state.thread_id = Some(thread_id);
            state.messages.replace(messages);
            let messages = &state.messages;
            state
                .own_sent
                .retain(|message_id, issued| *issued >= ticket || messages.contains(*message_id));
            let ids = state.messages.ids();
            state.reactions.retain_messages(&ids);
            let versions = state.reactions.snapshot_versions(&ids);
            (ids, versions, state.attachments.revision())
        };

        let attachment_resolver = AttachmentResolver::new(ctx);
        let reaction_aggregator = ReactionAggregator::new(ctx);
        let (attachments, reactions) = tokio::join!(
            attachment_resolver.fetch_all_for(&ids),
            reaction_aggregator.fetch_all_for(&ids),
        );

        let mut state = self.inner.state.write();
        if self.is_current(generation) && state.applied_ticket == ticket {
            state.attachments.merge_fetched(attachments, since);
            match reactions {
                Ok(map) => {
                    state.reactions.apply_fetched(map, &versions);
                }
                Err(e) => warn!(error = %e, "Reaction fetch failed"),
            }
        }

        debug!(thread_id = %thread_id, count = ids.len(), "Messages applied");
        Ok(FetchOutcome::Applied { count: ids.len() })
    }

    /// Send the composer's draft
    ///
    /// On failure the draft is kept for a retry.
    #[instrument(skip(self), fields(item_id = %self.item_id()))]
    pub async fn send(&self) -> ChatResult<SendOutcome> {
        let generation = self.generation()?;
        let Some(_guard) = self.inner.sending.try_acquire() else {
            debug!("Send already in flight");
            return Ok(SendOutcome::Busy);
        };
        let draft = self.inner.composer.lock().draft();
        if draft.is_empty() {
            return Ok(SendOutcome::Empty);
        }

        let outcome = self
            .run_send(&draft.content, draft.parent_message_id, draft.file.as_ref())
            .await?;
        if let SendOutcome::Sent(_) = outcome {
            if self.is_current(generation) {
                self.inner.composer.lock().clear();
            }
            self.reconcile("send").await;
        }
        Ok(outcome)
    }

    /// Send a recorded voice clip as its own message
    ///
    /// The text draft and reply target are left as they are.
    #[instrument(skip(self, clip), fields(item_id = %self.item_id(), size = clip.len()))]
    pub async fn send_voice(&self, clip: Vec<u8>) -> ChatResult<SendOutcome> {
        self.generation()?;
        let Some(_guard) = self.inner.sending.try_acquire() else {
            debug!("Send already in flight");
            return Ok(SendOutcome::Busy);
        };
        if clip.is_empty() {
            return Ok(SendOutcome::Empty);
        }

        let file = PendingFile::voice_clip(clip);
        let outcome = self.run_send("", None, Some(&file)).await?;
        if let SendOutcome::Sent(_) = outcome {
            self.reconcile("voice").await;
        }
        Ok(outcome)
    }

    async fn run_send(
        &self,
        content: &str,
        parent_message_id: Option<MessageId>,
        file: Option<&PendingFile>,
    ) -> ChatResult<SendOutcome> {
        let sequence = SendSequence::new(&self.inner.ctx);
        let item_id = self.item_id();

        let created = sequence
            .create(&item_id, content, parent_message_id)
            .await
            .map_err(|e| {
                error!(error = %e, code = e.error_code(), "Message create failed");
                e
            })?;
        let Some((thread_id, message)) = created else {
            warn!("Send aborted, item has no thread");
            return Ok(SendOutcome::NoThread);
        };

        let message_id = message.message_id;
        let issued = self.inner.fetch_tickets.load(Ordering::SeqCst);
        self.inner.state.write().own_sent.insert(message_id, issued);

        let attachment = match file {
            Some(file) => Some(sequence.attach(message_id, file).await.map_err(|e| {
                error!(error = %e, code = e.error_code(), message_id = %message_id, "Upload failed");
                e
            })?),
            None => None,
        };

        sequence.announce(thread_id, message, attachment).await;
        info!(message_id = %message_id, "Message sent");
        Ok(SendOutcome::Sent(message_id))
    }

    /// Full refetch; a failure is logged and left for the next fetch
    async fn reconcile(&self, cause: &'static str) {
        match self.fetch_messages().await {
            Ok(outcome) => debug!(cause, ?outcome, "Reconciled"),
            Err(e) => warn!(cause, error = %e, "Refetch failed"),
        }
    }

    /// Choose an emoji on a message, toggling it off when chosen twice
    #[instrument(skip(self), fields(user_id = %self.inner.ctx.user_id()))]
    pub async fn react(&self, message_id: MessageId, kind: ReactionType) -> ChatResult<ReactOutcome> {
        self.generation()?;
        let ctx = &self.inner.ctx;

        let edit = {
            let mut state = self.inner.state.write();
            if !state.messages.contains(message_id) {
                return Ok(ReactOutcome::UnknownMessage);
            }
            state.reactions.apply_local(message_id, ctx.user_id(), kind)
        };

        let result = ReactionAggregator::new(ctx).commit(message_id, edit.change).await;

        let mut state = self.inner.state.write();
        state.reactions.settle(message_id);
        match result {
            Ok(()) => Ok(ReactOutcome::Applied(edit.change)),
            Err(e) => {
                state.reactions.rollback(message_id, &edit);
                error!(error = %e, code = e.error_code(), "Reaction failed");
                Err(e)
            }
        }
    }

    async fn refetch_reactions(&self, message_id: MessageId) -> ChatResult<()> {
        let generation = self.generation()?;
        let ids = [message_id];
        let versions = self.inner.state.read().reactions.snapshot_versions(&ids);

        let fetched = ReactionAggregator::new(&self.inner.ctx).fetch_all_for(&ids).await?;

        let mut state = self.inner.state.write();
        if self.is_current(generation) && state.messages.contains(message_id) {
            state.reactions.apply_fetched(fetched, &versions);
        }
        Ok(())
    }

    /// Right-click on a message
    pub fn open_menu(&self, message_id: MessageId, point: Point) -> bool {
        let mut state = self.inner.state.write();
        let Some(target) = state.messages.find(message_id).cloned() else {
            return false;
        };
        state.menu.open(point, target);
        true
    }

    /// Start the long-press timer; the task resolves to whether the menu opened
    pub fn touch_start(&self, message_id: MessageId, point: Point) -> JoinHandle<bool> {
        let token = self.inner.state.write().long_press.start(message_id, point);
        let delay = self.inner.ctx.settings().long_press();
        let view = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let fired = view.inner.state.write().long_press.fire(token);
            match fired {
                Some((message_id, point)) if view.is_mounted() => view.open_menu(message_id, point),
                _ => false,
            }
        })
    }

    pub fn touch_move(&self) {
        self.inner.state.write().long_press.cancel();
    }

    pub fn touch_end(&self) {
        self.inner.state.write().long_press.cancel();
    }

    pub fn dismiss_menu(&self, reason: DismissReason) -> bool {
        self.inner.state.write().menu.dismiss(reason)
    }

    pub fn menu(&self) -> ContextMenu {
        self.inner.state.read().menu.clone()
    }

    /// "Reply" in the menu: the target becomes the composer's reply target
    pub fn choose_reply(&self) -> Option<MessageId> {
        let target = self.inner.state.write().menu.take_target()?;
        let message_id = target.message_id;
        self.inner.composer.lock().reply_to(target);
        Some(message_id)
    }

    /// "Delete" in the menu: returns the request the user must confirm
    pub fn choose_delete(&self) -> Option<DeleteRequest> {
        self.inner
            .state
            .write()
            .menu
            .take_target()
            .map(|target| DeleteRequest {
                message_id: target.message_id,
            })
    }

    /// Answer a delete confirmation
    ///
    /// Local state changes only after the server accepted the delete.
    #[instrument(skip(self), fields(message_id = %request.message_id))]
    pub async fn confirm_delete(&self, request: DeleteRequest, confirmed: bool) -> ChatResult<DeleteOutcome> {
        if !confirmed {
            return Ok(DeleteOutcome::Cancelled);
        }
        let generation = self.generation()?;
        let message_id = request.message_id;
        if !self.inner.state.read().messages.contains(message_id) {
            return Ok(DeleteOutcome::UnknownMessage);
        }

        let ctx = &self.inner.ctx;
        ctx.backend().delete_message(message_id).await.map_err(|e| {
            error!(error = %e, code = e.code(), "Delete failed");
            ChatError::from(e)
        })?;

        if self.is_current(generation) {
            self.inner.state.write().forget_message(message_id);
            let mut composer = self.inner.composer.lock();
            if composer.reply_target().is_some_and(|m| m.message_id == message_id) {
                composer.cancel_reply();
            }
        }

        if let Err(e) = ctx.channel().emit(ChatEvent::delete_message(message_id)).await {
            warn!(error = %e, "Failed to announce delete");
        }
        info!("Message deleted");
        Ok(DeleteOutcome::Deleted)
    }

    pub fn set_hovered(&self, message_id: Option<MessageId>) {
        self.inner.state.write().hovered = message_id;
    }

    /// Render model of the open thread
    pub fn timeline(&self) -> Vec<TimelineEntry> {
        let state = self.inner.state.read();
        TimelineBuilder::new(
            &state.messages,
            &state.attachments,
            &state.reactions,
            self.inner.ctx.settings().local_offset(),
            self.inner.ctx.user_id(),
        )
        .hovered(state.hovered)
        .build()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.read().messages.as_slice().to_vec()
    }

    pub fn attachments_for(&self, message_id: MessageId) -> Vec<Attachment> {
        self.inner.state.read().attachments.get(message_id).to_vec()
    }

    pub fn reactions_for(&self, message_id: MessageId) -> Vec<Reaction> {
        self.inner.state.read().reactions.reactions(message_id).to_vec()
    }

    /// Run `f` against the composer
    pub fn with_composer<R>(&self, f: impl FnOnce(&mut Composer) -> R) -> R {
        f(&mut self.inner.composer.lock())
    }

    pub fn is_sending(&self) -> bool {
        self.inner.sending.is_sending()
    }

    /// Apply one realtime event
    ///
    /// Events for other threads, unknown messages or the current user's own
    /// reactions are ignored.
    #[instrument(skip_all, fields(event = event.kind().as_str(), message_id = %event.message_id()))]
    pub async fn handle_event(&self, event: ChatEvent) -> EventDisposition {
        if !self.is_mounted() {
            return EventDisposition::Ignored;
        }

        match event {
            ChatEvent::SendMessage(message) => {
                let mut state = self.inner.state.write();
                let same_thread = state.thread_id.is_some() && state.thread_id == message.thread_id;
                if !same_thread
                    || state.own_sent.contains_key(&message.message_id)
                    || state.messages.contains(message.message_id)
                {
                    return EventDisposition::Ignored;
                }
                state.messages.apply_incoming(message);
                EventDisposition::Applied
            }
            ChatEvent::DeleteMessage(target) => {
                if self.inner.state.write().forget_message(target.message_id) {
                    EventDisposition::Applied
                } else {
                    EventDisposition::Ignored
                }
            }
            ChatEvent::NewAttachment(update) => {
                // May arrive before its message; recorded either way
                self.inner
                    .state
                    .write()
                    .attachments
                    .apply_new_attachment(update.message_id, update.attachments);
                EventDisposition::Applied
            }
            ChatEvent::AddReaction(signal)
            | ChatEvent::RemoveReaction(signal)
            | ChatEvent::ReactionAdded(signal)
            | ChatEvent::ReactionRemoved(signal) => {
                let known = self.inner.state.read().messages.contains(signal.message_id);
                if !known || signal.user_id == self.inner.ctx.user_id() {
                    return EventDisposition::Ignored;
                }
                match self.refetch_reactions(signal.message_id).await {
                    Ok(()) => EventDisposition::Refetched,
                    Err(e) => {
                        warn!(error = %e, "Reaction refetch failed");
                        EventDisposition::Ignored
                    }
                }
            }
        }
    }

    /// Feed channel events into this view until it is closed
    ///
    /// Subscribes before returning, so no event emitted afterwards is missed. When
    /// events were dropped, by lag or by a reconnect, the view refetches instead.
    pub fn spawn_listener(&self) -> JoinHandle<()> {
        let mut events = self.inner.ctx.channel().subscribe();
        let mut resyncs = self.inner.ctx.channel().resyncs();
        let mut resyncs_open = true;
        let mut mounted = self.inner.mounted.subscribe();
        let view = self.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = mounted.changed() => {
                        let still_mounted = changed.is_ok() && *mounted.borrow_and_update();
                        if !still_mounted {
                            break;
                        }
                    }
                    received = events.recv() => match received {
                        Ok(event) => {
                            let disposition = view.handle_event(event).await;
                            debug!(?disposition, "Realtime event handled");
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Realtime listener lagged, events dropped");
                            view.reconcile("lagged").await;
                        }
                        Err(RecvError::Closed) => {
                            info!("Realtime channel closed");
                            break;
                        }
                    },
                    changed = resyncs.changed(), if resyncs_open => {
                        if changed.is_ok() {
                            view.reconcile("reconnected").await;
                        } else {
                            resyncs_open = false;
                        }
                    }
                }
            }
            debug!("Realtime listener stopped");
        })
    }
}

impl std::fmt::Debug for ChatView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("ChatView")
            .field("item_id", &state.item_id)
            .field("thread_id", &state.thread_id)
            .field("messages", &state.messages.len())
            .field("mounted", &*self.inner.mounted.borrow())
            .finish_non_exhaustive()
    }
}
