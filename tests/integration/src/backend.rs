//! In-process chat backend
//!
//! Serves the REST routes the chat client calls and a `/ws` relay that rebroadcasts
//! every text frame to all connected sockets, the sender included. Client reaction
//! events are relayed under their server names (`reaction_added`, `reaction_removed`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use mememori_core::{
    Attachment, AttachmentId, AttachmentKind, ItemId, Message, MessageId, NewMessage, Reaction, ReactionInput,
    ThreadId, UserId,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, warn};

#[derive(Default)]
struct Store {
    next_id: i64,
    threads: HashMap<String, ThreadId>,
    messages: Vec<Message>,
    attachments: Vec<Attachment>,
    reactions: Vec<Reaction>,
    hits: HashMap<&'static str, usize>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn has_message(&self, message_id: MessageId) -> bool {
        self.messages.iter().any(|m| m.message_id == message_id)
    }
}

struct Inner {
    store: Mutex<Store>,
    relay: broadcast::Sender<String>,
    frames: Mutex<Vec<String>>,
    sockets: AtomicUsize,
}

/// Shared state of the test backend
#[derive(Clone)]
pub struct BackendState {
    inner: Arc<Inner>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendState {
    pub fn new() -> Self {
        let (relay, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(Store::default()),
                relay,
                frames: Mutex::new(Vec::new()),
                sockets: AtomicUsize::new(0),
            }),
        }
    }

    fn hit(&self, route: &'static str) {
        *self.inner.store.lock().hits.entry(route).or_default() += 1;
    }

    /// How many requests a route has served
    pub fn hits(&self, route: &str) -> usize {
        self.inner.store.lock().hits.get(route).copied().unwrap_or(0)
    }

    /// Number of sockets currently joined to the relay
    pub fn sockets(&self) -> usize {
        self.inner.sockets.load(Ordering::Acquire)
    }

    /// Every frame relayed so far, as sent to clients
    pub fn frames(&self) -> Vec<String> {
        self.inner.frames.lock().clone()
    }

    /// Event names of the relayed frames
    pub fn frame_events(&self) -> Vec<String> {
        self.frames()
            .iter()
            .filter_map(|text| serde_json::from_str::<Value>(text).ok())
            .filter_map(|frame| frame.get("event").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    /// Push a raw frame to every connected socket
    pub fn broadcast_raw(&self, text: impl Into<String>) {
        let text = text.into();
        self.inner.frames.lock().push(text.clone());
        // No receivers just means nobody is connected
        let _ = self.inner.relay.send(text);
    }

    pub fn seed_thread(&self, item_id: &ItemId) -> ThreadId {
        let mut store = self.inner.store.lock();
        if let Some(thread_id) = store.threads.get(item_id.as_str()) {
            return *thread_id;
        }
        let thread_id = ThreadId::new(store.next_id());
        store.threads.insert(item_id.as_str().to_string(), thread_id);
        thread_id
    }

    pub fn seed_message(
        &self,
        thread_id: ThreadId,
        user_id: UserId,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Message {
        let mut store = self.inner.store.lock();
        let message_id = MessageId::new(store.next_id());
        let message = Message::new(message_id, thread_id, user_id, username(user_id), content, created_at);
        store.messages.push(message.clone());
        message
    }

    pub fn seed_reaction(&self, reaction: Reaction) {
        self.inner.store.lock().reactions.push(reaction);
    }

    pub fn thread_of(&self, item_id: &ItemId) -> Option<ThreadId> {
        self.inner.store.lock().threads.get(item_id.as_str()).copied()
    }

    pub fn messages_in(&self, thread_id: ThreadId) -> Vec<Message> {
        self.inner
            .store
            .lock()
            .messages
            .iter()
            .filter(|m| m.is_in_thread(thread_id))
            .cloned()
            .collect()
    }

    pub fn reactions_on(&self, message_id: MessageId) -> Vec<Reaction> {
        self.inner
            .store
            .lock()
            .reactions
            .iter()
            .filter(|r| r.message_id == Some(message_id))
            .cloned()
            .collect()
    }

    pub fn attachments_on(&self, message_id: MessageId) -> Vec<Attachment> {
        self.inner
            .store
            .lock()
            .attachments
            .iter()
            .filter(|a| a.message_id == Some(message_id))
            .cloned()
            .collect()
    }

    /// Relay one client frame, renaming reaction events to their server form
    fn relay_frame(&self, text: String) {
        let renamed = match serde_json::from_str::<Value>(&text) {
            Ok(mut frame) => {
                let server_name = match frame.get("event").and_then(Value::as_str) {
                    Some("add_reaction") => Some("reaction_added"),
                    Some("remove_reaction") => Some("reaction_removed"),
                    _ => None,
                };
                match server_name {
                    Some(name) => {
                        frame["event"] = Value::from(name);
                        frame.to_string()
                    }
                    None => text,
                }
            }
            Err(_) => text,
        };
        self.broadcast_raw(renamed);
    }
}

fn username(user_id: UserId) -> String {
    format!("user{user_id}")
}

/// Build the backend router
pub fn router(state: BackendState) -> Router {
    Router::new()
        .route("/threads", post(create_thread))
        .route("/threads/by-item/:item_id", get(find_thread))
        .route("/messages", get(list_messages).post(create_message))
        .route("/messages/:message_id", delete(delete_message))
        .route("/attachments/by-message/:message_id", get(list_attachments))
        .route("/message_attachments", post(upload_attachment))
        .route("/reactions", post(put_reaction).delete(delete_reaction))
        .route("/reactions/batch/by-message-ids", get(batch_reactions))
        .route("/ws", get(ws_relay))
        .with_state(state)
}

// ============================================================================
// REST handlers
// ============================================================================

async fn find_thread(State(state): State<BackendState>, Path(item_id): Path<String>) -> Response {
    state.hit("find_thread");
    match state.thread_of(&ItemId::new(item_id)) {
        Some(thread_id) => Json(json!({ "thread_id": thread_id })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "thread not found" }))).into_response(),
    }
}

#[derive(Deserialize)]
struct CreateThread {
    item_id: String,
}

async fn create_thread(State(state): State<BackendState>, Json(body): Json<CreateThread>) -> Response {
    state.hit("create_thread");
    let thread_id = state.seed_thread(&ItemId::new(body.item_id));
    (StatusCode::CREATED, Json(json!({ "thread_id": thread_id }))).into_response()
}

#[derive(Deserialize)]
struct ThreadQuery {
    thread_id: i64,
}

/// Listed messages leave out `thread_id`, the client fills it in
async fn list_messages(State(state): State<BackendState>, Query(query): Query<ThreadQuery>) -> Json<Vec<Value>> {
    state.hit("list_messages");
    let mut messages = state.messages_in(ThreadId::new(query.thread_id));
    messages.sort_by_key(|m| m.created_at);
    let rows = messages
        .into_iter()
        .filter_map(|m| serde_json::to_value(m).ok())
        .map(|mut row| {
            if let Some(object) = row.as_object_mut() {
                object.remove("thread_id");
            }
            row
        })
        .collect();
    Json(rows)
}

async fn create_message(State(state): State<BackendState>, Json(new): Json<NewMessage>) -> Response {
    state.hit("create_message");
    let mut store = state.inner.store.lock();
    if !store.threads.values().any(|t| *t == new.thread_id) {
        return (StatusCode::NOT_FOUND, "thread not found").into_response();
    }
    let message_id = MessageId::new(store.next_id());
    let mut message = Message::new(
        message_id,
        new.thread_id,
        new.user_id,
        username(new.user_id),
        new.content,
        Utc::now(),
    );
    message.parent_message_id = new.parent_message_id;
    store.messages.push(message.clone());
    (StatusCode::CREATED, Json(message)).into_response()
}

async fn delete_message(State(state): State<BackendState>, Path(message_id): Path<i64>) -> StatusCode {
    state.hit("delete_message");
    let message_id = MessageId::new(message_id);
    let mut store = state.inner.store.lock();
    if !store.has_message(message_id) {
        return StatusCode::NOT_FOUND;
    }
    store.messages.retain(|m| m.message_id != message_id);
    store.attachments.retain(|a| a.message_id != Some(message_id));
    store.reactions.retain(|r| r.message_id != Some(message_id));
    StatusCode::NO_CONTENT
}

async fn list_attachments(State(state): State<BackendState>, Path(message_id): Path<i64>) -> Json<Vec<Attachment>> {
    state.hit("list_attachments");
    Json(state.attachments_on(MessageId::new(message_id)))
}

async fn upload_attachment(State(state): State<BackendState>, mut multipart: Multipart) -> Response {
    state.hit("upload_attachment");
    let mut message_id = None;
    let mut file = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        };
        match field.name() {
            Some("message_id") => {
                let Ok(text) = field.text().await else {
                    return StatusCode::BAD_REQUEST.into_response();
                };
                message_id = MessageId::parse(&text).ok();
            }
            Some("file") => {
                let name = field.file_name().unwrap_or("upload.bin").to_string();
                let mime = field.content_type().unwrap_or("application/octet-stream").to_string();
                let Ok(bytes) = field.bytes().await else {
                    return StatusCode::BAD_REQUEST.into_response();
                };
                file = Some((name, mime, bytes.len()));
            }
            _ => {}
        }
    }

    let (Some(message_id), Some((name, mime, size))) = (message_id, file) else {
        return (StatusCode::BAD_REQUEST, "message_id and file are required").into_response();
    };
    let mut store = state.inner.store.lock();
    if !store.has_message(message_id) {
        return (StatusCode::NOT_FOUND, "message not found").into_response();
    }
    let attachment_id = AttachmentId::new(store.next_id());
    let mut attachment = Attachment::new(
        attachment_id,
        message_id,
        format!("https://cdn.test/{attachment_id}/{name}"),
        AttachmentKind::from_mime(&mime),
    );
    attachment.uploaded_at = Some(Utc::now());
    debug!(%message_id, %name, size, "Stored attachment");
    store.attachments.push(attachment.clone());
    (StatusCode::CREATED, Json(attachment)).into_response()
}

async fn put_reaction(State(state): State<BackendState>, Json(input): Json<ReactionInput>) -> StatusCode {
    state.hit("put_reaction");
    let mut store = state.inner.store.lock();
    if !store.has_message(input.message_id) {
        return StatusCode::NOT_FOUND;
    }
    store
        .reactions
        .retain(|r| !(r.message_id == Some(input.message_id) && r.user_id == input.user_id));
    store
        .reactions
        .push(Reaction::new(input.message_id, input.user_id, input.reaction_type));
    StatusCode::OK
}

#[derive(Deserialize)]
struct ReactionQuery {
    message_id: i64,
    user_id: i64,
}

async fn delete_reaction(State(state): State<BackendState>, Query(query): Query<ReactionQuery>) -> StatusCode {
    state.hit("delete_reaction");
    let message_id = MessageId::new(query.message_id);
    let user_id = UserId::new(query.user_id);
    state
        .inner
        .store
        .lock()
        .reactions
        .retain(|r| !(r.message_id == Some(message_id) && r.user_id == user_id));
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct BatchQuery {
    ids: String,
}

/// Ids without reactions are left out of the response
async fn batch_reactions(
    State(state): State<BackendState>,
    Query(query): Query<BatchQuery>,
) -> Json<HashMap<String, Vec<Reaction>>> {
    state.hit("batch_reactions");
    let store = state.inner.store.lock();
    let mut batch: HashMap<String, Vec<Reaction>> = HashMap::new();
    for message_id in query.ids.split(',').filter_map(|id| MessageId::parse(id).ok()) {
        for reaction in store.reactions.iter().filter(|r| r.message_id == Some(message_id)) {
            let mut row = reaction.clone();
            row.message_id = None;
            batch.entry(message_id.to_string()).or_default().push(row);
        }
    }
    Json(batch)
}

// ============================================================================
// WebSocket relay
// ============================================================================

async fn ws_relay(State(state): State<BackendState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay_socket(state, socket))
}

async fn relay_socket(state: BackendState, socket: WebSocket) {
    let mut relayed = state.inner.relay.subscribe();
    state.inner.sockets.fetch_add(1, Ordering::AcqRel);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => state.relay_frame(text),
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "Relay socket error");
                    break;
                }
            },
            outgoing = relayed.recv() => match outgoing {
                Ok(text) => {
                    if sender.send(WsMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => warn!(skipped, "Relay lagged"),
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    state.inner.sockets.fetch_sub(1, Ordering::AcqRel);
}
