//! In-process event hub
//!
//! Relays every emitted event to every attached channel, the sender included, after
//! passing it through the same frame encoding the socket uses. The relay log behind
//! `history` is only kept with the `history` feature.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use mememori_core::traits::{EventChannel, PortResult};
use mememori_core::ChatEvent;
#[cfg(any(test, feature = "history"))]
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

use crate::error::ChannelResult;
use crate::protocol::{Decoded, Frame};

const DEFAULT_BUFFER: usize = 256;

struct HubInner {
    /// Attached channels by session ID
    channels: DashMap<String, broadcast::Sender<ChatEvent>>,
    /// Every event relayed so far, in relay order
    #[cfg(any(test, feature = "history"))]
    history: Mutex<Vec<ChatEvent>>,
    buffer: usize,
}

/// Shared relay; cloning yields another handle to the same hub
#[derive(Clone)]
pub struct MemoryHub {
    inner: Arc<HubInner>,
}

impl MemoryHub {
    #[must_use]
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    /// Create a hub whose per-channel broadcast holds `buffer` events
    #[must_use]
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: DashMap::new(),
                #[cfg(any(test, feature = "history"))]
                history: Mutex::new(Vec::new()),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Attach a new channel, as if a client connected
    pub fn attach(&self) -> MemoryChannel {
        let session_id = uuid::Uuid::new_v4().to_string();
        let (sender, _) = broadcast::channel(self.inner.buffer);
        self.inner.channels.insert(session_id.clone(), sender.clone());

        debug!(session_id = %session_id, "Channel attached");

        MemoryChannel {
            session_id,
            hub: self.inner.clone(),
            sender,
        }
    }

    /// Number of attached channels
    pub fn channel_count(&self) -> usize {
        self.inner.channels.len()
    }

    /// Every event relayed so far
    #[cfg(any(test, feature = "history"))]
    pub fn history(&self) -> Vec<ChatEvent> {
        self.inner.history.lock().clone()
    }

    /// Relay an event to every attached channel
    ///
    /// Returns how many channels it was delivered to.
    pub fn publish(&self, event: &ChatEvent) -> ChannelResult<usize> {
        self.inner.publish(event)
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHub")
            .field("channels", &self.inner.channels.len())
            .finish_non_exhaustive()
    }
}

impl HubInner {
    fn publish(&self, event: &ChatEvent) -> ChannelResult<usize> {
        let text = Frame::encode(event)?;
        let event = match Frame::decode(&text)? {
            Decoded::Event(event) => event,
            Decoded::Unknown(name) => {
                warn!(event = %name, "Event does not survive its own encoding");
                return Ok(0);
            }
        };

        #[cfg(any(test, feature = "history"))]
        self.history.lock().push(event.clone());

        let mut delivered = 0;
        for entry in &self.channels {
            if entry.value().send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        Ok(delivered)
    }
}

/// One client's view of a `MemoryHub`
pub struct MemoryChannel {
    session_id: String,
    hub: Arc<HubInner>,
    sender: broadcast::Sender<ChatEvent>,
}

impl MemoryChannel {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.hub.channels.remove(&self.session_id);
        debug!(session_id = %self.session_id, "Channel detached");
    }
}

impl std::fmt::Debug for MemoryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChannel")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventChannel for MemoryChannel {
    #[instrument(skip(self, event), fields(session_id = %self.session_id, event = %event.kind()))]
    async fn emit(&self, event: ChatEvent) -> PortResult<()> {
        let delivered = self.hub.publish(&event)?;
        debug!(delivered, "Event relayed");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }
}
