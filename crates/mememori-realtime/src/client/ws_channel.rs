//! Reconnecting WebSocket channel
//!
//! One `WsChannel` is created by the application shell and shared by every chat view.
//! A background task owns the socket: it drains the outbound queue into the socket,
//! fans received events out through a broadcast channel, and reconnects after a fixed
//! delay whenever the connection drops. Every reconnection bumps the resync counter so
//! views can refetch what they missed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use mememori_common::RealtimeConfig;
use mememori_core::traits::{EventChannel, PortResult};
use mememori_core::ChatEvent;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::{ChannelError, ChannelResult};
use crate::protocol::{Decoded, Frame};

/// WebSocket channel configuration
#[derive(Debug, Clone)]
pub struct WsChannelConfig {
    /// WebSocket endpoint
    pub url: String,
    /// Delay before reconnecting after a disconnect
    pub reconnect_delay_ms: u64,
    /// Capacity of both the outbound queue and the inbound broadcast
    pub buffer: usize,
}

impl Default for WsChannelConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000/ws".to_string(),
            reconnect_delay_ms: 1000,
            buffer: 256,
        }
    }
}

impl From<&RealtimeConfig> for WsChannelConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            url: config.url.clone(),
            reconnect_delay_ms: config.reconnect_delay_ms,
            buffer: config.buffer,
        }
    }
}

/// How long a shutdown waits for the close handshake
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// `EventChannel` over a WebSocket connection
pub struct WsChannel {
    session_id: String,
    inbound_tx: broadcast::Sender<ChatEvent>,
    outbound_tx: mpsc::Sender<String>,
    shutdown_tx: watch::Sender<bool>,
    resyncs: watch::Receiver<u64>,
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl WsChannel {
    /// Start the background connection task
    ///
    /// Returns immediately; the first connection attempt happens in the background and
    /// events emitted before it succeeds are queued.
    pub fn connect(config: WsChannelConfig) -> Self {
        let buffer = config.buffer.max(1);
        let (inbound_tx, _) = broadcast::channel(buffer);
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (resync_tx, resyncs) = watch::channel(0);
        let connected = Arc::new(AtomicBool::new(false));
        let session_id = uuid::Uuid::new_v4().to_string();

        let task = tokio::spawn(Self::connection_loop(
            config,
            session_id.clone(),
            Pipes {
                inbound_tx: inbound_tx.clone(),
                outbound_rx,
                shutdown_rx,
                resync_tx,
            },
            connected.clone(),
        ));

        Self {
            session_id,
            inbound_tx,
            outbound_tx,
            shutdown_tx,
            resyncs,
            connected,
            task,
        }
    }

    /// Local id of this channel, used to correlate log lines
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether the socket is currently open
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Close the socket and stop reconnecting
    ///
    /// Does not wait on the outbound queue, so it returns promptly while the server
    /// is unreachable. Resolves once the connection task has stopped.
    pub async fn shutdown(&self) -> ChannelResult<()> {
        self.shutdown_tx.send_replace(true);
        // The task owns the only receiver
        self.shutdown_tx.closed().await;
        Ok(())
    }

    /// Queue one event for delivery
    fn enqueue(&self, event: &ChatEvent) -> ChannelResult<()> {
        let text = Frame::encode(event)?;
        self.outbound_tx.try_send(text).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ChannelError::BufferFull,
            mpsc::error::TrySendError::Closed(_) => ChannelError::Closed,
        })
    }

    /// Background connection loop
    async fn connection_loop(
        config: WsChannelConfig,
        session_id: String,
        mut pipes: Pipes,
        connected: Arc<AtomicBool>,
    ) {
        let delay = Duration::from_millis(config.reconnect_delay_ms);
        let mut opened = 0u64;
        loop {
            let result = Self::run_connection(&config, &mut pipes, &connected, &mut opened).await;
            connected.store(false, Ordering::Release);

            match result {
                Ok(true) => break,
                Ok(false) => {
                    warn!(session_id = %session_id, "Realtime connection closed, reconnecting...");
                }
                Err(e) => {
                    error!(session_id = %session_id, error = %e, "Realtime connection error, reconnecting...");
                }
            }

            tokio::select! {
                biased;
                () = shutdown_requested(&mut pipes.shutdown_rx) => break,
                () = tokio::time::sleep(delay) => {}
            }
        }
        info!(session_id = %session_id, "Realtime channel shut down");
    }

    /// Run one connection until it drops (`Ok(false)`) or shutdown is requested (`Ok(true)`)
    async fn run_connection(
        config: &WsChannelConfig,
        pipes: &mut Pipes,
        connected: &AtomicBool,
        opened: &mut u64,
    ) -> ChannelResult<bool> {
        let ws_stream = tokio::select! {
            biased;
            () = shutdown_requested(&mut pipes.shutdown_rx) => return Ok(true),
            result = connect_async(config.url.as_str()) => result?.0,
        };
        let (mut writer, mut reader) = ws_stream.split();

        connected.store(true, Ordering::Release);
        *opened += 1;
        if *opened > 1 {
            pipes.resync_tx.send_replace(*opened - 1);
            info!(url = %config.url, reconnects = *opened - 1, "Realtime channel reconnected");
        } else {
            info!(url = %config.url, "Realtime channel connected");
        }

        loop {
            tokio::select! {
                biased;
                () = shutdown_requested(&mut pipes.shutdown_rx) => {
                    let _ = tokio::time::timeout(CLOSE_GRACE, writer.close()).await;
                    return Ok(true);
                }

                frame = reader.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => Self::dispatch(&text, &pipes.inbound_tx),
                        Some(Ok(Message::Close(_))) | None => return Ok(false),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                    }
                }

                text = pipes.outbound_rx.recv() => {
                    match text {
                        Some(text) => writer.send(Message::Text(text)).await?,
                        None => {
                            let _ = tokio::time::timeout(CLOSE_GRACE, writer.close()).await;
                            return Ok(true);
                        }
                    }
                }
            }
        }
    }

    /// Decode one received frame and fan it out
    fn dispatch(text: &str, inbound_tx: &broadcast::Sender<ChatEvent>) {
        match Frame::decode(text) {
            Ok(Decoded::Event(event)) => {
                trace!(event = %event.kind(), message_id = %event.message_id(), "Received event");
                // No receivers is not an error: no chat view is open
                let _ = inbound_tx.send(event);
            }
            Ok(Decoded::Unknown(name)) => {
                debug!(event = %name, "Ignoring unknown realtime event");
            }
            Err(e) => {
                warn!(error = %e, "Dropping malformed realtime frame");
            }
        }
    }
}

/// Channel ends owned by the connection task
struct Pipes {
    inbound_tx: broadcast::Sender<ChatEvent>,
    outbound_rx: mpsc::Receiver<String>,
    shutdown_rx: watch::Receiver<bool>,
    resync_tx: watch::Sender<u64>,
}

/// Resolves once shutdown was requested or the channel handle is gone
async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for WsChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsChannel")
            .field("session_id", &self.session_id)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventChannel for WsChannel {
    #[instrument(skip(self, event), fields(session_id = %self.session_id, event = %event.kind(), message_id = %event.message_id()))]
    async fn emit(&self, event: ChatEvent) -> PortResult<()> {
        self.enqueue(&event)?;
        trace!("Event queued");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.inbound_tx.subscribe()
    }

    fn resyncs(&self) -> watch::Receiver<u64> {
        self.resyncs.clone()
    }
}
