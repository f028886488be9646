//! # mememori-realtime
//!
//! Transport channel adapters for the chat core.
//!
//! - `protocol`: the `{"event", "data"}` JSON frame every event travels in
//! - `client`: `WsChannel`, a reconnecting WebSocket client implementing `EventChannel`
//! - `hub`: `MemoryHub`, an in-process relay handing out `MemoryChannel`s

pub mod client;
pub mod error;
pub mod hub;
pub mod protocol;

pub use client::{WsChannel, WsChannelConfig};
pub use error::{ChannelError, ChannelResult};
pub use hub::{MemoryChannel, MemoryHub};
pub use protocol::{Decoded, Frame, FrameError};
