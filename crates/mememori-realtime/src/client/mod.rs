//! WebSocket client side of the transport channel

mod ws_channel;

pub use ws_channel::{WsChannel, WsChannelConfig};
