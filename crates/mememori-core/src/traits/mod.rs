//! Ports - the interfaces the chat core needs from the outside world

mod ports;

pub use ports::{ChatBackend, EventChannel, PortResult};
