//! Realtime wire protocol

mod frame;

pub use frame::{Decoded, Frame, FrameError};
