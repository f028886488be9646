//! In-process relay

mod memory;

pub use memory::{MemoryChannel, MemoryHub};
