//! Thread entity - the discussion scope bound to one catalog item

use serde::{Deserialize, Serialize};

use crate::value_objects::{ItemId, ThreadId};

/// Thread entity
///
/// At most one thread exists per item. Threads are created lazily and never deleted
/// by the chat core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: ThreadId,
    pub item_id: ItemId,
}

impl Thread {
    pub fn new(thread_id: ThreadId, item_id: ItemId) -> Self {
        Self { thread_id, item_id }
    }
}
