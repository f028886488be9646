//! Thread resolution
//!
//! Maps an item to its discussion thread. Nothing is cached: every fetch and send
//! resolves again, which keeps a freshly created thread visible to all paths.

use mememori_core::{DomainError, ItemId, ThreadId};
use tracing::{info, instrument, warn};

use crate::context::ChatContext;
use crate::error::ChatResult;

/// Thread resolver
pub struct ThreadResolver<'a> {
    ctx: &'a ChatContext,
}

impl<'a> ThreadResolver<'a> {
    /// Create a new ThreadResolver
    pub fn new(ctx: &'a ChatContext) -> Self {
        Self { ctx }
    }

    /// Resolve the thread of an item
    ///
    /// # Errors
    /// Returns `DomainError::ThreadNotFound` when the item has no thread yet
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn resolve(&self, item_id: &ItemId) -> ChatResult<ThreadId> {
        match self.ctx.backend().find_thread_by_item(item_id).await? {
            Some(thread_id) => Ok(thread_id),
            None => {
                warn!("No thread for item");
                Err(DomainError::ThreadNotFound(item_id.clone()).into())
            }
        }
    }

    /// Resolve the thread of an item, creating it when absent
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn ensure(&self, item_id: &ItemId) -> ChatResult<ThreadId> {
        if let Some(thread_id) = self.ctx.backend().find_thread_by_item(item_id).await? {
            return Ok(thread_id);
        }

        let thread_id = self.ctx.backend().create_thread(item_id).await?;
        info!(thread_id = %thread_id, "Thread created");
        Ok(thread_id)
    }
}
