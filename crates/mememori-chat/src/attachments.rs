//! Attachment resolution
//!
//! Attachments are looked up one message at a time, all in parallel. A failed lookup
//! only costs that message its attachments.

use std::collections::HashMap;

use futures::future::join_all;
use mememori_core::{Attachment, MessageId};
use tracing::{debug, instrument, warn};

use crate::context::ChatContext;

/// Attachments of the open thread, keyed by message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentMap {
    entries: HashMap<MessageId, Vec<Attachment>>,
    /// Revision at which each event-delivered entry was recorded
    live: HashMap<MessageId, u64>,
    revision: u64,
}

impl AttachmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current revision; take it before issuing a bulk fetch
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace every entry with a bulk fetch result
    ///
    /// Entries recorded from events after `since` are newer than the fetch and
    /// survive it; older ones are dropped with the rest of the map.
    pub fn merge_fetched(&mut self, fetched: HashMap<MessageId, Vec<Attachment>>, since: u64) {
        let mut entries = fetched;
        self.live.retain(|_, recorded| *recorded > since);
        for message_id in self.live.keys() {
            if let Some(attachments) = self.entries.remove(message_id) {
                entries.insert(*message_id, attachments);
            }
        }
        self.entries = entries;
    }

    /// Replace (not merge) the entry of one message
    pub fn apply_new_attachment(&mut self, message_id: MessageId, attachments: Vec<Attachment>) {
        self.revision += 1;
        self.live.insert(message_id, self.revision);
        self.entries.insert(message_id, attachments);
    }

    pub fn get(&self, message_id: MessageId) -> &[Attachment] {
        self.entries.get(&message_id).map_or(&[], Vec::as_slice)
    }

    pub fn remove(&mut self, message_id: MessageId) -> Option<Vec<Attachment>> {
        self.live.remove(&message_id);
        self.entries.remove(&message_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.live.clear();
    }
}

/// Attachment resolver
pub struct AttachmentResolver<'a> {
    ctx: &'a ChatContext,
}

impl<'a> AttachmentResolver<'a> {
    /// Create a new AttachmentResolver
    pub fn new(ctx: &'a ChatContext) -> Self {
        Self { ctx }
    }

    /// Look up the attachments of every message concurrently
    ///
    /// Every id gets an entry; a failed lookup yields an empty list.
    #[instrument(skip(self, message_ids), fields(count = message_ids.len()))]
    pub async fn fetch_all_for(&self, message_ids: &[MessageId]) -> HashMap<MessageId, Vec<Attachment>> {
        let lookups = message_ids.iter().map(|&message_id| async move {
            let result = self.ctx.backend().list_attachments(message_id).await;
            (message_id, result)
        });

        let mut failed = 0usize;
        let entries = join_all(lookups)
            .await
            .into_iter()
            .map(|(message_id, result)| match result {
                Ok(attachments) => (message_id, attachments),
                Err(e) => {
                    failed += 1;
                    warn!(message_id = %message_id, error = %e, "Attachment lookup failed");
                    (message_id, Vec::new())
                }
            })
            .collect();

        debug!(failed, "Attachments fetched");
        entries
    }
}
