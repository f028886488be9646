//! Wire models for responses that do not map one-to-one onto domain entities

use std::collections::HashMap;

use mememori_core::{ItemId, MessageId, Reaction, ThreadId};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Body of `POST /threads`
#[derive(Debug, Serialize)]
pub struct CreateThreadRequest<'a> {
    pub item_id: &'a ItemId,
}

/// `{ "thread_id": ... }` as returned by the thread endpoints
///
/// The lookup may also answer `null`, `{}` or `{"thread_id": null}` when the item
/// has no thread yet.
#[derive(Debug, Default, Deserialize)]
pub struct ThreadRef {
    #[serde(default)]
    pub thread_id: Option<ThreadId>,
}

impl ThreadRef {
    /// Decode a thread lookup body; every "absent" shape yields `None`
    pub fn decode_lookup(body: &[u8]) -> serde_json::Result<Option<ThreadId>> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let parsed: Option<Self> = serde_json::from_slice(body)?;
        Ok(parsed.and_then(|r| r.thread_id))
    }
}

/// Response of the batch reaction lookup, keyed by message id as a string
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct ReactionBatch(HashMap<String, Option<Vec<Reaction>>>);

impl ReactionBatch {
    /// Convert into a map keyed by `MessageId`
    ///
    /// Every requested id is present in the result, with an empty list when the
    /// server omitted it. Keys that are not message ids are skipped.
    pub fn into_map(self, requested: &[MessageId]) -> HashMap<MessageId, Vec<Reaction>> {
        let mut map: HashMap<MessageId, Vec<Reaction>> =
            requested.iter().map(|id| (*id, Vec::new())).collect();

        for (key, reactions) in self.0 {
            let Ok(message_id) = MessageId::parse(&key) else {
                warn!(key = %key, "Skipping reaction batch entry with a non-numeric key");
                continue;
            };
            let mut reactions = reactions.unwrap_or_default();
            for reaction in &mut reactions {
                reaction.message_id.get_or_insert(message_id);
            }
            map.insert(message_id, reactions);
        }

        map
    }
}

/// `ids=1,2,3` query value for the batch lookup
pub fn join_ids(ids: &[MessageId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
