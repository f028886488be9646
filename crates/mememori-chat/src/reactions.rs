//! Reaction aggregation
//!
//! Each user holds at most one reaction per message. Choosing the same emoji again
//! removes it, choosing another replaces it. Local edits are applied optimistically
//! and every reaction set carries a version so that a refetch started before an edit
//! cannot overwrite it.

use std::collections::HashMap;

use mememori_core::{ChatEvent, MessageId, Reaction, ReactionInput, ReactionType, UserId};
use tracing::{debug, instrument, warn};

use crate::context::ChatContext;
use crate::error::ChatResult;

/// What a `react` call did to the user's reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added(ReactionType),
    Replaced { from: ReactionType, to: ReactionType },
    Removed(ReactionType),
}

impl ReactionChange {
    pub fn is_removal(self) -> bool {
        matches!(self, Self::Removed(_))
    }

    /// The realtime event announcing this change
    pub fn to_event(self, message_id: MessageId, user_id: UserId) -> ChatEvent {
        match self {
            Self::Removed(_) => ChatEvent::remove_reaction(message_id, user_id),
            Self::Added(kind) | Self::Replaced { to: kind, .. } => {
                ChatEvent::add_reaction(message_id, user_id, kind)
            }
        }
    }
}

/// Result of a `react` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactOutcome {
    Applied(ReactionChange),
    /// The message is not in the open thread
    UnknownMessage,
}

/// One emoji control under a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionBadge {
    pub reaction_type: ReactionType,
    pub emoji: &'static str,
    pub count: usize,
    /// The current user chose this emoji
    pub mine: bool,
}

impl ReactionBadge {
    /// The count shown next to the emoji; hidden at zero
    pub fn count_label(&self) -> Option<usize> {
        (self.count > 0).then_some(self.count)
    }
}

#[derive(Debug, Clone, Default)]
struct ReactionSet {
    reactions: Vec<Reaction>,
    version: u64,
    /// Optimistic edits whose REST call has not returned yet
    pending: u32,
}

/// An optimistic edit, kept so it can be undone if the server rejects it
#[derive(Debug, Clone)]
pub struct LocalEdit {
    pub change: ReactionChange,
    previous: Vec<Reaction>,
    version: u64,
}

/// Reactions of the open thread, keyed by message
#[derive(Debug, Clone, Default)]
pub struct ReactionBook {
    sets: HashMap<MessageId, ReactionSet>,
}

impl ReactionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reactions(&self, message_id: MessageId) -> &[Reaction] {
        self.sets
            .get(&message_id)
            .map_or(&[], |set| set.reactions.as_slice())
    }

    /// The reaction `user_id` currently holds on a message
    pub fn user_reaction(&self, message_id: MessageId, user_id: UserId) -> Option<ReactionType> {
        self.reactions(message_id)
            .iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.reaction_type)
    }

    pub fn version(&self, message_id: MessageId) -> u64 {
        self.sets.get(&message_id).map_or(0, |set| set.version)
    }

    /// Versions to compare a fetch result against when it returns
    pub fn snapshot_versions(&self, message_ids: &[MessageId]) -> HashMap<MessageId, u64> {
        message_ids.iter().map(|id| (*id, self.version(*id))).collect()
    }

    /// Apply a reaction choice locally
    pub fn apply_local(&mut self, message_id: MessageId, user_id: UserId, kind: ReactionType) -> LocalEdit {
        let set = self.sets.entry(message_id).or_default();
        let previous = set.reactions.clone();
        let current = set
            .reactions
            .iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.reaction_type);

        let change = match current {
            Some(existing) if existing == kind => ReactionChange::Removed(kind),
            Some(existing) => ReactionChange::Replaced { from: existing, to: kind },
            None => ReactionChange::Added(kind),
        };

        set.reactions.retain(|r| r.user_id != user_id);
        if !change.is_removal() {
            set.reactions.push(Reaction::new(message_id, user_id, kind));
        }
        set.version += 1;
        set.pending += 1;

        LocalEdit {
            change,
            previous,
            version: set.version,
        }
    }

    /// Mark one optimistic edit as answered by the server
    pub fn settle(&mut self, message_id: MessageId) {
        if let Some(set) = self.sets.get_mut(&message_id) {
            set.pending = set.pending.saturating_sub(1);
        }
    }

    /// Undo an edit the server rejected, unless a newer edit already replaced it
    pub fn rollback(&mut self, message_id: MessageId, edit: &LocalEdit) -> bool {
        let Some(set) = self.sets.get_mut(&message_id) else {
            return false;
        };
        if set.version != edit.version {
            return false;
        }
        set.reactions.clone_from(&edit.previous);
        set.version += 1;
        true
    }

    /// Apply a fetch result; returns how many sets were replaced
    ///
    /// A set is skipped while an edit is in flight or when its version moved since
    /// `versions_at_start` was taken.
    pub fn apply_fetched(
        &mut self,
        fetched: HashMap<MessageId, Vec<Reaction>>,
        versions_at_start: &HashMap<MessageId, u64>,
    ) -> usize {
        let mut applied = 0;
        for (message_id, reactions) in fetched {
            let started_at = versions_at_start.get(&message_id).copied().unwrap_or(0);
            let set = self.sets.entry(message_id).or_default();
            if set.pending > 0 || set.version != started_at {
                debug!(message_id = %message_id, "Discarding stale reaction fetch");
                continue;
            }
            set.reactions = reactions;
            applied += 1;
        }
        applied
    }

    /// Drop the sets of messages no longer shown, keeping those with edits in flight
    pub fn retain_messages(&mut self, message_ids: &[MessageId]) {
        self.sets
            .retain(|id, set| set.pending > 0 || message_ids.contains(id));
    }

    pub fn remove(&mut self, message_id: MessageId) {
        self.sets.remove(&message_id);
    }

    pub fn clear(&mut self) {
        self.sets.clear();
    }

    /// Emoji controls for one message, in palette order
    ///
    /// With `show_all` every palette entry is listed; otherwise only the ones someone chose.
    pub fn badges(&self, message_id: MessageId, user_id: UserId, show_all: bool) -> Vec<ReactionBadge> {
        let reactions = self.reactions(message_id);
        ReactionType::PALETTE
            .iter()
            .filter_map(|&kind| {
                let count = reactions.iter().filter(|r| r.is_type(kind)).count();
                if !show_all && count == 0 {
                    return None;
                }
                Some(ReactionBadge {
                    reaction_type: kind,
                    emoji: kind.emoji(),
                    count,
                    mine: reactions.iter().any(|r| r.user_id == user_id && r.is_type(kind)),
                })
            })
            .collect()
    }
}

/// Reaction aggregator
pub struct ReactionAggregator<'a> {
    ctx: &'a ChatContext,
}

impl<'a> ReactionAggregator<'a> {
    /// Create a new ReactionAggregator
    pub fn new(ctx: &'a ChatContext) -> Self {
        Self { ctx }
    }

    /// Fetch the reactions of many messages in one request
    ///
    /// No request is made for an empty id list.
    #[instrument(skip(self, message_ids), fields(count = message_ids.len()))]
    pub async fn fetch_all_for(
        &self,
        message_ids: &[MessageId],
    ) -> ChatResult<HashMap<MessageId, Vec<Reaction>>> {
        if message_ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self.ctx.backend().reactions_for_messages(message_ids).await?)
    }

    /// Send an applied change to the server, then announce it
    ///
    /// A failed announcement is only logged: the server already holds the change.
    #[instrument(skip(self), fields(user_id = %self.ctx.user_id()))]
    pub async fn commit(&self, message_id: MessageId, change: ReactionChange) -> ChatResult<()> {
        let user_id = self.ctx.user_id();
        match change {
            ReactionChange::Removed(_) => {
                self.ctx.backend().delete_reaction(message_id, user_id).await?;
            }
            ReactionChange::Added(kind) | ReactionChange::Replaced { to: kind, .. } => {
                let input = ReactionInput {
                    message_id,
                    user_id,
                    reaction_type: kind,
                };
                self.ctx.backend().put_reaction(&input).await?;
            }
        }

        if let Err(e) = self.ctx.channel().emit(change.to_event(message_id, user_id)).await {
            warn!(error = %e, "Failed to announce reaction");
        }
        Ok(())
    }
}
