//! Message store - the ordered message list of the open thread
//!
//! The server's order is trusted; the store never re-sorts.

use mememori_core::{Message, MessageId};

/// Client-side message list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list with a fetch result
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Append a message received over the realtime channel
    ///
    /// No deduplication: a message already present is appended again.
    pub fn apply_incoming(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Remove a message wherever it sits; returns the removed entry
    pub fn apply_deletion(&mut self, message_id: MessageId) -> Option<Message> {
        let index = self.messages.iter().position(|m| m.message_id == message_id)?;
        let removed = self.messages.remove(index);
        // Incoming duplicates go too
        self.messages.retain(|m| m.message_id != message_id);
        Some(removed)
    }

    pub fn find(&self, message_id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.message_id == message_id)
    }

    pub fn contains(&self, message_id: MessageId) -> bool {
        self.find(message_id).is_some()
    }

    /// Ids in list order, without repeats
    pub fn ids(&self) -> Vec<MessageId> {
        let mut ids: Vec<MessageId> = Vec::with_capacity(self.messages.len());
        for message in &self.messages {
            if !ids.contains(&message.message_id) {
                ids.push(message.message_id);
            }
        }
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
