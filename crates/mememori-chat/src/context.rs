//! Chat context - dependency container for the chat core
//!
//! Holds the two ports and the signed-in user. The shell builds one context and
//! hands clones of it to every chat view; the channel behind it stays shared.

use std::sync::Arc;

use mememori_common::ChatSettings;
use mememori_core::traits::{ChatBackend, EventChannel};
use mememori_core::UserId;

use crate::error::{ChatError, ChatResult};

/// Context passed to every chat component
#[derive(Clone)]
pub struct ChatContext {
    backend: Arc<dyn ChatBackend>,
    channel: Arc<dyn EventChannel>,
    user_id: UserId,
    settings: ChatSettings,
}

impl ChatContext {
    /// Create a new ChatContext
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        channel: Arc<dyn EventChannel>,
        user_id: UserId,
        settings: ChatSettings,
    ) -> Self {
        Self {
            backend,
            channel,
            user_id,
            settings,
        }
    }

    pub fn builder() -> ChatContextBuilder {
        ChatContextBuilder::new()
    }

    /// Get the REST backend
    pub fn backend(&self) -> &dyn ChatBackend {
        self.backend.as_ref()
    }

    /// Get the shared realtime channel
    pub fn channel(&self) -> &dyn EventChannel {
        self.channel.as_ref()
    }

    /// Get the signed-in user
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }
}

impl std::fmt::Debug for ChatContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatContext")
            .field("backend", &"dyn ChatBackend")
            .field("channel", &"dyn EventChannel")
            .field("user_id", &self.user_id)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Builder for creating ChatContext
pub struct ChatContextBuilder {
    backend: Option<Arc<dyn ChatBackend>>,
    channel: Option<Arc<dyn EventChannel>>,
    user_id: Option<UserId>,
    settings: ChatSettings,
}

impl ChatContextBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            channel: None,
            user_id: None,
            settings: ChatSettings::default(),
        }
    }

    pub fn backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn channel(mut self, channel: Arc<dyn EventChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Set the signed-in user; overrides `settings.user_id`
    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn settings(mut self, settings: ChatSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the ChatContext
    ///
    /// # Errors
    /// Returns `ChatError::Validation` if any required dependency is missing
    pub fn build(self) -> ChatResult<ChatContext> {
        let user_id = self
            .user_id
            .or(self.settings.user_id)
            .ok_or_else(|| ChatError::validation("user_id is required"))?;

        Ok(ChatContext::new(
            self.backend.ok_or_else(|| ChatError::validation("backend is required"))?,
            self.channel.ok_or_else(|| ChatError::validation("channel is required"))?,
            user_id,
            self.settings,
        ))
    }
}

impl Default for ChatContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
