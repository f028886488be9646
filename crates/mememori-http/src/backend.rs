//! `ChatBackend` implementation over the REST contract

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use tracing::{debug, instrument};

use mememori_core::traits::{ChatBackend, PortResult};
use mememori_core::{
    Attachment, DomainError, ItemId, Message, MessageId, NewMessage, PendingFile, Reaction,
    ReactionInput, ThreadId, UserId,
};

use crate::client::HttpBackend;
use crate::error::{map_http_error, status_error};
use crate::models::{join_ids, CreateThreadRequest, ReactionBatch, ThreadRef};

#[async_trait]
impl ChatBackend for HttpBackend {
    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn find_thread_by_item(&self, item_id: &ItemId) -> PortResult<Option<ThreadId>> {
        let response = self
            .get(&["threads", "by-item", item_id.as_str()])?
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("Item has no thread yet");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body = Self::body(response).await?;
        Ok(ThreadRef::decode_lookup(&body)?)
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn create_thread(&self, item_id: &ItemId) -> PortResult<ThreadId> {
        let request = self.post(&["threads"])?.json(&CreateThreadRequest { item_id });
        let created: ThreadRef = self.send_json(request).await?;
        created
            .thread_id
            .ok_or_else(|| DomainError::Decode("thread creation response has no thread_id".to_string()))
    }

    #[instrument(skip(self), fields(thread_id = %thread_id))]
    async fn list_messages(&self, thread_id: ThreadId) -> PortResult<Vec<Message>> {
        let request = self
            .get(&["messages"])?
            .query(&[("thread_id", thread_id.into_inner())]);
        let mut messages: Vec<Message> = self.send_json(request).await?;
        for message in &mut messages {
            message.thread_id.get_or_insert(thread_id);
        }
        debug!(count = messages.len(), "Fetched messages");
        Ok(messages)
    }

    #[instrument(skip(self, message), fields(thread_id = %message.thread_id, user_id = %message.user_id))]
    async fn create_message(&self, message: &NewMessage) -> PortResult<Message> {
        let request = self.post(&["messages"])?.json(message);
        self.send_json(request).await
    }

    #[instrument(skip(self), fields(message_id = %message_id))]
    async fn delete_message(&self, message_id: MessageId) -> PortResult<()> {
        let id = message_id.to_string();
        self.send(self.delete(&["messages", &id])?).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(message_id = %message_id))]
    async fn list_attachments(&self, message_id: MessageId) -> PortResult<Vec<Attachment>> {
        let id = message_id.to_string();
        let mut attachments: Vec<Attachment> = self
            .send_json(self.get(&["attachments", "by-message", &id])?)
            .await?;
        for attachment in &mut attachments {
            attachment.message_id.get_or_insert(message_id);
        }
        Ok(attachments)
    }

    #[instrument(skip(self, file), fields(message_id = %message_id, file_name = %file.file_name, size = file.len()))]
    async fn upload_attachment(
        &self,
        message_id: MessageId,
        file: &PendingFile,
    ) -> PortResult<Attachment> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| DomainError::ValidationError(format!("invalid MIME type: {e}")))?;
        let form = Form::new()
            .text("message_id", message_id.to_string())
            .part("file", part);

        let request = self.post(&["message_attachments"])?.multipart(form);
        let mut attachment: Attachment = self.send_json(request).await?;
        attachment.message_id.get_or_insert(message_id);
        Ok(attachment)
    }

    #[instrument(skip(self), fields(message_id = %reaction.message_id, user_id = %reaction.user_id, reaction_type = %reaction.reaction_type))]
    async fn put_reaction(&self, reaction: &ReactionInput) -> PortResult<()> {
        self.send(self.post(&["reactions"])?.json(reaction)).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(message_id = %message_id, user_id = %user_id))]
    async fn delete_reaction(&self, message_id: MessageId, user_id: UserId) -> PortResult<()> {
        let request = self.delete(&["reactions"])?.query(&[
            ("message_id", message_id.into_inner()),
            ("user_id", user_id.into_inner()),
        ]);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, message_ids), fields(count = message_ids.len()))]
    async fn reactions_for_messages(
        &self,
        message_ids: &[MessageId],
    ) -> PortResult<HashMap<MessageId, Vec<Reaction>>> {
        if message_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let request = self
            .get(&["reactions", "batch", "by-message-ids"])?
            .query(&[("ids", join_ids(message_ids))]);
        let batch: ReactionBatch = self.send_json(request).await?;
        Ok(batch.into_map(message_ids))
    }
}
