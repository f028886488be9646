//! Interactive shell around one `ChatView`

use std::path::Path;

use mememori_chat::{
    ChatView, DeleteOutcome, DeleteRequest, FetchOutcome, Point, ReactOutcome, ReactionChange, SendOutcome,
};
use mememori_common::{ClientError, ClientResult};
use mememori_core::{MessageId, PendingFile};
use parking_lot::Mutex;
use tracing::debug;

use crate::command::{mime_for, Command, HELP};
use crate::render;

/// Whether the input loop goes on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Shell {
    view: ChatView,
    /// Delete waiting for a yes/no answer on the next line
    pending_delete: Mutex<Option<DeleteRequest>>,
}

impl Shell {
    pub fn new(view: ChatView) -> Self {
        Self {
            view,
            pending_delete: Mutex::new(None),
        }
    }

    pub fn view(&self) -> &ChatView {
        &self.view
    }

    /// Handle one input line and return what to print
    pub async fn handle_line(&self, line: &str) -> ClientResult<(Flow, String)> {
        let pending = self.pending_delete.lock().take();
        if let Some(request) = pending {
            let confirmed = matches!(line.trim().to_lowercase().as_str(), "y" | "yes");
            return self.answer_delete(request, confirmed).await;
        }

        match Command::parse(line)? {
            Some(command) => self.execute(command).await,
            None => Ok((Flow::Continue, String::new())),
        }
    }

    async fn execute(&self, command: Command) -> ClientResult<(Flow, String)> {
        debug!(?command, "Executing command");
        let output = match command {
            Command::Send(text) => {
                self.view.with_composer(|c| c.set_text(text));
                let outcome = self.view.send().await?;
                self.describe_send(outcome)
            }
            Command::Reply(message_id) => {
                self.select(message_id)?;
                self.view.choose_reply();
                let preview = self.view.with_composer(|c| c.reply_preview());
                preview.map_or_else(String::new, |p| format!("replying to {}: {}", p.username, p.preview))
            }
            Command::CancelReply => {
                self.view.with_composer(|c| c.cancel_reply());
                "reply cancelled".to_string()
            }
            Command::Delete(message_id) => {
                self.select(message_id)?;
                match self.view.choose_delete() {
                    Some(request) => {
                        *self.pending_delete.lock() = Some(request);
                        format!("delete #{message_id}? [y/N]")
                    }
                    None => String::new(),
                }
            }
            Command::React(message_id, kind) => match self.view.react(message_id, kind).await? {
                ReactOutcome::Applied(ReactionChange::Removed(kind)) => format!("removed {}", kind.emoji()),
                ReactOutcome::Applied(ReactionChange::Added(kind) | ReactionChange::Replaced { to: kind, .. }) => {
                    format!("reacted {}", kind.emoji())
                }
                ReactOutcome::UnknownMessage => format!("no message #{message_id}"),
            },
            Command::Attach(path) => {
                let file = read_file(&path).await?;
                let name = file.file_name.clone();
                self.view.with_composer(|c| c.stage_file(file));
                format!("staged {name}")
            }
            Command::Detach => {
                self.view.with_composer(|c| c.clear_file());
                "file dropped".to_string()
            }
            Command::Voice(path) => {
                let clip = tokio::fs::read(&path).await.map_err(ClientError::internal)?;
                let outcome = self.view.send_voice(clip).await?;
                self.describe_send(outcome)
            }
            Command::Show => render::timeline(&self.view.timeline()),
            Command::Refresh => match self.view.fetch_messages().await? {
                FetchOutcome::NoThread => "this item has no chat yet".to_string(),
                FetchOutcome::Applied { .. } | FetchOutcome::Stale => render::timeline(&self.view.timeline()),
            },
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok((Flow::Quit, String::new())),
        };
        Ok((Flow::Continue, output))
    }

    /// Open the action menu on a message, as a right-click would
    fn select(&self, message_id: MessageId) -> ClientResult<()> {
        if self.view.open_menu(message_id, Point::new(0.0, 0.0)) {
            Ok(())
        } else {
            Err(ClientError::invalid_input(format!("no message #{message_id}")))
        }
    }

    async fn answer_delete(&self, request: DeleteRequest, confirmed: bool) -> ClientResult<(Flow, String)> {
        let output = match self.view.confirm_delete(request, confirmed).await? {
            DeleteOutcome::Deleted => format!("deleted #{}", request.message_id),
            DeleteOutcome::Cancelled => "kept".to_string(),
            DeleteOutcome::UnknownMessage => format!("#{} is already gone", request.message_id),
        };
        Ok((Flow::Continue, output))
    }

    fn describe_send(&self, outcome: SendOutcome) -> String {
        match outcome {
            SendOutcome::Sent(_) => render::timeline(&self.view.timeline()),
            SendOutcome::Busy => "still sending".to_string(),
            SendOutcome::Empty => String::new(),
            SendOutcome::NoThread => "this item has no chat yet".to_string(),
        }
    }
}

async fn read_file(path: &Path) -> ClientResult<PendingFile> {
    let bytes = tokio::fs::read(path).await.map_err(ClientError::internal)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ClientError::invalid_input(format!("not a file: {}", path.display())))?;
    Ok(PendingFile::new(name, mime_for(path), bytes))
}
