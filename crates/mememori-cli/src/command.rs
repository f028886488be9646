//! Shell commands
//!
//! A line starting with `/` is a command; anything else becomes the draft text and
//! is sent.

use std::path::PathBuf;

use mememori_common::ClientError;
use mememori_core::{MessageId, ReactionType};

pub const HELP: &str = "\
/reply <id>          reply to a message
/cancel              drop the reply target
/delete <id>         delete a message (asks for confirmation)
/react <id> <kind>   like | heart | smile | sad | agree, or the emoji
/attach <path>       stage a file for the next message
/detach              drop the staged file
/voice <path>        send a recorded clip as a voice message
/show                print the thread
/refresh             refetch the thread
/help                this text
/quit                leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Reply(MessageId),
    CancelReply,
    Delete(MessageId),
    React(MessageId, ReactionType),
    Attach(PathBuf),
    Detach,
    Voice(PathBuf),
    Show,
    Refresh,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>, ClientError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Self::Send(line.to_string())));
        };

        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let args = args.trim();
        let command = match name {
            "reply" => Self::Reply(message_id(args)?),
            "cancel" => Self::CancelReply,
            "delete" => Self::Delete(message_id(args)?),
            "react" => {
                let (id, kind) = args
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| ClientError::invalid_input("usage: /react <id> <kind>"))?;
                let kind = kind.trim();
                let kind = ReactionType::parse(kind)
                    .or_else(|| ReactionType::from_emoji(kind))
                    .ok_or_else(|| ClientError::invalid_input(format!("unknown reaction: {kind}")))?;
                Self::React(message_id(id)?, kind)
            }
            "attach" => Self::Attach(path(args)?),
            "detach" => Self::Detach,
            "voice" => Self::Voice(path(args)?),
            "show" => Self::Show,
            "refresh" => Self::Refresh,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(ClientError::invalid_input(format!("unknown command: /{other}"))),
        };
        Ok(Some(command))
    }
}

fn message_id(raw: &str) -> Result<MessageId, ClientError> {
    MessageId::parse(raw.trim_start_matches('#'))
        .map_err(|_| ClientError::invalid_input(format!("not a message id: {raw:?}")))
}

fn path(raw: &str) -> Result<PathBuf, ClientError> {
    if raw.is_empty() {
        return Err(ClientError::invalid_input("a file path is required"));
    }
    Ok(PathBuf::from(raw))
}

/// Content type for an uploaded file, from its extension
pub fn mime_for(path: &std::path::Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
