//! Plain-text rendering of the timeline

use mememori_chat::{AttachmentView, MessageRow, ReactionBadge, ReplyPreview, TimelineEntry};
use mememori_core::ChatEvent;

pub fn timeline(entries: &[TimelineEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        match entry {
            TimelineEntry::DateSeparator(separator) => {
                out.push_str(&format!("──── {} ────\n", separator.label));
            }
            TimelineEntry::Message(row) => out.push_str(&message_row(row)),
        }
    }
    out
}

fn message_row(row: &MessageRow) -> String {
    let message = &row.message;
    let marker = if row.is_own { ">" } else { " " };
    let mut out = String::new();

    match &row.reply {
        ReplyPreview::None => {}
        ReplyPreview::Quoted { username, content } => {
            out.push_str(&format!("{marker}   ┃ {username}: {content}\n"));
        }
        ReplyPreview::Deleted => {
            out.push_str(&format!("{marker}   ┃ {}\n", row.reply.text().unwrap_or_default()));
        }
    }

    out.push_str(&format!(
        "{marker} #{} {} {}: {}\n",
        message.message_id, row.time_label, message.username, message.content
    ));

    for attachment in &row.attachments {
        let line = match attachment {
            AttachmentView::Image { url } => format!("[image] {url}"),
            AttachmentView::Video { url } => format!("[video] {url}"),
            AttachmentView::Voice { url } => format!("[voice] {url}"),
            AttachmentView::FileLink { url, name } => format!("[file] {name} {url}"),
        };
        out.push_str(&format!("{marker}     {line}\n"));
    }

    if !row.reactions.is_empty() {
        let badges: Vec<String> = row.reactions.iter().map(badge).collect();
        out.push_str(&format!("{marker}     {}\n", badges.join(" ")));
    }
    out
}

fn badge(badge: &ReactionBadge) -> String {
    let mine = if badge.mine { "*" } else { "" };
    match badge.count_label() {
        Some(count) => format!("{}{count}{mine}", badge.emoji),
        None => badge.emoji.to_string(),
    }
}

/// One-line notice for an incoming event
pub fn event_notice(event: &ChatEvent) -> String {
    match event {
        ChatEvent::SendMessage(message) => {
            format!("* {} wrote #{}", message.username, message.message_id)
        }
        other => format!("* {} on #{}", other.kind().as_str(), other.message_id()),
    }
}
