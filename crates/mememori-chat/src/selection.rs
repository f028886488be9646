//! Context menu and long-press detection
//!
//! The menu is either idle or open on one message; the pointer position only exists
//! while it is open. A long press opens it once the threshold elapses, unless the touch
//! moved or ended first.

use mememori_core::{Message, MessageId};

/// Pointer position, in view coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Why an open menu closed without an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    OutsideClick,
    Escape,
}

/// Reply/delete action sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ContextMenu {
    #[default]
    Idle,
    MenuOpen { point: Point, target: Message },
}

impl ContextMenu {
    /// Open on `target`, replacing any menu already open
    pub fn open(&mut self, point: Point, target: Message) {
        *self = Self::MenuOpen { point, target };
    }

    /// Close without an action; returns whether a menu was open
    pub fn dismiss(&mut self, reason: DismissReason) -> bool {
        let was_open = self.is_open();
        if was_open {
            tracing::debug!(?reason, "Context menu dismissed");
        }
        *self = Self::Idle;
        was_open
    }

    /// Close for an action on the target
    pub fn take_target(&mut self) -> Option<Message> {
        match std::mem::take(self) {
            Self::MenuOpen { target, .. } => Some(target),
            Self::Idle => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::MenuOpen { .. })
    }

    pub fn target(&self) -> Option<&Message> {
        match self {
            Self::MenuOpen { target, .. } => Some(target),
            Self::Idle => None,
        }
    }

    pub fn point(&self) -> Option<Point> {
        match self {
            Self::MenuOpen { point, .. } => Some(*point),
            Self::Idle => None,
        }
    }
}

/// A delete awaiting the user's confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteRequest {
    pub message_id: MessageId,
}

/// Result of answering a `DeleteRequest`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
    /// The message left the view before the confirmation
    UnknownMessage,
}

/// Identifies one touch; a cancelled or replaced touch never fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongPressToken(u64);

#[derive(Debug, Clone, Copy)]
struct PendingPress {
    token: LongPressToken,
    message_id: MessageId,
    point: Point,
}

/// Long-press timer state
#[derive(Debug, Default)]
pub struct LongPress {
    counter: u64,
    pending: Option<PendingPress>,
}

impl LongPress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Touch start; the caller fires the returned token once the threshold elapses
    pub fn start(&mut self, message_id: MessageId, point: Point) -> LongPressToken {
        self.counter += 1;
        let token = LongPressToken(self.counter);
        self.pending = Some(PendingPress { token, message_id, point });
        token
    }

    /// Touch move or touch end
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Threshold elapsed; yields the press if it is still the current one
    pub fn fire(&mut self, token: LongPressToken) -> Option<(MessageId, Point)> {
        match self.pending {
            Some(press) if press.token == token => {
                self.pending = None;
                Some((press.message_id, press.point))
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
