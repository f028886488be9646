//! Domain entities - the rows the chat core reads and writes

mod attachment;
mod message;
mod reaction;
mod thread;

pub use attachment::{Attachment, AttachmentKind, PendingFile};
pub use message::{Message, NewMessage};
pub use reaction::{Reaction, ReactionInput, ReactionType};
pub use thread::Thread;
