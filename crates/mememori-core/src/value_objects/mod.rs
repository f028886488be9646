//! Value objects - identifiers and wire helpers shared by every entity

mod ids;
pub mod timestamp;

pub use ids::{AttachmentId, IdParseError, ItemId, MessageId, ThreadId, UserId};
