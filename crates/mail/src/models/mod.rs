//! Domain models for mail entities

mod message;

pub use message::{Attachment, MessageId, ParsedMessage, ThreadId};
