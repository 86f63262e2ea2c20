//! Domain models for mail entities

mod channel;
mod label;
mod message;

pub use channel::ChannelId;
pub use label::{Label, LabelId};
pub use message::{AttachmentRef, Header, Message, MessageId, MessageSummary, Part};
