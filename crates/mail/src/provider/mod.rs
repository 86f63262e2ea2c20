//! Mail provider abstraction
//!
//! The relay pipeline talks to the mailbox only through [`MailProvider`], so
//! the Gmail API client and the in-memory mailbox are interchangeable.

mod gmail;
mod memory;

pub use memory::InMemoryMailbox;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Label, LabelId, Message, MessageId, MessageSummary};

/// One page of a message listing
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub messages: Vec<MessageSummary>,
    /// Opaque continuation token; `None` on the last page
    pub next_page_token: Option<String>,
}

/// Trait for the mailbox operations the relay needs
///
/// Every call is a suspension point; implementations must not block the
/// calling task.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// List the label catalog
    async fn list_labels(&self) -> Result<Vec<Label>>;

    /// List one page of messages carrying every label in `label_ids` and
    /// matching the search `query`
    async fn list_messages(
        &self,
        label_ids: &[LabelId],
        query: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage>;

    /// Fetch a full message by ID
    async fn get_message(&self, id: &MessageId) -> Result<Message>;

    /// Fetch the still-encoded body of an attachment
    async fn get_attachment(&self, message_id: &MessageId, attachment_id: &str) -> Result<String>;

    /// Add and remove labels on a message
    async fn modify_labels(&self, id: &MessageId, add: &[&str], remove: &[&str]) -> Result<()>;
}
