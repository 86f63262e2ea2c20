//! In-memory mailbox implementation
//!
//! Used for testing and for running the relay without a Gmail account.
//! Supports injecting failures at the points where the real API can fail.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::{MailProvider, MessagePage};
use crate::models::{Label, LabelId, Message, MessageId, MessageSummary};

struct StoredMessage {
    message: Message,
    label_ids: Vec<String>,
}

/// Injected failures
#[derive(Default)]
struct Failures {
    /// 1-based page numbers whose listing fails
    pages: HashSet<usize>,
    messages: HashSet<String>,
    modify: bool,
}

/// In-memory implementation of MailProvider
///
/// Messages are listed in insertion order, `page_size` at a time.
pub struct InMemoryMailbox {
    labels: RwLock<Vec<Label>>,
    messages: RwLock<Vec<StoredMessage>>,
    /// (message id, attachment id) -> encoded body
    attachments: RwLock<HashMap<(String, String), String>>,
    failures: RwLock<Failures>,
    queries: RwLock<Vec<String>>,
    modifications: RwLock<Vec<(MessageId, Vec<String>, Vec<String>)>>,
    page_size: usize,
}

impl Default for InMemoryMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMailbox {
    /// Create an empty mailbox with a page size of 100
    pub fn new() -> Self {
        Self::with_page_size(100)
    }

    /// Create an empty mailbox listing `page_size` messages per page
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            labels: RwLock::new(Vec::new()),
            messages: RwLock::new(Vec::new()),
            attachments: RwLock::new(HashMap::new()),
            failures: RwLock::new(Failures::default()),
            queries: RwLock::new(Vec::new()),
            modifications: RwLock::new(Vec::new()),
            page_size: page_size.max(1),
        }
    }

    /// Add a label to the catalog
    pub fn add_label(&self, label: Label) {
        self.labels.write().unwrap().push(label);
    }

    /// Store a message carrying the given labels
    pub fn insert_message(&self, message: Message, label_ids: &[&str]) {
        self.messages.write().unwrap().push(StoredMessage {
            message,
            label_ids: label_ids.iter().map(|s| s.to_string()).collect(),
        });
    }

    /// Store an attachment body for a message
    pub fn insert_attachment(&self, message_id: &str, attachment_id: &str, data: &str) {
        self.attachments.write().unwrap().insert(
            (message_id.to_string(), attachment_id.to_string()),
            data.to_string(),
        );
    }

    /// Make listing the given 1-based page fail
    pub fn fail_page(&self, page: usize) {
        self.failures.write().unwrap().pages.insert(page);
    }

    /// Make fetching the given message fail
    pub fn fail_message(&self, id: &str) {
        self.failures.write().unwrap().messages.insert(id.to_string());
    }

    /// Make every label modification fail
    pub fn fail_modify(&self) {
        self.failures.write().unwrap().modify = true;
    }

    /// Search queries received so far, in call order
    pub fn queries(&self) -> Vec<String> {
        self.queries.read().unwrap().clone()
    }

    /// Label modifications requested so far, as (id, added, removed)
    pub fn modifications(&self) -> Vec<(MessageId, Vec<String>, Vec<String>)> {
        self.modifications.read().unwrap().clone()
    }

    /// Whether the message still carries the UNREAD label
    pub fn is_unread(&self, id: &str) -> bool {
        self.messages
            .read()
            .unwrap()
            .iter()
            .any(|m| m.message.id.as_str() == id && m.label_ids.iter().any(|l| l == LabelId::UNREAD))
    }
}

#[async_trait]
impl MailProvider for InMemoryMailbox {
    async fn list_labels(&self) -> Result<Vec<Label>> {
        Ok(self.labels.read().unwrap().clone())
    }

    async fn list_messages(
        &self,
        label_ids: &[LabelId],
        query: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage> {
        self.queries.write().unwrap().push(query.to_string());

        let offset: usize = match page_token {
            Some(token) => token
                .parse()
                .map_err(|_| anyhow!("Invalid page token: {}", token))?,
            None => 0,
        };

        let page_number = offset / self.page_size + 1;
        if self.failures.read().unwrap().pages.contains(&page_number) {
            bail!("Listing page {} failed", page_number);
        }

        let matching: Vec<MessageSummary> = self
            .messages
            .read()
            .unwrap()
            .iter()
            .filter(|m| {
                label_ids
                    .iter()
                    .all(|wanted| m.label_ids.iter().any(|l| l == wanted.as_str()))
            })
            .map(|m| MessageSummary::new(m.message.id.clone()))
            .collect();

        let end = (offset + self.page_size).min(matching.len());
        let messages = matching.get(offset..end).unwrap_or_default().to_vec();
        let next_page_token = (end < matching.len()).then(|| end.to_string());

        Ok(MessagePage {
            messages,
            next_page_token,
        })
    }

    async fn get_message(&self, id: &MessageId) -> Result<Message> {
        if self.failures.read().unwrap().messages.contains(id.as_str()) {
            bail!("Fetching message {} failed", id);
        }

        self.messages
            .read()
            .unwrap()
            .iter()
            .find(|m| &m.message.id == id)
            .map(|m| m.message.clone())
            .ok_or_else(|| anyhow!("Message not found: {}", id))
    }

    async fn get_attachment(&self, message_id: &MessageId, attachment_id: &str) -> Result<String> {
        self.attachments
            .read()
            .unwrap()
            .get(&(message_id.as_str().to_string(), attachment_id.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("Attachment not found: {}/{}", message_id, attachment_id))
    }

    async fn modify_labels(&self, id: &MessageId, add: &[&str], remove: &[&str]) -> Result<()> {
        self.modifications.write().unwrap().push((
            id.clone(),
            add.iter().map(|s| s.to_string()).collect(),
            remove.iter().map(|s| s.to_string()).collect(),
        ));

        if self.failures.read().unwrap().modify {
            bail!("Modifying message {} failed", id);
        }

        let mut messages = self.messages.write().unwrap();
        let stored = messages
            .iter_mut()
            .find(|m| &m.message.id == id)
            .ok_or_else(|| anyhow!("Message not found: {}", id))?;

        stored.label_ids.retain(|l| !remove.contains(&l.as_str()));
        for label in add {
            if !stored.label_ids.iter().any(|l| l == label) {
                stored.label_ids.push(label.to_string());
            }
        }
        Ok(())
    }
}
