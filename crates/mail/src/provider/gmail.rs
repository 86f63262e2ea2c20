//! [`MailProvider`] over the Gmail API

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{MailProvider, MessagePage};
use crate::gmail::{GmailClient, normalize_label, normalize_message};
use crate::models::{Label, LabelId, Message, MessageId, MessageSummary};

/// Run a blocking Gmail call on the blocking pool
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("Gmail request task failed")?
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn list_labels(&self) -> Result<Vec<Label>> {
        let client = self.clone();
        let response = blocking(move || client.list_labels()).await?;
        Ok(response
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(normalize_label)
            .collect())
    }

    async fn list_messages(
        &self,
        label_ids: &[LabelId],
        query: &str,
        page_token: Option<&str>,
    ) -> Result<MessagePage> {
        let client = self.clone();
        let label_ids: Vec<String> = label_ids.iter().map(|l| l.as_str().to_string()).collect();
        let query = query.to_string();
        let page_token = page_token.map(str::to_string);

        let response = blocking(move || {
            let labels: Vec<&str> = label_ids.iter().map(String::as_str).collect();
            let query = (!query.is_empty()).then_some(query.as_str());
            client.list_messages(&labels, query, page_token.as_deref())
        })
        .await?;

        Ok(MessagePage {
            messages: response
                .messages
                .unwrap_or_default()
                .into_iter()
                .map(|m| MessageSummary::new(m.id))
                .collect(),
            next_page_token: response.next_page_token,
        })
    }

    async fn get_message(&self, id: &MessageId) -> Result<Message> {
        let client = self.clone();
        let id = id.as_str().to_string();
        let message = blocking(move || client.get_message(&id)).await?;
        Ok(normalize_message(message))
    }

    async fn get_attachment(&self, message_id: &MessageId, attachment_id: &str) -> Result<String> {
        let client = self.clone();
        let message_id = message_id.as_str().to_string();
        let attachment_id = attachment_id.to_string();
        let body = blocking(move || client.get_attachment(&message_id, &attachment_id)).await?;
        body.data.context("Attachment response has no data")
    }

    async fn modify_labels(&self, id: &MessageId, add: &[&str], remove: &[&str]) -> Result<()> {
        let client = self.clone();
        let id = id.as_str().to_string();
        let add: Vec<String> = add.iter().map(|s| s.to_string()).collect();
        let remove: Vec<String> = remove.iter().map(|s| s.to_string()).collect();

        blocking(move || {
            let add: Vec<&str> = add.iter().map(String::as_str).collect();
            let remove: Vec<&str> = remove.iter().map(String::as_str).collect();
            client.modify_message(&id, &add, &remove)
        })
        .await
    }
}
