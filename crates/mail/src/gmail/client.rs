//! Gmail API HTTP client
//!
//! Blocking calls over ureq; [`crate::provider::MailProvider`] moves them onto
//! tokio's blocking pool so they suspend the event loop instead of stalling it.

use anyhow::{Context, Result};
use std::sync::Arc;
use url::Url;

use super::api::{
    AttachmentBody, GmailMessage, ListLabelsResponse, ListMessagesResponse, ModifyMessageRequest,
};
use super::GmailAuth;

/// Gmail API client
///
/// Cheap to clone; clones share the same credential provider.
#[derive(Clone)]
pub struct GmailClient {
    auth: Arc<GmailAuth>,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1/users/me";

    /// Attachments are base64 in JSON, well over ureq's default body limit
    const MAX_ATTACHMENT_BODY: u64 = 64 * 1024 * 1024;

    /// Create a new Gmail client
    pub fn new(auth: GmailAuth) -> Self {
        Self {
            auth: Arc::new(auth),
        }
    }

    /// Obtain an access token, running the interactive flow if needed
    pub fn authenticate(&self) -> Result<()> {
        self.auth.get_access_token()?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}/{}", Self::BASE_URL, path)).context("Invalid Gmail API URL")
    }

    fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.auth.get_access_token()?))
    }

    /// List one page of message IDs
    ///
    /// # Arguments
    /// * `label_ids` - Only messages carrying every one of these labels
    /// * `query` - Gmail search query (e.g. `after:1700000000`)
    /// * `page_token` - Continuation token from the previous page
    pub fn list_messages(
        &self,
        label_ids: &[&str],
        query: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let mut url = self.endpoint("messages")?;
        {
            let mut pairs = url.query_pairs_mut();
            for label_id in label_ids {
                pairs.append_pair("labelIds", label_id);
            }
            if let Some(q) = query {
                pairs.append_pair("q", q);
            }
            if let Some(token) = page_token {
                pairs.append_pair("pageToken", token);
            }
        }

        let mut response = ureq::get(url.as_str())
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send list messages request")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse list messages response")
    }

    /// Get full message details by ID
    pub fn get_message(&self, id: &str) -> Result<GmailMessage> {
        let mut url = self.endpoint(&format!("messages/{}", urlencoding::encode(id)))?;
        url.query_pairs_mut().append_pair("format", "full");

        let mut response = ureq::get(url.as_str())
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send get message request")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse message response")
    }

    /// Get an attachment body by message ID and attachment ID
    pub fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<AttachmentBody> {
        let url = self.endpoint(&format!(
            "messages/{}/attachments/{}",
            urlencoding::encode(message_id),
            urlencoding::encode(attachment_id)
        ))?;

        let mut response = ureq::get(url.as_str())
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send get attachment request")?;

        response
            .body_mut()
            .with_config()
            .limit(Self::MAX_ATTACHMENT_BODY)
            .read_json()
            .context("Failed to parse attachment response")
    }

    /// List all labels in the user's mailbox
    pub fn list_labels(&self) -> Result<ListLabelsResponse> {
        let url = self.endpoint("labels")?;

        let mut response = ureq::get(url.as_str())
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send list labels request")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse labels response")
    }

    /// Add and remove labels on a single message
    pub fn modify_message(&self, id: &str, add: &[&str], remove: &[&str]) -> Result<()> {
        let url = self.endpoint(&format!("messages/{}/modify", urlencoding::encode(id)))?;

        let request = ModifyMessageRequest {
            add_label_ids: add.iter().map(|s| s.to_string()).collect(),
            remove_label_ids: remove.iter().map(|s| s.to_string()).collect(),
        };

        ureq::post(url.as_str())
            .header("Authorization", &self.bearer()?)
            .send_json(&request)
            .context("Failed to send modify message request")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GmailCredentials;

    fn client() -> GmailClient {
        let dir = std::env::temp_dir().join("mailrelay-client-test");
        GmailClient::new(GmailAuth::new(
            GmailCredentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
            dir.join("tokens.json"),
        ))
    }

    #[test]
    fn test_endpoint_escapes_ids() {
        let url = client()
            .endpoint(&format!("messages/{}", urlencoding::encode("a/b")))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://gmail.googleapis.com/gmail/v1/users/me/messages/a%2Fb"
        );
    }

    #[test]
    fn test_parse_list_messages_response() {
        let json = r#"{
            "messages": [ { "id": "m1", "threadId": "t1" }, { "id": "m2", "threadId": "t2" } ],
            "nextPageToken": "page-2",
            "resultSizeEstimate": 4
        }"#;
        let response: ListMessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.messages.unwrap().len(), 2);
        assert_eq!(response.next_page_token.as_deref(), Some("page-2"));
    }

    #[test]
    fn test_parse_empty_list_messages_response() {
        let response: ListMessagesResponse =
            serde_json::from_str(r#"{ "resultSizeEstimate": 0 }"#).unwrap();
        assert!(response.messages.is_none());
        assert!(response.next_page_token.is_none());
    }

    #[test]
    fn test_serialize_modify_request() {
        let request = ModifyMessageRequest {
            add_label_ids: vec![],
            remove_label_ids: vec!["UNREAD".to_string()],
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"addLabelIds":[],"removeLabelIds":["UNREAD"]}"#
        );
    }
}
