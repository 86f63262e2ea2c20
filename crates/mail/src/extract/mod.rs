//! Content extraction from fetched messages
//!
//! Three independent extractors: attachments matching a filename pattern,
//! the first `text/plain` body, and the `Subject` header. Missing structure
//! yields empty results, and a bad part never hides its siblings.

mod decode;

pub use decode::{decode_attachment, decode_plain_text};

use log::warn;

use crate::models::{Message, Part};
use crate::provider::MailProvider;

/// A decoded attachment ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Why a single part produced no content
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("attachment {filename:?} has neither an attachment id nor inline data")]
    MissingBody { filename: String },
    #[error("failed to fetch attachment {filename:?}: {source:#}")]
    Fetch {
        filename: String,
        source: anyhow::Error,
    },
    #[error("attachment {filename:?} is not valid base64: {source}")]
    Decode {
        filename: String,
        source: base64::DecodeError,
    },
    #[error("text body is not valid base64: {0}")]
    BodyDecode(#[from] base64::DecodeError),
    #[error("text body is not valid UTF-8: {0}")]
    BodyEncoding(#[from] std::string::FromUtf8Error),
}

/// MIME type of the body forwarded in full mode
const PLAIN_TEXT: &str = "text/plain";

/// Header forwarded in subject-only mode
const SUBJECT: &str = "Subject";

/// Fetch and decode every attachment whose filename contains `pattern`.
///
/// The match is a case-sensitive substring match, so with `.jpg` both
/// `a.jpg` and `c.jpg.txt` qualify. One result per matching part, in part
/// order; failures are per part.
pub async fn extract_attachments(
    provider: &dyn MailProvider,
    message: &Message,
    pattern: &str,
) -> Vec<Result<Attachment, ExtractError>> {
    let mut results = Vec::new();
    for part in message.parts.iter().filter(|p| p.filename.contains(pattern)) {
        results.push(fetch_attachment(provider, message, part).await);
    }
    results
}

async fn fetch_attachment(
    provider: &dyn MailProvider,
    message: &Message,
    part: &Part,
) -> Result<Attachment, ExtractError> {
    let filename = part.filename.clone();

    let encoded = match (&part.attachment, &part.body_data) {
        (Some(attachment), _) => provider
            .get_attachment(&message.id, &attachment.attachment_id)
            .await
            .map_err(|source| ExtractError::Fetch {
                filename: filename.clone(),
                source,
            })?,
        // Small attachments can arrive inline
        (None, Some(data)) => data.clone(),
        (None, None) => return Err(ExtractError::MissingBody { filename }),
    };

    match decode_attachment(&encoded) {
        Ok(data) => Ok(Attachment { filename, data }),
        Err(source) => Err(ExtractError::Decode { filename, source }),
    }
}

/// Decoded body of the first `text/plain` part, if any.
///
/// Only the first such part is considered; if it fails to decode the
/// message has no text.
pub fn extract_plain_text(message: &Message) -> Option<String> {
    let part = message
        .parts
        .iter()
        .find(|p| p.mime_type.as_deref() == Some(PLAIN_TEXT))?;
    let data = part.body_data.as_deref()?;

    match decode_plain_text(data) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("Dropping text body of message {}: {}", message.id, e);
            None
        }
    }
}

/// Value of the top-level `Subject` header (exact, case-sensitive name)
pub fn extract_subject(message: &Message) -> Option<String> {
    message
        .headers
        .iter()
        .find(|h| h.name == SUBJECT)
        .map(|h| h.value.clone())
}
