//! Message model representing a fetched Gmail message

use serde::{Deserialize, Serialize};

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lightweight handle returned by a message listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub id: MessageId,
}

impl MessageSummary {
    pub fn new(id: impl Into<MessageId>) -> Self {
        Self { id: id.into() }
    }
}

/// Email header (name-value pair)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Reference to an attachment body stored separately by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub attachment_id: String,
}

/// A leaf MIME part of a message.
///
/// Multipart containers are flattened away during normalization, so the
/// parts of a [`Message`] are the leaves in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    pub part_id: Option<String>,
    pub mime_type: Option<String>,
    /// Empty when the part is not a named attachment
    pub filename: String,
    /// Inline body data, still encoded the way the provider sent it
    pub body_data: Option<String>,
    /// Set when the body must be fetched with a separate call
    pub attachment: Option<AttachmentRef>,
}

impl Part {
    /// Create a text part carrying inline encoded data
    pub fn text(mime_type: impl Into<String>, body_data: impl Into<String>) -> Self {
        Self {
            mime_type: Some(mime_type.into()),
            body_data: Some(body_data.into()),
            ..Self::default()
        }
    }

    /// Create an attachment part whose body lives behind `attachment_id`
    pub fn attachment(filename: impl Into<String>, attachment_id: impl Into<String>) -> Self {
        Self {
            mime_type: Some("application/octet-stream".to_string()),
            filename: filename.into(),
            attachment: Some(AttachmentRef {
                attachment_id: attachment_id.into(),
            }),
            ..Self::default()
        }
    }

    /// Builder method to set the MIME type
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// A fetched message: top-level headers plus its flattened part list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub headers: Vec<Header>,
    pub parts: Vec<Part>,
}

impl Message {
    /// Create an empty message with the given ID
    pub fn new(id: impl Into<MessageId>) -> Self {
        Self {
            id: id.into(),
            headers: Vec::new(),
            parts: Vec::new(),
        }
    }

    /// Builder method to add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Builder method to add a part
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }
}
