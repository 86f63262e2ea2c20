//! Gmail API response normalization
//!
//! Converts Gmail API responses to domain models. Every structural field of
//! the wire format is optional; absence yields empty collections, never errors.

use super::api::{GmailLabel, GmailMessage, MessagePart};
use crate::models::{AttachmentRef, Header, Label, Message, MessageId, Part};

/// Normalize a Gmail API message to a domain Message
pub fn normalize_message(gmail_msg: GmailMessage) -> Message {
    let id = MessageId::new(gmail_msg.id);

    let Some(payload) = gmail_msg.payload else {
        return Message::new(id);
    };

    let headers = payload
        .headers
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|h| Header::new(&h.name, &h.value))
        .collect();

    let mut parts = Vec::new();
    match &payload.parts {
        Some(children) => flatten_parts(children, &mut parts),
        // Single-part message: the payload itself carries the body
        None => parts.push(normalize_part(&payload)),
    }

    Message { id, headers, parts }
}

/// Normalize a Gmail label listing entry
pub fn normalize_label(label: GmailLabel) -> Label {
    if label.label_type.as_deref() == Some("system") {
        Label::system(label.id, label.name)
    } else {
        Label::new(label.id, label.name)
    }
}

/// Collect leaf parts depth-first, in document order
fn flatten_parts(parts: &[MessagePart], out: &mut Vec<Part>) {
    for part in parts {
        match &part.parts {
            Some(nested) if !nested.is_empty() => flatten_parts(nested, out),
            _ => out.push(normalize_part(part)),
        }
    }
}

fn normalize_part(part: &MessagePart) -> Part {
    let body = part.body.as_ref();
    Part {
        part_id: part.part_id.clone(),
        mime_type: part.mime_type.clone(),
        filename: part.filename.clone().unwrap_or_default(),
        body_data: body.and_then(|b| b.data.clone()),
        attachment: body
            .and_then(|b| b.attachment_id.clone())
            .map(|attachment_id| AttachmentRef { attachment_id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GmailMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_normalize_multipart_message() {
        let msg = normalize_message(parse(
            r#"{
                "id": "m1",
                "threadId": "t1",
                "payload": {
                    "mimeType": "multipart/mixed",
                    "headers": [
                        { "name": "From", "value": "camera@example.com" },
                        { "name": "Subject", "value": "Motion" }
                    ],
                    "parts": [
                        {
                            "partId": "0",
                            "mimeType": "multipart/alternative",
                            "parts": [
                                { "partId": "0.0", "mimeType": "text/plain", "filename": "",
                                  "body": { "size": 5, "data": "SGVsbG8" } },
                                { "partId": "0.1", "mimeType": "text/html", "filename": "",
                                  "body": { "size": 12, "data": "PGI-SGk8L2I-" } }
                            ]
                        },
                        { "partId": "1", "mimeType": "image/jpeg", "filename": "snap.jpg",
                          "body": { "size": 2048, "attachmentId": "att-1" } }
                    ]
                }
            }"#,
        ));

        assert_eq!(msg.id.as_str(), "m1");
        assert_eq!(msg.headers.len(), 2);
        assert_eq!(msg.headers[1], Header::new("Subject", "Motion"));

        let ids: Vec<_> = msg.parts.iter().map(|p| p.part_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("0.0"), Some("0.1"), Some("1")]);
        assert_eq!(msg.parts[0].body_data.as_deref(), Some("SGVsbG8"));
        assert_eq!(msg.parts[2].filename, "snap.jpg");
        assert_eq!(
            msg.parts[2].attachment,
            Some(AttachmentRef {
                attachment_id: "att-1".to_string()
            })
        );
    }

    #[test]
    fn test_normalize_single_part_message() {
        let msg = normalize_message(parse(
            r#"{
                "id": "m2",
                "payload": {
                    "mimeType": "text/plain",
                    "body": { "size": 5, "data": "SGVsbG8" }
                }
            }"#,
        ));

        assert!(msg.headers.is_empty());
        assert_eq!(msg.parts.len(), 1);
        assert_eq!(msg.parts[0].mime_type.as_deref(), Some("text/plain"));
        assert_eq!(msg.parts[0].filename, "");
    }

    #[test]
    fn test_normalize_without_payload() {
        let msg = normalize_message(parse(r#"{ "id": "m3" }"#));
        assert_eq!(msg, Message::new("m3"));
    }

    #[test]
    fn test_normalize_label() {
        let label: GmailLabel =
            serde_json::from_str(r#"{ "id": "UNREAD", "name": "UNREAD", "type": "system" }"#)
                .unwrap();
        assert!(normalize_label(label).is_system);

        let label: GmailLabel =
            serde_json::from_str(r#"{ "id": "Label_7", "name": "Camera" }"#).unwrap();
        let label = normalize_label(label);
        assert!(!label.is_system);
        assert_eq!(label.id.as_str(), "Label_7");
        assert_eq!(label.name, "Camera");
    }
}
