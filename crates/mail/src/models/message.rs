//! Message model produced by flattening a Gmail payload

use serde::{Deserialize, Serialize};

use crate::gmail::api::Header;

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

/// Unique identifier for a thread (Gmail thread ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Attachment metadata discovered while walking a payload
///
/// A part counts as an attachment whenever it carries a non-empty filename,
/// whatever its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub size: u64,
    #[serde(rename = "attachmentId")]
    pub attachment_id: Option<String>,
}

/// A message flattened into text, HTML and attachment metadata
///
/// `text_plain` and `text_html` hold every matching leaf concatenated in
/// document order, trimmed once after the walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMessage {
    pub id: MessageId,
    #[serde(rename = "threadId")]
    pub thread_id: Option<ThreadId>,
    pub snippet: Option<String>,
    pub headers: Vec<Header>,
    pub text_plain: String,
    pub text_html: String,
    pub attachments: Vec<Attachment>,
}

impl ParsedMessage {
    /// Look up a header value by name (case-insensitive, first match)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParsedMessage {
        ParsedMessage {
            id: MessageId::new("m1"),
            thread_id: Some(ThreadId::new("t1")),
            snippet: Some("Hello".to_string()),
            headers: vec![Header {
                name: "Subject".to_string(),
                value: "Greetings".to_string(),
            }],
            text_plain: "Hello".to_string(),
            text_html: String::new(),
            attachments: vec![],
        }
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let msg = sample();
        assert_eq!(msg.header("subject"), Some("Greetings"));
        assert_eq!(msg.header("From"), None);
    }

    #[test]
    fn test_serializes_with_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["id"], "m1");
        assert_eq!(value["threadId"], "t1");
        assert_eq!(value["text_plain"], "Hello");
        assert!(value["attachments"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_attachment_field_names() {
        let attachment = Attachment {
            filename: "doc.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 1024,
            attachment_id: Some("att-1".to_string()),
        };
        let value = serde_json::to_value(attachment).unwrap();
        assert_eq!(value["mimeType"], "application/pdf");
        assert_eq!(value["attachmentId"], "att-1");
        assert_eq!(value["size"], 1024);
    }
}
