//! Outgoing message composition
//!
//! Builds a single-part RFC 822 message and encodes it the way
//! `users.messages.send` expects (`raw`, base64url).

use base64::prelude::*;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Mailboxes, Message};
use serde::Deserialize;

use crate::MailError;

/// A message to be sent through Gmail
#[derive(Debug, Clone, Deserialize)]
pub struct OutgoingMessage {
    /// One or more comma-separated recipients
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub is_html: Option<bool>,
    /// `From` header; the account address is used when absent
    #[serde(default)]
    pub sender: Option<String>,
}

/// Build the base64url-encoded RFC 822 form of `message`
///
/// # Arguments
/// * `message` - What to send
/// * `default_sender` - `From` address used when `message.sender` is empty
pub fn build_raw_message(
    message: &OutgoingMessage,
    default_sender: &str,
) -> Result<String, MailError> {
    let recipients: Mailboxes = message
        .to
        .parse()
        .map_err(|e| MailError::invalid_argument(format!("Invalid recipient '{}': {}", message.to, e)))?;

    let sender = message
        .sender
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_sender);
    let from: Mailbox = sender
        .parse()
        .map_err(|e| MailError::invalid_argument(format!("Invalid sender '{}': {}", sender, e)))?;

    let mut builder = Message::builder()
        .from(from)
        .subject(message.subject.as_str())
        .date_now();
    for mailbox in recipients {
        builder = builder.to(mailbox);
    }

    let content_type = if message.is_html.unwrap_or(false) {
        ContentType::TEXT_HTML
    } else {
        ContentType::TEXT_PLAIN
    };

    let email = builder
        .header(content_type)
        .body(message.body.clone())
        .map_err(|e| MailError::invalid_argument(format!("Failed to build message: {}", e)))?;

    Ok(BASE64_URL_SAFE.encode(email.formatted()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &str) -> String {
        String::from_utf8(BASE64_URL_SAFE.decode(raw).unwrap()).unwrap()
    }

    fn outgoing(to: &str, is_html: bool, sender: Option<&str>) -> OutgoingMessage {
        OutgoingMessage {
            to: to.to_string(),
            subject: "Status report".to_string(),
            body: "All systems nominal".to_string(),
            is_html: Some(is_html),
            sender: sender.map(str::to_string),
        }
    }

    #[test]
    fn test_plain_message_headers() {
        let raw = build_raw_message(&outgoing("ops@example.com", false, None), "me@example.com").unwrap();
        let text = decode(&raw);

        assert!(text.contains("To: ops@example.com"));
        assert!(text.contains("From: me@example.com"));
        assert!(text.contains("Subject: Status report"));
        assert!(text.contains("Date: "));
        assert!(text.contains("Content-Type: text/plain; charset=utf-8"));
        assert!(text.contains("All systems nominal"));
    }

    #[test]
    fn test_html_message_content_type() {
        let raw = build_raw_message(&outgoing("ops@example.com", true, None), "me@example.com").unwrap();
        assert!(decode(&raw).contains("Content-Type: text/html; charset=utf-8"));
    }

    #[test]
    fn test_explicit_sender_wins() {
        let raw = build_raw_message(
            &outgoing("ops@example.com", false, Some("Alerts <alerts@example.com>")),
            "me@example.com",
        )
        .unwrap();
        let text = decode(&raw);
        assert!(text.contains("alerts@example.com"));
        assert!(!text.contains("me@example.com"));
    }

    #[test]
    fn test_multiple_recipients() {
        let raw = build_raw_message(
            &outgoing("a@example.com, b@example.com", false, None),
            "me@example.com",
        )
        .unwrap();
        let text = decode(&raw);
        assert!(text.contains("a@example.com"));
        assert!(text.contains("b@example.com"));
    }

    #[test]
    fn test_invalid_recipient() {
        let err = build_raw_message(&outgoing("not an address", false, None), "me@example.com").unwrap_err();
        assert!(matches!(err, MailError::InvalidArgument { .. }));
    }

    #[test]
    fn test_deserialize_request_defaults() {
        let msg: OutgoingMessage =
            serde_json::from_str(r#"{"to":"a@example.com","subject":"s","body":"b"}"#).unwrap();
        assert_eq!(msg.is_html, None);
        assert!(msg.sender.is_none());
    }
}
