//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 web authorization flow and token refresh
//! - Per-user credential storage
//! - Gmail API client for listing, fetching, modifying and sending messages
//! - Payload flattening into [`crate::models::ParsedMessage`]
//! - RFC 822 composition for outgoing mail

mod auth;
mod client;
mod compose;
mod credentials;
mod html;
mod normalize;

pub use auth::{DEFAULT_USER, GmailAuth};
pub use client::GmailClient;
pub use compose::{OutgoingMessage, build_raw_message};
pub use credentials::{CredentialStore, StoredCredentials};
pub use html::html_to_text;
pub use normalize::{DecodeError, ParsedBody, decode_base64_body, parse_message, parse_payload};

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Clone, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub messages: Option<Vec<MessageRef>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub next_page_token: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub result_size_estimate: Option<u32>,
    }

    impl ListMessagesResponse {
        /// Number of message references in this page
        pub fn len(&self) -> usize {
            self.messages.as_ref().map_or(0, Vec::len)
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub thread_id: String,
    }

    /// Message from Gmail API (`format=full`)
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub thread_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub label_ids: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub snippet: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub internal_date: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub payload: Option<MessagePayload>,
    }

    /// One node of a message's MIME tree
    ///
    /// The root payload and every nested part share this shape. A node may
    /// carry inline body data, child parts, both, or neither.
    #[derive(Debug, Clone, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePayload {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub part_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub mime_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub filename: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub headers: Option<Vec<Header>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub body: Option<MessageBody>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub parts: Option<Vec<MessagePayload>>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Message body (base64url encoded when inline)
    #[derive(Debug, Clone, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageBody {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub attachment_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub size: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub data: Option<String>,
    }

    /// Response from modifying a message's labels
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ModifyMessageResponse {
        pub id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub label_ids: Option<Vec<String>>,
    }

    /// Response from sending a message
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SentMessage {
        pub id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub thread_id: Option<String>,
    }

    /// Response from getting user profile
    #[derive(Debug, Clone, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProfileResponse {
        pub email_address: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub messages_total: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub history_id: Option<String>,
    }
}

/// Format requested from `users.messages.get`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    Full,
    Raw,
    Metadata,
}

impl MessageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFormat::Full => "full",
            MessageFormat::Raw => "raw",
            MessageFormat::Metadata => "metadata",
        }
    }
}

impl std::str::FromStr for MessageFormat {
    type Err = crate::MailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(MessageFormat::Full),
            "raw" => Ok(MessageFormat::Raw),
            "metadata" => Ok(MessageFormat::Metadata),
            other => Err(crate::MailError::invalid_argument(format!(
                "Unsupported message format '{}' (expected full, raw or metadata)",
                other
            ))),
        }
    }
}
