//! Gmail API HTTP client
//!
//! Provides methods for listing, fetching, modifying and sending messages.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::api::{
    GmailMessage, ListMessagesResponse, ModifyMessageResponse, ProfileResponse, SentMessage,
};
use super::{GmailAuth, MessageFormat, DEFAULT_USER};
use crate::models::MessageId;
use crate::MailError;

/// Gmail API client acting for one user
pub struct GmailClient {
    auth: Arc<GmailAuth>,
    user_id: String,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Upper bound Gmail accepts for `maxResults`
    pub const MAX_RESULTS_LIMIT: u32 = 500;

    /// Create a new Gmail client for the implicit user
    pub fn new(auth: Arc<GmailAuth>) -> Self {
        Self {
            auth,
            user_id: DEFAULT_USER.to_string(),
        }
    }

    /// List message IDs matching a Gmail search query
    ///
    /// # Arguments
    /// * `query` - Gmail search expression (e.g. `is:unread`)
    /// * `max_results` - Maximum number of messages to return (1-500)
    pub fn list_messages(&self, query: &str, max_results: u32) -> Result<ListMessagesResponse> {
        let url = format!(
            "{}/users/me/messages?q={}&maxResults={}",
            Self::BASE_URL,
            urlencoding::encode(query),
            max_results.min(Self::MAX_RESULTS_LIMIT)
        );
        self.get_json(&url, "list messages")
    }

    /// Get full message details by ID
    pub fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        let url = self.message_url(id, MessageFormat::Full);
        self.get_json(&url, "get message")
    }

    /// Get a message in any format as the untouched provider JSON
    pub fn get_message_raw(
        &self,
        id: &MessageId,
        format: MessageFormat,
    ) -> Result<serde_json::Value> {
        let url = self.message_url(id, format);
        self.get_json(&url, "get message")
    }

    /// Add and remove labels on a single message
    pub fn modify_message(
        &self,
        id: &MessageId,
        add_labels: &[&str],
        remove_labels: &[&str],
    ) -> Result<ModifyMessageResponse> {
        let url = format!(
            "{}/users/me/messages/{}/modify",
            Self::BASE_URL,
            urlencoding::encode(id.as_str())
        );
        let body = serde_json::json!({
            "addLabelIds": add_labels,
            "removeLabelIds": remove_labels,
        });
        self.post_json(&url, &body, "modify message")
    }

    /// Send an RFC 822 message, already base64url encoded
    pub fn send_message(&self, raw: &str) -> Result<SentMessage> {
        let url = format!("{}/users/me/messages/send", Self::BASE_URL);
        let body = serde_json::json!({ "raw": raw });
        self.post_json(&url, &body, "send message")
    }

    /// Get the authenticated user's profile
    pub fn get_profile(&self) -> Result<ProfileResponse> {
        let url = format!("{}/users/me/profile", Self::BASE_URL);
        self.get_json(&url, "get profile")
    }

    fn message_url(&self, id: &MessageId, format: MessageFormat) -> String {
        format!(
            "{}/users/me/messages/{}?format={}",
            Self::BASE_URL,
            urlencoding::encode(id.as_str()),
            format.as_str()
        )
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let access_token = self.auth.access_token(&self.user_id)?;

        let response = ureq::get(url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call();

        match response {
            Ok(mut resp) => resp
                .body_mut()
                .read_json()
                .with_context(|| format!("Failed to parse {} response", what)),
            Err(e) => Err(upstream_error(what, e)),
        }
    }

    fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
        what: &str,
    ) -> Result<T> {
        let access_token = self.auth.access_token(&self.user_id)?;

        let response = ureq::post(url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(body);

        match response {
            Ok(mut resp) => resp
                .body_mut()
                .read_json()
                .with_context(|| format!("Failed to parse {} response", what)),
            Err(e) => Err(upstream_error(what, e)),
        }
    }
}

fn upstream_error(what: &str, e: ureq::Error) -> anyhow::Error {
    match e {
        ureq::Error::StatusCode(code) => {
            MailError::upstream(format!("{} failed with HTTP {}", what, code)).into()
        }
        other => MailError::upstream(format!("Failed to send {} request: {}", what, other)).into(),
    }
}
