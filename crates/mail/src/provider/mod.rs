//! Mail provider abstraction
//!
//! The service talks to Gmail through this trait so it can be exercised
//! against [`InMemoryProvider`] in tests.

mod memory;

pub use memory::InMemoryProvider;

use anyhow::Result;

use crate::gmail::api::{
    GmailMessage, ListMessagesResponse, ModifyMessageResponse, ProfileResponse, SentMessage,
};
use crate::gmail::{GmailClient, MessageFormat};
use crate::models::MessageId;

/// Operations the service needs from the remote mailbox
pub trait MailProvider: Send + Sync {
    /// List message references matching a search query
    fn list_messages(&self, query: &str, max_results: u32) -> Result<ListMessagesResponse>;

    /// Fetch a message in `full` format
    fn get_message(&self, id: &MessageId) -> Result<GmailMessage>;

    /// Fetch a message in any format as untouched JSON
    fn get_message_raw(&self, id: &MessageId, format: MessageFormat) -> Result<serde_json::Value>;

    /// Add and remove labels on a message
    fn modify_message(
        &self,
        id: &MessageId,
        add_labels: &[&str],
        remove_labels: &[&str],
    ) -> Result<ModifyMessageResponse>;

    /// Send a base64url-encoded RFC 822 message
    fn send_message(&self, raw: &str) -> Result<SentMessage>;

    /// Profile of the authenticated account
    fn get_profile(&self) -> Result<ProfileResponse>;
}

impl MailProvider for GmailClient {
    fn list_messages(&self, query: &str, max_results: u32) -> Result<ListMessagesResponse> {
        GmailClient::list_messages(self, query, max_results)
    }

    fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        GmailClient::get_message(self, id)
    }

    fn get_message_raw(&self, id: &MessageId, format: MessageFormat) -> Result<serde_json::Value> {
        GmailClient::get_message_raw(self, id, format)
    }

    fn modify_message(
        &self,
        id: &MessageId,
        add_labels: &[&str],
        remove_labels: &[&str],
    ) -> Result<ModifyMessageResponse> {
        GmailClient::modify_message(self, id, add_labels, remove_labels)
    }

    fn send_message(&self, raw: &str) -> Result<SentMessage> {
        GmailClient::send_message(self, raw)
    }

    fn get_profile(&self) -> Result<ProfileResponse> {
        GmailClient::get_profile(self)
    }
}
