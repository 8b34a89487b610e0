//! Mail service
//!
//! Coordinates the provider, the payload parser and the position cache.
//! This is the surface the HTTP layer and the hourly check call into.

use log::{debug, info};
use std::sync::Arc;

use crate::cache::{CacheScope, PositionCaches};
use crate::gmail::api::ListMessagesResponse;
use crate::gmail::{GmailClient, MessageFormat, OutgoingMessage, build_raw_message, parse_message};
use crate::models::{MessageId, ParsedMessage};
use crate::provider::MailProvider;
use crate::MailError;

/// Label IDs used by Gmail for common states
pub mod labels {
    pub const UNREAD: &str = "UNREAD";
}

/// High-level mail operations for the implicit user
pub struct MailService {
    provider: Arc<dyn MailProvider>,
    caches: PositionCaches,
}

impl MailService {
    /// Create a new service
    ///
    /// # Arguments
    /// * `provider` - Remote mailbox (Gmail client or in-memory stand-in)
    /// * `scope` - How position caches are shared between callers
    pub fn new(provider: Arc<dyn MailProvider>, scope: CacheScope) -> Self {
        Self {
            provider,
            caches: PositionCaches::new(scope),
        }
    }

    pub fn cache_scope(&self) -> CacheScope {
        self.caches.scope()
    }

    /// List messages matching `query`, fetch and parse each, and remember the result
    ///
    /// The first ten parsed messages replace the caller's position cache.
    /// Nothing is cached when any fetch fails.
    pub fn list_messages(
        &self,
        query: &str,
        max_results: u32,
        session: Option<&str>,
    ) -> Result<Vec<ParsedMessage>, MailError> {
        validate_max_results(max_results)?;

        let list = self.provider.list_messages(query, max_results)?;
        let refs = list.messages.unwrap_or_default();
        debug!("Query '{}' matched {} messages", query, refs.len());

        let mut parsed = Vec::with_capacity(refs.len());
        for msg_ref in &refs {
            let message = self.provider.get_message(&MessageId::new(&msg_ref.id))?;
            parsed.push(parse_message(&message));
        }

        self.caches.replace(session, parsed.iter().cloned());
        Ok(parsed)
    }

    /// Message at 1-based `position` of the caller's last listing
    pub fn message_by_position(
        &self,
        position: i64,
        session: Option<&str>,
    ) -> Result<ParsedMessage, MailError> {
        Ok(self.caches.get_by_position(session, position)?)
    }

    /// Fetch one message and flatten it
    pub fn get_message(&self, id: &MessageId) -> Result<ParsedMessage, MailError> {
        let message = self.provider.get_message(id)?;
        Ok(parse_message(&message))
    }

    /// Fetch one message in `format` without parsing it
    pub fn get_message_raw(
        &self,
        id: &MessageId,
        format: MessageFormat,
    ) -> Result<serde_json::Value, MailError> {
        Ok(self.provider.get_message_raw(id, format)?)
    }

    /// Mark a message as read by removing the UNREAD label
    pub fn mark_read(&self, id: &MessageId) -> Result<MessageId, MailError> {
        let res = self.provider.modify_message(id, &[], &[labels::UNREAD])?;
        info!("Marked message {} as read", res.id);
        Ok(MessageId::new(res.id))
    }

    /// Compose and send a message, returning the new message's id
    ///
    /// Without an explicit sender the account address from the profile is used.
    pub fn send(&self, message: &OutgoingMessage) -> Result<MessageId, MailError> {
        let default_sender = match message.sender.as_deref() {
            Some(sender) if !sender.trim().is_empty() => String::new(),
            _ => self.provider.get_profile()?.email_address,
        };
        let raw = build_raw_message(message, &default_sender)?;
        let sent = self.provider.send_message(&raw)?;
        info!("Sent message {} to {}", sent.id, message.to);
        Ok(MessageId::new(sent.id))
    }

    /// Run a search and return the provider's list response untouched
    pub fn search(&self, query: &str, max_results: u32) -> Result<ListMessagesResponse, MailError> {
        validate_max_results(max_results)?;
        Ok(self.provider.list_messages(query, max_results)?)
    }
}

fn validate_max_results(max_results: u32) -> Result<(), MailError> {
    if max_results == 0 || max_results > GmailClient::MAX_RESULTS_LIMIT {
        return Err(MailError::invalid_argument(format!(
            "maxResults must be between 1 and {}",
            GmailClient::MAX_RESULTS_LIMIT
        )));
    }
    Ok(())
}
