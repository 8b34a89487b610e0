//! In-memory provider implementation
//!
//! Serves a fixed mailbox from memory and records every mutation. Used for
//! testing the service and the HTTP layer without reaching Google.

use anyhow::Result;
use std::sync::{PoisonError, RwLock};

use super::MailProvider;
use crate::gmail::api::{
    GmailMessage, ListMessagesResponse, MessageRef, ModifyMessageResponse, ProfileResponse,
    SentMessage,
};
use crate::gmail::MessageFormat;
use crate::models::MessageId;
use crate::MailError;

/// In-memory implementation of MailProvider
///
/// Messages are returned in insertion order. Queries are recorded but not
/// evaluated: every list call returns the whole mailbox, truncated to
/// `max_results`.
pub struct InMemoryProvider {
    email_address: String,
    messages: RwLock<Vec<GmailMessage>>,
    queries: RwLock<Vec<String>>,
    modifications: RwLock<Vec<(String, Vec<String>, Vec<String>)>>,
    sent: RwLock<Vec<String>>,
    failure: RwLock<Option<String>>,
}

impl InMemoryProvider {
    /// Create an empty mailbox owned by `email_address`
    pub fn new(email_address: impl Into<String>) -> Self {
        Self {
            email_address: email_address.into(),
            messages: RwLock::new(Vec::new()),
            queries: RwLock::new(Vec::new()),
            modifications: RwLock::new(Vec::new()),
            sent: RwLock::new(Vec::new()),
            failure: RwLock::new(None),
        }
    }

    /// Add a message to the mailbox
    pub fn insert(&self, message: GmailMessage) {
        self.messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    /// Make every subsequent call fail with an upstream error (`None` to recover)
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = message.map(str::to_string);
    }

    /// Queries passed to `list_messages`, oldest first
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `(id, added, removed)` for every `modify_message` call
    pub fn modifications(&self) -> Vec<(String, Vec<String>, Vec<String>)> {
        self.modifications
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Raw payloads passed to `send_message`
    pub fn sent(&self) -> Vec<String> {
        self.sent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_failure(&self) -> Result<()> {
        match self
            .failure
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
        {
            Some(message) => Err(MailError::upstream(message).into()),
            None => Ok(()),
        }
    }

    fn find(&self, id: &MessageId) -> Result<GmailMessage> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|m| m.id == id.as_str())
            .cloned()
            .ok_or_else(|| MailError::upstream("get message failed with HTTP 404").into())
    }
}

impl MailProvider for InMemoryProvider {
    fn list_messages(&self, query: &str, max_results: u32) -> Result<ListMessagesResponse> {
        self.check_failure()?;
        self.queries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());

        let messages = self.messages.read().unwrap_or_else(PoisonError::into_inner);
        let refs: Vec<MessageRef> = messages
            .iter()
            .take(max_results as usize)
            .map(|m| MessageRef {
                id: m.id.clone(),
                thread_id: m.thread_id.clone().unwrap_or_default(),
            })
            .collect();

        Ok(ListMessagesResponse {
            result_size_estimate: Some(refs.len() as u32),
            messages: if refs.is_empty() { None } else { Some(refs) },
            next_page_token: None,
        })
    }

    fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        self.check_failure()?;
        self.find(id)
    }

    fn get_message_raw(&self, id: &MessageId, format: MessageFormat) -> Result<serde_json::Value> {
        self.check_failure()?;
        let mut message = self.find(id)?;
        if format != MessageFormat::Full {
            message.payload = None;
        }
        Ok(serde_json::to_value(message)?)
    }

    fn modify_message(
        &self,
        id: &MessageId,
        add_labels: &[&str],
        remove_labels: &[&str],
    ) -> Result<ModifyMessageResponse> {
        self.check_failure()?;
        let mut messages = self.messages.write().unwrap_or_else(PoisonError::into_inner);
        let message = messages
            .iter_mut()
            .find(|m| m.id == id.as_str())
            .ok_or_else(|| MailError::upstream("modify message failed with HTTP 404"))?;

        let labels = message.label_ids.get_or_insert_with(Vec::new);
        labels.retain(|l| !remove_labels.contains(&l.as_str()));
        for label in add_labels {
            if !labels.iter().any(|l| l.as_str() == *label) {
                labels.push(label.to_string());
            }
        }

        self.modifications
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((
                id.as_str().to_string(),
                add_labels.iter().map(|s| s.to_string()).collect(),
                remove_labels.iter().map(|s| s.to_string()).collect(),
            ));

        Ok(ModifyMessageResponse {
            id: message.id.clone(),
            label_ids: message.label_ids.clone(),
        })
    }

    fn send_message(&self, raw: &str) -> Result<SentMessage> {
        self.check_failure()?;
        let mut sent = self.sent.write().unwrap_or_else(PoisonError::into_inner);
        sent.push(raw.to_string());
        Ok(SentMessage {
            id: format!("sent-{}", sent.len()),
            thread_id: None,
        })
    }

    fn get_profile(&self) -> Result<ProfileResponse> {
        self.check_failure()?;
        Ok(ProfileResponse {
            email_address: self.email_address.clone(),
            messages_total: Some(
                self.messages
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .len() as u64,
            ),
            history_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, labels: &[&str]) -> GmailMessage {
        GmailMessage {
            id: id.to_string(),
            thread_id: Some(format!("t-{}", id)),
            label_ids: Some(labels.iter().map(|s| s.to_string()).collect()),
            snippet: None,
            internal_date: None,
            payload: None,
        }
    }

    #[test]
    fn test_list_truncates_and_records_query() {
        let provider = InMemoryProvider::new("me@example.com");
        provider.insert(message("a", &[]));
        provider.insert(message("b", &[]));

        let list = provider.list_messages("is:unread", 1).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(provider.queries(), vec!["is:unread".to_string()]);
    }

    #[test]
    fn test_modify_updates_labels() {
        let provider = InMemoryProvider::new("me@example.com");
        provider.insert(message("a", &["INBOX", "UNREAD"]));

        let res = provider
            .modify_message(&MessageId::new("a"), &[], &["UNREAD"])
            .unwrap();
        assert_eq!(res.label_ids, Some(vec!["INBOX".to_string()]));
        assert_eq!(provider.modifications().len(), 1);
    }

    #[test]
    fn test_failure_injection() {
        let provider = InMemoryProvider::new("me@example.com");
        provider.fail_with(Some("quota exceeded"));
        assert!(provider.get_profile().is_err());
        provider.fail_with(None);
        assert_eq!(provider.get_profile().unwrap().email_address, "me@example.com");
    }

    #[test]
    fn test_missing_message() {
        let provider = InMemoryProvider::new("me@example.com");
        let err: MailError = provider.get_message(&MessageId::new("nope")).unwrap_err().into();
        assert!(matches!(err, MailError::Upstream { .. }));
    }
}
