//! Mail crate - Business logic for the Gmail gateway
//!
//! This crate provides:
//! - Gmail API client, OAuth web flow and per-user credential storage
//! - MIME payload flattening into plain text, HTML and attachment metadata
//! - Position cache of the last listed messages
//! - Outgoing message composition
//! - Canned search queries and the hourly keyword check
//!
//! It has no HTTP server dependencies; the `mailgate` binary exposes it.

pub mod cache;
pub mod config;
pub mod error;
pub mod gmail;
pub mod models;
pub mod provider;
pub mod query;
pub mod service;
pub mod sync;

pub use cache::{CacheError, CacheScope, POSITION_CACHE_CAPACITY, PositionCache, PositionCaches};
pub use config::GmailCredentials;
pub use error::MailError;
pub use gmail::{
    CredentialStore, DEFAULT_USER, GmailAuth, GmailClient, MessageFormat, OutgoingMessage,
    StoredCredentials, api::ProfileResponse, html_to_text, parse_message, parse_payload,
};
pub use models::{Attachment, MessageId, ParsedMessage, ThreadId};
pub use provider::{InMemoryProvider, MailProvider};
pub use service::MailService;
pub use sync::{Scheduler, hourly_check, run_hourly_check};
