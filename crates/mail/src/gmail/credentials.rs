//! Per-user credential files
//!
//! Each user's OAuth token material lives in `{data_dir}/{user_id}.json`.
//! The pending OAuth `state` value is kept next to them in `state.txt`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::MailError;

/// Seconds before expiry at which a token is treated as expired
const EXPIRY_BUFFER_SECS: i64 = 300;

const STATE_FILE: &str = "state.txt";

/// Token material persisted for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub token: String,
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredCredentials {
    /// Whether the access token can be used as-is
    ///
    /// A token without a recorded expiry is assumed valid.
    pub fn is_valid(&self) -> bool {
        match self.expiry {
            Some(expiry) => expiry.timestamp() > Utc::now().timestamp() + EXPIRY_BUFFER_SECS,
            None => !self.token.is_empty(),
        }
    }

    /// Whether an expired token can be refreshed
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// File-backed credential store rooted at a data directory
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the credential file for `user_id`
    pub fn path_for(&self, user_id: &str) -> Result<PathBuf> {
        validate_user_id(user_id)?;
        Ok(self.dir.join(format!("{}.json", user_id)))
    }

    /// Load credentials for a user, `None` when nothing has been stored yet
    pub fn load(&self, user_id: &str) -> Result<Option<StoredCredentials>> {
        let path = self.path_for(user_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let creds = config::load_json_file(&path)
            .with_context(|| format!("Failed to load credentials for '{}'", user_id))?;
        Ok(Some(creds))
    }

    /// Save credentials for a user, replacing any previous file
    pub fn save(&self, user_id: &str, creds: &StoredCredentials) -> Result<()> {
        let path = self.path_for(user_id)?;
        config::save_json_file(&path, creds)
            .with_context(|| format!("Failed to save credentials for '{}'", user_id))
    }

    /// Persist the OAuth state handed out with the last authorization URL
    pub fn save_state(&self, state: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data directory: {}", self.dir.display()))?;
        let path = self.dir.join(STATE_FILE);
        fs::write(&path, state).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Load the saved OAuth state, empty when none was saved
    pub fn load_state(&self) -> Result<String> {
        let path = self.dir.join(STATE_FILE);
        if !path.exists() {
            return Ok(String::new());
        }
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// User ids become file names, so keep them to a safe character set
fn validate_user_id(user_id: &str) -> Result<()> {
    let ok = !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        && !user_id.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(MailError::invalid_argument(format!("Invalid user id '{}'", user_id)).into())
    }
}
