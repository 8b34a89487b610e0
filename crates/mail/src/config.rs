//! Configuration loading for mail services
//!
//! Supports loading OAuth client credentials from (in order of priority):
//! 1. Compile-time embedded credentials (for production builds)
//! 2. An explicit client secret JSON file (Google Cloud Console format)
//! 3. The same file in the mailgate config directory
//! 4. Runtime environment variables (fallback)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Credentials filename in the mailgate config directory
const CREDENTIALS_FILE: &str = "client_secret.json";

/// OAuth credentials for Gmail API access
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    web: Option<ClientSection>,
    installed: Option<ClientSection>,
}

#[derive(Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials using the following priority:
    /// 1. Compile-time embedded credentials (for production builds)
    /// 2. `explicit_file`, when given and present
    /// 3. JSON file (~/.config/mailgate/client_secret.json)
    /// 4. Runtime environment variables
    pub fn load(explicit_file: Option<&Path>) -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if let Some(path) = explicit_file
            && path.exists()
        {
            return Self::from_file(path);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Load credentials embedded at compile time via environment variables.
    /// Build with: GOOGLE_CLIENT_ID=xxx GOOGLE_CLIENT_SECRET=yyy cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID")?;
        let client_secret = option_env!("GOOGLE_CLIENT_SECRET")?;

        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    /// Parse credentials from a GoogleCredentialFile
    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // A redirect-based flow needs a "web" client, "installed" also works for localhost
        let section = creds
            .web
            .or(creds.installed)
            .context("Credentials file missing 'web' or 'installed' section")?;

        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
        })
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Get the default credentials file path (~/.config/mailgate/client_secret.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}
