//! Gmail OAuth2 authentication
//!
//! Implements the OAuth2 authorization code flow for a web application:
//! the server redirects the browser to Google, Google redirects back to
//! `{APP_URL}/oauth2/callback`, and the code is exchanged for tokens.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use base64::prelude::*;
use chrono::Utc;
use log::{debug, info};
use rand::RngCore;
use serde::Deserialize;

use super::credentials::{CredentialStore, StoredCredentials};
use crate::config::GmailCredentials;
use crate::MailError;

/// Implicit single user the service acts for
pub const DEFAULT_USER: &str = "me";

/// OAuth2 configuration and token management for Gmail
pub struct GmailAuth {
    client: Option<GmailCredentials>,
    redirect_uri: String,
    store: CredentialStore,
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
    #[allow(dead_code)]
    token_type: String,
}

impl GmailAuth {
    /// Gmail API OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Read, send and label changes
    pub const SCOPES: [&'static str; 3] = [
        "https://www.googleapis.com/auth/gmail.readonly",
        "https://www.googleapis.com/auth/gmail.send",
        "https://www.googleapis.com/auth/gmail.modify",
    ];

    /// Create a new GmailAuth instance
    ///
    /// # Arguments
    /// * `client` - OAuth2 client credentials, `None` when no client secret is configured
    /// * `redirect_uri` - Callback URL registered in Google Cloud Console
    /// * `store` - Where per-user tokens and the OAuth state are kept
    pub fn new(
        client: Option<GmailCredentials>,
        redirect_uri: impl Into<String>,
        store: CredentialStore,
    ) -> Self {
        Self {
            client,
            redirect_uri: redirect_uri.into(),
            store,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    fn client(&self) -> Result<&GmailCredentials, MailError> {
        self.client
            .as_ref()
            .ok_or_else(|| MailError::config("client_secret.json not found"))
    }

    /// Build the Google consent URL for the given state
    pub fn authorization_url(&self, state: &str) -> Result<String, MailError> {
        let client = self.client()?;
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&include_granted_scopes=true&prompt=consent&state={}",
            Self::AUTH_URL,
            urlencoding::encode(&client.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&Self::SCOPES.join(" ")),
            urlencoding::encode(state),
        ))
    }

    /// Start a login: generate and save a fresh state, return the consent URL
    pub fn begin_login(&self) -> Result<String, MailError> {
        // Fail before touching the state file when no client is configured
        self.client()?;
        let state = random_state();
        self.store
            .save_state(&state)
            .context("Failed to persist OAuth state")?;
        self.authorization_url(&state)
    }

    /// Finish a login: check the state, exchange the code and store tokens for `user_id`
    ///
    /// The state is only compared when both the received and the saved value are non-empty.
    pub fn complete_login(&self, state: &str, code: &str, user_id: &str) -> Result<(), MailError> {
        let saved_state = self.store.load_state()?;
        if !state.is_empty() && !saved_state.is_empty() && state != saved_state {
            return Err(MailError::invalid_argument("Invalid OAuth state"));
        }
        if code.is_empty() {
            return Err(MailError::invalid_argument("No authorization code received"));
        }

        let token = self.exchange_code(code)?;
        let client = self.client()?;
        let creds = StoredCredentials {
            token: token.access_token,
            refresh_token: token.refresh_token,
            token_uri: Self::TOKEN_URL.to_string(),
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            scopes: token
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_else(|| Self::SCOPES.iter().map(|s| s.to_string()).collect()),
            expiry: token
                .expires_in
                .map(|d| Utc::now() + chrono::Duration::seconds(d as i64)),
        };
        self.store.save(user_id, &creds)?;
        info!("Stored Gmail credentials for '{}'", user_id);
        Ok(())
    }

    /// Get a usable access token for `user_id`, refreshing it when expired
    ///
    /// Fails with [`MailError::Unauthorized`] when nothing is stored for the user.
    pub fn access_token(&self, user_id: &str) -> Result<String> {
        let mut creds = self.store.load(user_id)?.ok_or(MailError::Unauthorized)?;

        if !creds.is_valid() && creds.can_refresh() {
            debug!("Access token for '{}' expired, refreshing", user_id);
            let token = self.refresh_access_token(&creds)?;
            creds.token = token.access_token;
            if let Some(refresh) = token.refresh_token {
                creds.refresh_token = Some(refresh);
            }
            creds.expiry = token
                .expires_in
                .map(|d| Utc::now() + chrono::Duration::seconds(d as i64));
            self.store.save(user_id, &creds)?;
        }

        Ok(creds.token)
    }

    /// Check if the user has stored credentials
    pub fn is_authenticated(&self, user_id: &str) -> bool {
        matches!(self.store.load(user_id), Ok(Some(_)))
    }

    /// Exchange an authorization code for tokens
    fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let client = self.client()?;
        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .context("Failed to exchange authorization code")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;

        Ok(token)
    }

    /// Refresh an access token using the stored refresh token
    fn refresh_access_token(&self, creds: &StoredCredentials) -> Result<TokenResponse> {
        let refresh_token = creds.refresh_token.as_deref().unwrap_or_default();
        let token_uri = if creds.token_uri.is_empty() {
            Self::TOKEN_URL
        } else {
            creds.token_uri.as_str()
        };

        let response = ureq::post(token_uri)
            .send_form([
                ("client_id", creds.client_id.as_str()),
                ("client_secret", creds.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        let token: TokenResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")?;

        Ok(token)
    }
}

/// Generate a URL-safe random state value (128 bits)
fn random_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}
