//! Error taxonomy surfaced by the mail service
//!
//! Library internals work with `anyhow::Result` and attach context at every
//! I/O step. At the service boundary errors are folded into [`MailError`] so
//! callers can tell validation problems, missing authorization and provider
//! failures apart without string matching.

use crate::cache::CacheError;

/// Errors returned by [`crate::MailService`] and the OAuth flow
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Position lookup against an empty cache or outside its bounds
    #[error("{message}")]
    OutOfRange { message: String },

    /// No stored credential for the user
    #[error("Not authorized. Open /auth/login.")]
    Unauthorized,

    #[error("{message}")]
    InvalidArgument { message: String },

    /// The provider (or its token endpoint) returned an error
    #[error("Gmail API error: {message}")]
    Upstream { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl MailError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for MailError {
    fn from(e: anyhow::Error) -> Self {
        // A MailError raised deep inside a context chain keeps its variant
        match e.downcast::<MailError>() {
            Ok(err) => err,
            Err(e) => MailError::Upstream {
                message: format!("{:#}", e),
            },
        }
    }
}

impl From<CacheError> for MailError {
    fn from(e: CacheError) -> Self {
        MailError::OutOfRange {
            message: e.to_string(),
        }
    }
}
