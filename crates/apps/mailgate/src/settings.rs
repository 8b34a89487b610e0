//! Server settings read from the environment

use mail::{CacheScope, MailError};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the HTTP gateway
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Public base URL, used to build the OAuth redirect
    pub app_url: String,
    pub bind: SocketAddr,
    /// Where per-user tokens and the OAuth state are stored
    pub data_dir: PathBuf,
    pub client_secret_file: PathBuf,
    pub enable_scheduler: bool,
    pub cache_scope: CacheScope,
    pub check_interval: Duration,
    pub workers: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:8000".to_string(),
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            data_dir: PathBuf::from("data"),
            client_secret_file: PathBuf::from("client_secret.json"),
            enable_scheduler: true,
            cache_scope: CacheScope::Global,
            check_interval: Duration::from_secs(3600),
            workers: 4,
        }
    }
}

impl ServerSettings {
    /// Read settings from `APP_URL`, `MAILGATE_*`, `CLIENT_SECRET_FILE` and `ENABLE_SCHEDULER`
    pub fn from_env() -> Result<Self, MailError> {
        let defaults = Self::default();

        let bind = config::env_parse("MAILGATE_BIND", defaults.bind).map_err(config_error)?;
        let cache_scope = config::env_or("MAILGATE_CACHE_SCOPE", "global")
            .parse::<CacheScope>()
            .map_err(MailError::config)?;
        let interval_secs: u64 =
            config::env_parse("MAILGATE_CHECK_INTERVAL_SECS", 3600).map_err(config_error)?;
        if interval_secs == 0 {
            return Err(MailError::config("MAILGATE_CHECK_INTERVAL_SECS must be positive"));
        }
        let workers: usize =
            config::env_parse("MAILGATE_WORKERS", defaults.workers).map_err(config_error)?;

        Ok(Self {
            app_url: config::env_or("APP_URL", &defaults.app_url)
                .trim_end_matches('/')
                .to_string(),
            bind,
            data_dir: PathBuf::from(config::env_or("MAILGATE_DATA_DIR", "data")),
            client_secret_file: PathBuf::from(config::env_or(
                "CLIENT_SECRET_FILE",
                "client_secret.json",
            )),
            enable_scheduler: config::env_flag("ENABLE_SCHEDULER", true),
            cache_scope,
            check_interval: Duration::from_secs(interval_secs),
            workers: workers.max(1),
        })
    }

    /// OAuth callback URL registered with Google
    pub fn redirect_uri(&self) -> String {
        format!("{}/oauth2/callback", self.app_url)
    }
}

fn config_error(e: anyhow::Error) -> MailError {
    MailError::config(format!("{:#}", e))
}
