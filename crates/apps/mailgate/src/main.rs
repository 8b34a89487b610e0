//! mailgate - HTTP gateway to a Gmail mailbox
//!
//! Exposes listing, search, position lookups, mark-as-read and send over a
//! small JSON API, and optionally runs an hourly keyword check.

use anyhow::{Context, Result};
use log::{error, info, warn};
use mail::{
    CredentialStore, DEFAULT_USER, GmailAuth, GmailClient, GmailCredentials, MailService, Scheduler,
    run_hourly_check,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

mod responses;
mod routes;
mod server;
mod settings;

use routes::AppState;
use settings::ServerSettings;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let settings = ServerSettings::from_env()?;

    let client = match GmailCredentials::load(Some(settings.client_secret_file.as_path())) {
        Ok(creds) => Some(creds),
        Err(e) => {
            warn!("Gmail client credentials not found: {:#}", e);
            warn!(
                "Place a Google OAuth client file at {} or set GMAIL_CLIENT_ID and GMAIL_CLIENT_SECRET",
                settings.client_secret_file.display()
            );
            None
        }
    };

    let auth = Arc::new(GmailAuth::new(
        client,
        settings.redirect_uri(),
        CredentialStore::new(&settings.data_dir),
    ));
    if auth.is_authenticated(DEFAULT_USER) {
        info!("Using stored Gmail credentials from {}", settings.data_dir.display());
    } else {
        warn!("No stored Gmail credentials yet, open {}/auth/login", settings.app_url);
    }
    let gmail = Arc::new(GmailClient::new(Arc::clone(&auth)));
    let service = Arc::new(MailService::new(gmail, settings.cache_scope));
    info!(
        "Gmail gateway ready (cache scope {:?}, data dir {})",
        service.cache_scope(),
        settings.data_dir.display()
    );

    let mut scheduler = if settings.enable_scheduler {
        let service = Arc::clone(&service);
        Some(Scheduler::start("hourly-check", settings.check_interval, move || {
            run_hourly_check(&service)?;
            Ok(())
        })?)
    } else {
        info!("Scheduler disabled");
        None
    };

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let state = Arc::new(AppState { service, auth });
    let result = server::serve(&settings, state, running);

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown();
    }
    result
}
