//! HTTP server loop
//!
//! A fixed pool of worker threads pulls requests from one `tiny_http`
//! listener. Workers poll with a short timeout so they notice shutdown.

use anyhow::{Result, anyhow};
use log::{debug, error, info};
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tiny_http::{Request, Server};

use crate::responses::ApiError;
use crate::routes::{self, ApiRequest, AppState, SESSION_HEADER};
use crate::settings::ServerSettings;

const RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Largest request body accepted; `/send` payloads are small JSON documents
pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Serve requests until `running` is cleared
pub fn serve(settings: &ServerSettings, state: Arc<AppState>, running: Arc<AtomicBool>) -> Result<()> {
    let server = Server::http(settings.bind)
        .map_err(|e| anyhow!("Failed to bind HTTP server on {}: {}", settings.bind, e))?;
    let server = Arc::new(server);
    info!("Listening on http://{} ({} workers)", settings.bind, settings.workers);

    let handles = (0..settings.workers)
        .map(|i| {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name(format!("http-worker-{}", i))
                .spawn(move || worker_loop(&server, &state, &running))
        })
        .collect::<std::io::Result<Vec<_>>>()?;

    for handle in handles {
        if handle.join().is_err() {
            error!("HTTP worker panicked");
        }
    }
    info!("HTTP server stopped");
    Ok(())
}

fn worker_loop(server: &Server, state: &AppState, running: &AtomicBool) {
    while running.load(Ordering::SeqCst) {
        match server.recv_timeout(RECV_TIMEOUT) {
            Ok(Some(request)) => respond(state, request),
            Ok(None) => continue,
            Err(e) => {
                error!("Failed to receive request: {}", e);
                break;
            }
        }
    }
}

fn respond(state: &AppState, mut request: Request) {
    let started = Instant::now();

    let body = match request.body_length() {
        Some(len) if len as u64 > MAX_BODY_BYTES => Err(ApiError::payload_too_large()),
        _ => read_body(request.as_reader(), MAX_BODY_BYTES),
    };
    let session = request
        .headers()
        .iter()
        .find(|h| h.field.equiv(SESSION_HEADER))
        .map(|h| h.value.as_str().to_string());

    let mut api_request = ApiRequest {
        method: request.method().clone(),
        url: request.url().to_string(),
        session,
        body: Vec::new(),
    };
    let response = match body {
        Ok(body) => {
            api_request.body = body;
            routes::handle(state, &api_request)
        }
        Err(e) => e.into(),
    };

    info!(
        "{} {} {} {}ms",
        api_request.method,
        path_of(&api_request.url),
        response.status,
        started.elapsed().as_millis()
    );
    if let Err(e) = request.respond(response.into_http()) {
        debug!("Failed to write response: {}", e);
    }
}

/// Read at most `limit` bytes of body, failing with 413 when there is more
fn read_body(reader: &mut dyn Read, limit: u64) -> Result<Vec<u8>, ApiError> {
    let mut body = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut body)
        .map_err(|e| ApiError::bad_request(format!("Failed to read request body: {}", e)))?;
    if body.len() as u64 > limit {
        return Err(ApiError::payload_too_large());
    }
    Ok(body)
}

/// Request path without the query string, which may carry OAuth codes
fn path_of(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}
