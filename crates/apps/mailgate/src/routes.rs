//! Request routing and handlers
//!
//! Everything here is independent of the socket: a request comes in as an
//! [`ApiRequest`] and leaves as an [`ApiResponse`], so the whole surface can
//! be tested without binding a port.

use mail::gmail::OutgoingMessage;
use mail::query::{
    KEYWORDS_QUERY, LAST_24_HOURS_QUERY, UNREAD_QUERY, WITH_ATTACHMENTS_QUERY, from_domain_query,
};
use mail::{DEFAULT_USER, GmailAuth, MailService, MessageFormat, MessageId, ParsedMessage};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tiny_http::Method;
use url::Url;

use crate::responses::{ApiError, ApiResponse};

/// Header naming the caller's cache slot when caches are per session
pub const SESSION_HEADER: &str = "X-Session-Id";

const DEFAULT_LIST_MAX: u32 = 3;
const DEFAULT_PRESET_MAX: u32 = 10;
const DEFAULT_KEYWORDS_MAX: u32 = 50;

/// Shared state handed to every handler
pub struct AppState {
    pub service: Arc<MailService>,
    pub auth: Arc<GmailAuth>,
}

/// An incoming request stripped down to what the handlers need
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path and query, as sent on the request line
    pub url: String,
    pub session: Option<String>,
    pub body: Vec<u8>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            session: None,
            body: Vec::new(),
        }
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// Known endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Health,
    Login,
    Callback,
    ListMessages,
    MessageByPosition(String),
    MessageById(String),
    MarkRead(String),
    Send,
    PresetLast24,
    PresetAttachments,
    PresetDomain,
    SearchKeywords,
}

impl Route {
    fn resolve(segments: &[&str]) -> Option<Self> {
        let route = match segments {
            ["health"] => Route::Health,
            ["auth", "login"] => Route::Login,
            ["oauth2", "callback"] => Route::Callback,
            ["messages"] => Route::ListMessages,
            ["messages", "position", n] => Route::MessageByPosition(n.to_string()),
            ["messages", id] => Route::MessageById(id.to_string()),
            ["messages", id, "mark_read" | "read"] => Route::MarkRead(id.to_string()),
            ["send"] => Route::Send,
            ["presets", "last24"] => Route::PresetLast24,
            ["presets", "attachments"] => Route::PresetAttachments,
            ["presets", "domain"] => Route::PresetDomain,
            ["search", "keywords"] => Route::SearchKeywords,
            _ => return None,
        };
        Some(route)
    }

    fn method(&self) -> Method {
        match self {
            Route::MarkRead(_) | Route::Send => Method::Post,
            _ => Method::Get,
        }
    }
}

/// Dispatch a request and always produce a response
pub fn handle(state: &AppState, request: &ApiRequest) -> ApiResponse {
    match dispatch(state, request) {
        Ok(response) => response,
        Err(e) => e.into(),
    }
}

fn dispatch(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let url = Url::parse(&format!("http://localhost{}", request.url))
        .map_err(|_| ApiError::bad_request("Malformed request URL"))?;
    let decoded = url
        .path_segments()
        .map(|s| {
            s.filter(|seg| !seg.is_empty())
                .map(urlencoding::decode)
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()
        .map_err(|_| ApiError::bad_request("Path is not valid UTF-8"))?
        .unwrap_or_default();
    let segments: Vec<&str> = decoded.iter().map(|s| s.as_ref()).collect();
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    let route = Route::resolve(&segments).ok_or_else(ApiError::not_found)?;
    if request.method != route.method() {
        return Err(ApiError::method_not_allowed());
    }

    let session = request.session.as_deref();
    match route {
        Route::Health => Ok(ApiResponse::ok(json!({ "status": "ok" }))),
        Route::Login => login(state),
        Route::Callback => callback(state, &params),
        Route::ListMessages => {
            let query = params.get("q").map_or(UNREAD_QUERY, String::as_str);
            let max = max_results(&params, DEFAULT_LIST_MAX)?;
            let messages = state.service.list_messages(query, max, session)?;
            Ok(ApiResponse::ok(to_json(&messages)?))
        }
        Route::MessageByPosition(raw) => {
            let position: i64 = raw
                .parse()
                .map_err(|_| ApiError::bad_request(format!("Invalid position '{}'", raw)))?;
            let message = state.service.message_by_position(position, session)?;
            Ok(ApiResponse::ok(to_json(&message)?))
        }
        Route::MessageById(id) => message_by_id(state, &MessageId::new(id), &params),
        Route::MarkRead(id) => {
            let id = state.service.mark_read(&MessageId::new(id))?;
            Ok(ApiResponse::ok(json!({ "status": "ok", "id": id })))
        }
        Route::Send => {
            let outgoing: OutgoingMessage = serde_json::from_slice(&request.body)
                .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;
            let id = state.service.send(&outgoing)?;
            Ok(ApiResponse::ok(json!({ "status": "sent", "id": id })))
        }
        Route::PresetLast24 => search(state, LAST_24_HOURS_QUERY, &params, DEFAULT_PRESET_MAX),
        Route::PresetAttachments => {
            search(state, WITH_ATTACHMENTS_QUERY, &params, DEFAULT_PRESET_MAX)
        }
        Route::PresetDomain => {
            let domain = params
                .get("domain")
                .map(|d| d.trim())
                .filter(|d| !d.is_empty())
                .ok_or_else(|| ApiError::bad_request("Missing required parameter 'domain'"))?;
            search(state, &from_domain_query(domain), &params, DEFAULT_PRESET_MAX)
        }
        Route::SearchKeywords => search(state, KEYWORDS_QUERY, &params, DEFAULT_KEYWORDS_MAX),
    }
}

fn login(state: &AppState) -> Result<ApiResponse, ApiError> {
    let url = state.auth.begin_login()?;
    Ok(ApiResponse::redirect(url))
}

fn callback(state: &AppState, params: &HashMap<String, String>) -> Result<ApiResponse, ApiError> {
    if let Some(error) = params.get("error") {
        return Err(ApiError::bad_request(format!("OAuth error: {}", error)));
    }
    let state_param = params.get("state").map_or("", String::as_str);
    let code = params.get("code").map_or("", String::as_str);
    state.auth.complete_login(state_param, code, DEFAULT_USER)?;
    Ok(ApiResponse::ok(json!({ "status": "ok" })))
}

fn message_by_id(
    state: &AppState,
    id: &MessageId,
    params: &HashMap<String, String>,
) -> Result<ApiResponse, ApiError> {
    let fmt = params.get("fmt").map_or("full", String::as_str);
    match fmt.parse::<MessageFormat>() {
        Ok(format @ (MessageFormat::Raw | MessageFormat::Metadata)) => {
            Ok(ApiResponse::ok(state.service.get_message_raw(id, format)?))
        }
        _ => {
            let message = state.service.get_message(id)?;
            Ok(ApiResponse::ok(with_header_object(&message)?))
        }
    }
}

fn search(
    state: &AppState,
    query: &str,
    params: &HashMap<String, String>,
    default_max: u32,
) -> Result<ApiResponse, ApiError> {
    let max = max_results(params, default_max)?;
    let list = state.service.search(query, max)?;
    Ok(ApiResponse::ok(to_json(&list)?))
}

fn max_results(params: &HashMap<String, String>, default: u32) -> Result<u32, ApiError> {
    match params.get("maxResults") {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ApiError::bad_request("maxResults must be a positive integer")),
        None => Ok(default),
    }
}

/// Serialize a parsed message with its headers folded into a name to value map
///
/// Repeated header names keep the last value.
fn with_header_object(message: &ParsedMessage) -> Result<Value, ApiError> {
    let mut value = to_json(message)?;
    let headers: Map<String, Value> = message
        .headers
        .iter()
        .map(|h| (h.name.clone(), Value::String(h.value.clone())))
        .collect();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("headers".to_string(), Value::Object(headers));
    }
    Ok(value)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError {
        status: 500,
        detail: format!("Failed to serialize response: {}", e),
    })
}
