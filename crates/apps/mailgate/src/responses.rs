//! HTTP response values produced by the route handlers
//!
//! Handlers return plain data; the server turns it into a `tiny_http`
//! response. Errors always carry a JSON body of the form `{"detail": ...}`.

use log::warn;
use mail::MailError;
use serde_json::{Value, json};
use std::io::Cursor;
use tiny_http::{Header, Response};

/// Response produced by a handler
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
    /// Target of a redirect, sent as `Location`
    pub location: Option<String>,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body,
            location: None,
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: 302,
            body: Value::Null,
            location: Some(location.into()),
        }
    }

    /// Convert into a `tiny_http` response
    pub fn into_http(self) -> Response<Cursor<Vec<u8>>> {
        let mut response = if self.body.is_null() {
            Response::from_data(Vec::new())
        } else {
            let mut response = Response::from_data(self.body.to_string().into_bytes());
            if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
                response.add_header(header);
            }
            response
        };
        if let Some(location) = self.location
            && let Ok(header) = Header::from_bytes("Location", location.as_bytes())
        {
            response.add_header(header);
        }
        response.with_status_code(self.status)
    }
}

/// Error reply with its status code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: 400,
            detail: detail.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            detail: "Not Found".to_string(),
        }
    }

    pub fn payload_too_large() -> Self {
        Self {
            status: 413,
            detail: "Request body too large".to_string(),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            status: 405,
            detail: "Method Not Allowed".to_string(),
        }
    }
}

impl From<MailError> for ApiError {
    fn from(e: MailError) -> Self {
        let status = match &e {
            MailError::OutOfRange { .. } | MailError::InvalidArgument { .. } => 400,
            MailError::Unauthorized => 401,
            MailError::Upstream { .. } => {
                warn!("{}", e);
                502
            }
            MailError::Config { .. } => 500,
        };
        Self {
            status,
            detail: e.to_string(),
        }
    }
}

impl From<ApiError> for ApiResponse {
    fn from(e: ApiError) -> Self {
        Self {
            status: e.status,
            body: json!({ "detail": e.detail }),
            location: None,
        }
    }
}
