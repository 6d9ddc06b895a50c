use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::status::UiError;

/// Shown when a failure carries neither a server detail nor a transport message.
pub const FALLBACK_ERROR_MESSAGE: &str = "An unknown error occurred.";

#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS, TLS, ...).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("request failed with status code {}", .status.as_u16())]
    Status {
        status: StatusCode,
        /// Parsed JSON body, a JSON string for non-JSON bodies, `None` when empty.
        body: Option<Value>,
    },

    /// The request could not be built (bad base URL, empty path parameter, body
    /// serialization failure).
    #[error("{0}")]
    InvalidRequest(String),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// The server-supplied `detail` field of the error body, if any.
    pub fn detail(&self) -> Option<&Value> {
        match self {
            ApiError::Status {
                body: Some(Value::Object(map)),
                ..
            } => map.get("detail").filter(|v| !v.is_null()),
            _ => None,
        }
    }

    /// Message of the transport layer; `None` for errors the server answered.
    pub fn transport_message(&self) -> Option<String> {
        match self {
            ApiError::Transport(e) => Some(e.to_string()),
            ApiError::InvalidRequest(msg) => Some(msg.clone()),
            ApiError::Decode(e) => Some(e.to_string()),
            ApiError::Status { .. } => None,
        }
    }

    /// The error as it should be displayed to the user.
    pub fn ui_error(&self) -> UiError {
        normalize_error(self.detail(), self.transport_message().as_deref())
    }
}

/// Pick the most specific message available: the server's `detail` first, then
/// the transport message, then [`FALLBACK_ERROR_MESSAGE`]. Empty strings count
/// as absent.
pub fn normalize_error(detail: Option<&Value>, transport_message: Option<&str>) -> UiError {
    match detail {
        Some(Value::String(s)) if !s.is_empty() => return UiError::Message(s.clone()),
        Some(Value::Null) | Some(Value::String(_)) | None => {}
        Some(other) => return UiError::Structured(other.clone()),
    }
    match transport_message {
        Some(msg) if !msg.is_empty() => UiError::Message(msg.to_string()),
        _ => UiError::message(FALLBACK_ERROR_MESSAGE),
    }
}
