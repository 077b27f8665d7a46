//! Normalization of the service's ad-hoc error payloads.
//!
//! The service does not guarantee a structured error shape: a failure
//! body may be a bare JSON string, a `{"detail": ...}` object whose
//! detail is a string or a validation array, a `{"message"}`/`{"error"}`
//! object, plain text, or nothing at all. Everything is folded into one
//! tagged value at the boundary, before it reaches display or test
//! logic.

use serde_json::Value;

/// Broad classification of a normalized server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The request was rejected by input validation.
    Validation,
    /// The referenced resource does not exist.
    NotFound,
    /// Anything else the service reported.
    Service,
}

/// A server error payload reduced to one displayable form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    /// Classification derived from the HTTP status code.
    pub kind: RemoteErrorKind,
    /// Human-readable message extracted from whatever the body held.
    pub message: String,
}

impl RemoteError {
    /// Normalize a non-2xx response body.
    pub fn from_body(status: u16, body: &str) -> Self {
        let kind = match status {
            404 => RemoteErrorKind::NotFound,
            400 | 422 => RemoteErrorKind::Validation,
            _ => RemoteErrorKind::Service,
        };
        Self {
            kind,
            message: normalize_message(body),
        }
    }
}

/// Reduce an arbitrary error body to one message string.
fn normalize_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no error detail provided".to_string();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => message_from_value(&value).unwrap_or_else(|| trimmed.to_string()),
        // Not JSON at all: the raw text is the message.
        Err(_) => trimmed.to_string(),
    }
}

fn message_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => join_messages(items),
        Value::Object(map) => {
            // FastAPI-style wrapper: {"detail": <string | array>}.
            if let Some(detail) = map.get("detail") {
                return message_from_value(detail);
            }
            for key in ["message", "error", "msg"] {
                if let Some(Value::String(s)) = map.get(key) {
                    return Some(s.clone());
                }
            }
            None
        }
        _ => None,
    }
}

/// Join a validation array (`[{"msg": ...}, ...]` or bare strings) into
/// one `;`-separated message.
fn join_messages(items: &[Value]) -> Option<String> {
    let parts: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.get("msg").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
