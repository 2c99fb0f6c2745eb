//! Backend client error types.

use std::time::Duration;

use thiserror::Error;

/// Result type for backend operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the capture backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or unreachable backend
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-success status with the backend's `detail` message
    #[error("Backend error ({status}): {detail}")]
    Backend { status: u16, detail: String },

    /// Input rejected before any request was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Batch operation where only some items succeeded
    #[error("Partial failure: {deleted} succeeded, {} failed", .errors.len())]
    PartialFailure { deleted: u32, errors: Vec<String> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Build an error from an HTTP status and the backend's detail text.
    pub fn from_http_status(status: u16, detail: impl Into<String>) -> Self {
        Self::Backend {
            status,
            detail: detail.into(),
        }
    }

    /// Map a reqwest error, separating timeouts from other transport errors.
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Network(err)
        }
    }

    /// Check if the operation may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(e) => !e.is_builder(),
            ClientError::Timeout(_) => true,
            ClientError::Backend { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// True for failures where the backend never answered.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Timeout(_))
    }

    /// HTTP status carried by the error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ClientError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Operator facing message: the backend detail when there is one.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Backend { detail, .. } => detail.clone(),
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Network(_) | ClientError::Timeout(_) => {
                format!("Error connecting to server: {}", self)
            }
            other => other.to_string(),
        }
    }
}

/// Extract the `detail` text from an error body.
///
/// FastAPI-style bodies carry `{"detail": "..."}`; validation failures
/// carry a list there instead. Falls back to the raw body.
pub fn detail_from_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => map
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string()),
        },
        _ => body.trim().to_string(),
    }
}
