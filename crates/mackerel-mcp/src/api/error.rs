//! Upstream failure taxonomy.

use reqwest::StatusCode;

/// A failed call to the Mackerel API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The API answered with a non-success status.
    #[error("Mackerel API error: {} {body}", .status.as_u16())]
    Http { status: StatusCode, body: String },

    /// The request never produced a response (connect, TLS, I/O).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body was not the JSON shape we expected.
    #[error("failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL cannot carry a path.
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// The upstream status, when the API answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Upstream response body for HTTP failures.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}
