//! Error types for feilong-api.

use thiserror::Error;

/// Result type alias for feilong-api operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors that can occur while talking to the cloud connector.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connector URL could not be turned into a request URI
    #[error("invalid connector URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport-level failure (connection refused, reset, ...)
    #[error("request failed: {0}")]
    Request(String),

    /// Connector answered with a non-200 status
    #[error("HTTP status: {status}, body: {body}")]
    Status { status: u16, body: String },

    /// No answer within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Request or response body was not the expected JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Token exchange did not yield an auth token
    #[error("token error: {0}")]
    Token(String),
}

impl ApiError {
    /// HTTP status returned by the connector, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
