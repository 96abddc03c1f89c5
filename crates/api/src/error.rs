//! Error shape for backend communication.
//!
//! Whatever goes wrong on the wire, callers see one error type; non-2xx
//! responses surface the server's own human-readable message. No retry or
//! backoff happens anywhere in this crate; a failed operation is reported
//! and must be re-triggered by the operator.

/// Fallback when a non-2xx response body carries no readable message.
pub const GENERIC_REQUEST_ERROR: &str = "request failed";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered non-2xx; the message is the server's own.
    #[error("{0}")]
    Server(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
    #[error("failed to read session file: {0}")]
    SessionRead(#[source] std::io::Error),
    #[error("failed to write session file: {0}")]
    SessionWrite(#[source] std::io::Error),
    #[error("failed to encode session: {0}")]
    SessionEncode(#[source] serde_json::Error),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<ApiError> for lis_core::LabError {
    fn from(err: ApiError) -> Self {
        lis_core::LabError::Backend(err.to_string())
    }
}
