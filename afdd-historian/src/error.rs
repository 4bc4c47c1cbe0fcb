//! Error types for the historian adapter.

use thiserror::Error;

/// Errors that can occur when talking to the historian.
#[derive(Debug, Error)]
pub enum HistorianError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The platform answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl From<serde_json::Error> for HistorianError {
    fn from(err: serde_json::Error) -> Self {
        HistorianError::Parse(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for HistorianError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HistorianError::Timeout
        } else if err.is_connect() {
            HistorianError::Connection(err.to_string())
        } else {
            HistorianError::Http(err.to_string())
        }
    }
}
