//! Error types for the hub client.

use thiserror::Error;

/// A result type using `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur in the hub client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Failed to connect to the hub.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Failed to send a frame.
    #[error("send failed: {0}")]
    Send(String),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
