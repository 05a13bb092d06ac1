//! Error types for the correlator.

use backchannel_core::{ConnectionId, RequestId};
use thiserror::Error;

/// A result type using `HubError`.
pub type Result<T> = std::result::Result<T, HubError>;

/// Errors surfaced by hub operations.
#[derive(Debug, Error)]
pub enum HubError {
    /// No admission permit could be acquired in time. The caller may
    /// retry later.
    #[error("too many concurrent requests; try again later")]
    Overloaded,

    /// The resolved connection set is empty.
    #[error("no connected target for this call")]
    NoTarget,

    /// The explicitly targeted connection is not active.
    #[error("connection {0} is not active")]
    InactiveConnection(ConnectionId),

    /// No reply arrived before the deadline. The caller may retry.
    #[error("request timed out")]
    Timeout,

    /// The caller signalled cancellation.
    #[error("request was cancelled")]
    Cancelled,

    /// A freshly generated request ID collided with a pending one. This
    /// is a bug guard, not a retryable condition.
    #[error("request id collision: {0}")]
    RequestIdCollision(RequestId),

    /// The reply referenced a blob that could not be read.
    #[error("response blob missing: {0}")]
    BlobMissing(String),

    /// The reply payload did not match the requested type.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The peer's executor returned an error. This is a first-class
    /// outcome, not a transport failure.
    #[error("client error: {0}")]
    Client(String),

    /// The durable registry store rejected an operation.
    #[error("storage error: {0}")]
    Store(#[from] backchannel_registry::StoreError),

    /// The blob side-channel failed for a reason other than a missing
    /// blob.
    #[error("blob error: {0}")]
    Blob(#[from] backchannel_blob::BlobError),
}

impl HubError {
    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Overloaded | Self::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_kinds() {
        assert!(HubError::Overloaded.is_retriable());
        assert!(HubError::Timeout.is_retriable());
        assert!(!HubError::NoTarget.is_retriable());
        assert!(!HubError::Cancelled.is_retriable());
        assert!(!HubError::Client("boom".into()).is_retriable());
    }
}
