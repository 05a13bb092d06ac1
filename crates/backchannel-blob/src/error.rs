//! Error types for the blob side-channel.

use thiserror::Error;

/// A result type using `BlobError`.
pub type Result<T> = std::result::Result<T, BlobError>;

/// Errors that can occur during blob operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The requested blob does not exist.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// A blob with this name already exists; uploads never overwrite.
    #[error("blob already exists: {0}")]
    AlreadyExists(String),

    /// The supplied name or folder would escape the store root.
    #[error("invalid blob name: {0}")]
    InvalidName(String),

    /// A filesystem error occurred.
    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),

    /// An HTTP backend error occurred.
    #[error("blob http error: {0}")]
    Http(String),
}
