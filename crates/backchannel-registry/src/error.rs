//! Error types for the registry storage layer.

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during registry storage operations.
///
/// Store errors abort the in-progress open or close; they never poison
/// the registry, because nothing is cached and the next operation
/// re-reads the truth.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization or deserialization of a record failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}
