//! Blob side-channel for the backchannel RPC fabric.
//!
//! Responses that would not fit comfortably inside a transport frame are
//! diverted through this store: the client uploads the encoded payload
//! and replies with an opaque path; the server reads (and, for temp
//! blobs, deletes) it while decoding.
//!
//! Two backends are provided:
//!
//! - [`FsBlobStore`] — a local folder, the default
//! - [`HttpBlobStore`] — `POST /upload/{folder}` / `DELETE /upload?path=`
//!   against a remote blob service
//!
//! Paths produced by one side are addressable by the other, so both ends
//! of a deployment must be configured with the same backend.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod fs;
pub mod http;

pub use error::{BlobError, Result};
pub use fs::FsBlobStore;
pub use http::HttpBlobStore;

use async_trait::async_trait;

/// Storage for opaque byte blobs keyed by path.
///
/// Implementations must guarantee that a path returned by `upload` is
/// readable by `read` within the same hub deployment, and must never
/// silently overwrite an existing blob (uploaders supply uniqueness via
/// fresh names).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `folder/name` and return the opaque path.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be stored, including when a
    /// blob with the same name already exists.
    async fn upload(&self, bytes: &[u8], name: &str, folder: &str) -> Result<String>;

    /// Read the blob at `path`.
    ///
    /// # Errors
    ///
    /// Returns `BlobError::NotFound` if the blob is absent.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete the blob at `path`.
    ///
    /// Returns `false` when the blob was already absent.
    ///
    /// # Errors
    ///
    /// Returns an error only for backend failures, not for missing blobs.
    async fn delete(&self, path: &str) -> Result<bool>;
}
