//! HTTP blob store backend.
//!
//! Talks to a remote blob service over the reference endpoints:
//! `POST /upload/{folder}` stores a blob and returns its opaque path in
//! the response body, `GET /{path}` reads it back, and
//! `DELETE /upload?path=...` removes it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::{BlobError, Result};
use crate::BlobStore;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A blob store backed by a remote HTTP blob service.
pub struct HttpBlobStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBlobStore {
    /// Create a store against the service at `base_url`
    /// (e.g. `http://blobs.internal:9000`).
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized, which indicates a
    /// broken build environment.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, bytes: &[u8], name: &str, folder: &str) -> Result<String> {
        let url = format!("{}/upload/{folder}", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("name", name)])
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| BlobError::Http(e.to_string()))?;

        if response.status() == StatusCode::CONFLICT {
            return Err(BlobError::AlreadyExists(format!("{folder}/{name}")));
        }
        if !response.status().is_success() {
            return Err(BlobError::Http(format!(
                "upload returned {}",
                response.status()
            )));
        }

        let path = response
            .text()
            .await
            .map_err(|e| BlobError::Http(e.to_string()))?
            .trim()
            .to_string();
        tracing::debug!(path = %path, size = bytes.len(), "Uploaded blob");
        Ok(path)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BlobError::Http(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound(path.to_string()));
        }
        if !response.status().is_success() {
            return Err(BlobError::Http(format!(
                "read returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BlobError::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let url = format!("{}/upload", self.base_url);
        let response = self
            .client
            .delete(&url)
            .query(&[("path", path)])
            .send()
            .await
            .map_err(|e| BlobError::Http(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(BlobError::Http(format!("delete returned {status}"))),
        }
    }
}
