//! Local-folder blob store, the default backend.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{BlobError, Result};
use crate::BlobStore;

/// A blob store rooted at a local directory.
///
/// Blobs live at `<root>/<folder>/<name>` and the opaque path handed to
/// peers is `<folder>/<name>`, so both sides of a hub process resolve the
/// same bytes.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `root`. The directory is created lazily
    /// on first upload.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an opaque path under the root, refusing traversal.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || path.is_empty() {
            return Err(BlobError::InvalidName(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.contains(['/', '\\'])
        && segment != "."
        && segment != ".."
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, bytes: &[u8], name: &str, folder: &str) -> Result<String> {
        if !valid_segment(name) {
            return Err(BlobError::InvalidName(name.to_string()));
        }
        if !valid_segment(folder) {
            return Err(BlobError::InvalidName(folder.to_string()));
        }

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;

        let target = dir.join(name);
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(BlobError::AlreadyExists(format!("{folder}/{name}")));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(bytes).await?;
        file.flush().await?;

        let path = format!("{folder}/{name}");
        tracing::debug!(path = %path, size = bytes.len(), "Stored blob");
        Ok(path)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => {
                tracing::debug!(path = %path, "Deleted blob");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
