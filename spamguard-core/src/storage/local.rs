//! Directory-backed blob store: `<root>/<container>/<blob>`.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::{BlobRef, BlobStore};
use crate::error::{Result, SpamError, StorageError};
use crate::persistence;

/// Blob store that keeps every blob as a plain file under a root directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a blob address to a file path, rejecting names that would
    /// escape the root directory.
    pub fn path_for(&self, blob: &BlobRef) -> Result<PathBuf> {
        for part in [&blob.container, &blob.blob] {
            let relative = Path::new(part.as_str());
            let escapes = part.is_empty()
                || relative
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_)));
            if escapes {
                return Err(SpamError::config(format!(
                    "invalid blob address '{blob}'"
                )));
            }
        }
        Ok(self.root.join(&blob.container).join(&blob.blob))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn download(&self, blob: &BlobRef) -> Result<Vec<u8>> {
        let path = self.path_for(blob)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                container: blob.container.clone(),
                blob: blob.blob.clone(),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    async fn upload(&self, blob: &BlobRef, data: Vec<u8>, overwrite: bool) -> Result<()> {
        let path = self.path_for(blob)?;
        if !overwrite && tokio::fs::try_exists(&path).await? {
            return Err(StorageError::AlreadyExists {
                container: blob.container.clone(),
                blob: blob.blob.clone(),
            }
            .into());
        }
        persistence::atomic_write_async(&path, data).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_then_download() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let blob = BlobRef::new("models", "model.json");

        store.upload(&blob, b"{\"a\":1}".to_vec(), true).await.unwrap();
        assert_eq!(store.download(&blob).await.unwrap(), b"{\"a\":1}");
        assert!(dir.path().join("models").join("model.json").exists());
    }

    #[tokio::test]
    async fn test_download_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let err = store
            .download(&BlobRef::new("models", "missing.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, SpamError::Storage(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_upload_without_overwrite_keeps_existing() {
        let dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let blob = BlobRef::new("models", "model.json");

        store.upload(&blob, b"first".to_vec(), false).await.unwrap();
        let err = store.upload(&blob, b"second".to_vec(), false).await.unwrap_err();
        assert!(matches!(
            err,
            SpamError::Storage(StorageError::AlreadyExists { .. })
        ));
        assert_eq!(store.download(&blob).await.unwrap(), b"first");

        store.upload(&blob, b"third".to_vec(), true).await.unwrap();
        assert_eq!(store.download(&blob).await.unwrap(), b"third");
    }

    #[test]
    fn test_path_for_rejects_traversal() {
        let store = LocalBlobStore::new("/srv/blobs");
        assert!(store.path_for(&BlobRef::new("..", "x")).is_err());
        assert!(store.path_for(&BlobRef::new("models", "../../etc/passwd")).is_err());
        assert!(store.path_for(&BlobRef::new("models", "/abs")).is_err());
        assert!(store.path_for(&BlobRef::new("", "x")).is_err());
        assert_eq!(
            store.path_for(&BlobRef::new("models", "v2/model.json")).unwrap(),
            PathBuf::from("/srv/blobs/models/v2/model.json")
        );
    }
}
