//! Blob storage abstraction.
//!
//! The Predictor and Retrainer only ever talk to storage through
//! [`BlobStore`]: download a blob's bytes, upload bytes with an explicit
//! overwrite flag. Two implementations are provided: [`AzureBlobStore`]
//! (Azure Blob REST API with Shared Key auth) and [`LocalBlobStore`]
//! (a directory tree, for development and tests).

pub mod azure;
pub mod local;

pub use azure::{AzureBlobStore, ConnectionString, SharedKeyCredential};
pub use local::LocalBlobStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{Result, SpamError, StorageError};
use crate::persistence;

/// A (container, blob) address inside a blob store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef {
    pub container: String,
    pub blob: String,
}

impl BlobRef {
    pub fn new(container: impl Into<String>, blob: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            blob: blob.into(),
        }
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.blob)
    }
}

/// Trait for reading and writing whole blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Download the full contents of a blob.
    async fn download(&self, blob: &BlobRef) -> Result<Vec<u8>>;

    /// Upload bytes to a blob. With `overwrite == false` an existing blob
    /// is left untouched and [`StorageError::AlreadyExists`] is returned.
    async fn upload(&self, blob: &BlobRef, data: Vec<u8>, overwrite: bool) -> Result<()>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;

    /// Download a blob and atomically replace `path` with its contents.
    /// Returns the number of bytes written.
    async fn download_to_file(&self, blob: &BlobRef, path: &Path) -> Result<u64> {
        let data = self.download(blob).await?;
        let len = data.len() as u64;
        persistence::atomic_write_async(path, data).await?;
        tracing::info!(blob = %blob, path = %path.display(), bytes = len, "Downloaded blob");
        Ok(len)
    }

    /// Upload the contents of a local file. Returns the number of bytes sent.
    async fn upload_from_file(&self, path: &Path, blob: &BlobRef, overwrite: bool) -> Result<u64> {
        let data = tokio::fs::read(path).await?;
        let len = data.len() as u64;
        self.upload(blob, data, overwrite).await?;
        tracing::info!(blob = %blob, path = %path.display(), bytes = len, "Uploaded blob");
        Ok(len)
    }
}

/// Build the blob store selected by the storage configuration.
pub fn build_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    match config.backend {
        StorageBackend::Local => Ok(Arc::new(LocalBlobStore::new(&config.local_root))),
        StorageBackend::Azure => {
            let conn = config.connection_string.as_deref().ok_or_else(|| {
                SpamError::Storage(StorageError::InvalidConnectionString {
                    reason: "no connection string configured".into(),
                })
            })?;
            let store = AzureBlobStore::from_connection_string(
                conn,
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(store))
        }
    }
}
