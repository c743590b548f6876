//! Local file helpers for the fixed scratch paths.

use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

/// Atomically write raw bytes to a file.
///
/// Writes to a uniquely named sibling temp file, then renames it over the
/// target path. Creates parent directories if they don't exist. Concurrent
/// writers to the same path never observe a partially written file.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = temp_sibling(path);
    if let Err(e) = std::fs::write(&tmp, data) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Async variant of [`atomic_write`] for use inside request handlers.
pub async fn atomic_write_async(path: &Path, data: Vec<u8>) -> io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || atomic_write(&path, &data))
        .await
        .map_err(io::Error::other)?
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "spamguard".to_string());
    let suffix: u64 = rand::random();
    path.with_file_name(format!(".{name}.{}.{suffix:016x}.tmp", std::process::id()))
}

/// Compute SHA-256 hash of arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("model.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
    }

    #[test]
    fn test_atomic_write_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spam.csv");
        atomic_write(&path, b"old contents").unwrap();
        atomic_write(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_atomic_write_async() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        atomic_write_async(&path, b"abc".to_vec()).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn test_hash_bytes() {
        assert_eq!(
            hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
