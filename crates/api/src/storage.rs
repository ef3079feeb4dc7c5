//! Object storage for image variants.
//!
//! Paths are always `{image_id}/{preset}.jpg`, overwrite is required, and
//! writes are idempotent by path so replayed uploads converge. The local
//! backend covers development and single-node deployments; a CDN-backed
//! bucket implements the same trait in production.

use std::path::PathBuf;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write-once-or-overwrite blob storage keyed by relative path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` at `path`, overwriting any existing object.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Read the object at `path`.
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete every object under `prefix`. Missing prefixes are not an
    /// error.
    async fn delete_prefix(&self, prefix: &str) -> Result<(), StorageError>;
}

/// Filesystem-backed object store rooted at a configured directory.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        Ok(tokio::fs::read(self.resolve(path)).await?)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), StorageError> {
        let dir = self.resolve(prefix.trim_end_matches('/'));
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Root directory for tests, unique per call.
    fn temp_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("larder-storage-{tag}-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn put_get_round_trip() {
        let store = LocalObjectStore::new(temp_root("rt"));
        store.put("1/thumbnail.jpg", b"abc").await.unwrap();
        assert_eq!(store.get("1/thumbnail.jpg").await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn put_overwrites_existing_object() {
        let store = LocalObjectStore::new(temp_root("ow"));
        store.put("1/full_res.jpg", b"first").await.unwrap();
        store.put("1/full_res.jpg", b"second").await.unwrap();
        assert_eq!(store.get("1/full_res.jpg").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn delete_prefix_removes_all_variants() {
        let store = LocalObjectStore::new(temp_root("del"));
        store.put("7/thumbnail.jpg", b"a").await.unwrap();
        store.put("7/hero_image.jpg", b"b").await.unwrap();
        store.delete_prefix("7/").await.unwrap();
        assert!(store.get("7/thumbnail.jpg").await.is_err());
    }

    #[tokio::test]
    async fn delete_missing_prefix_is_ok() {
        let store = LocalObjectStore::new(temp_root("miss"));
        assert!(store.delete_prefix("999/").await.is_ok());
    }
}
