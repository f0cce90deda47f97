//! Blob storage for user profile photos.

use async_trait::async_trait;
use std::path::PathBuf;

/// Photo blob storage used by the photo fetch worker.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Stores (or overwrites) the blob at the given relative path.
    async fn put(&self, path: &str, bytes: &[u8]) -> std::io::Result<()>;

    /// Returns `true` if a blob exists at the given relative path.
    async fn exists(&self, path: &str) -> bool;
}

/// Storage path for a user's photo, keyed by directory tenant and user.
#[must_use]
pub fn photo_path(directory_tenant_id: &str, user_external_id: &str) -> String {
    format!("{directory_tenant_id}/{user_external_id}")
}

/// Filesystem-backed photo store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsPhotoStore {
    root: PathBuf,
}

impl FsPhotoStore {
    /// Creates a store rooted at `root`. The directory is created lazily on
    /// first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl PhotoStore for FsPhotoStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> std::io::Result<()> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(full, bytes).await
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.full_path(path))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_path_layout() {
        assert_eq!(photo_path("dir-tenant", "user-1"), "dir-tenant/user-1");
    }

    #[tokio::test]
    async fn test_fs_store_put_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPhotoStore::new(dir.path());
        let path = photo_path("dir-tenant", "user-1");

        assert!(!store.exists(&path).await);
        store.put(&path, b"jpeg-bytes").await.unwrap();
        assert!(store.exists(&path).await);

        let written = std::fs::read(dir.path().join(&path)).unwrap();
        assert_eq!(written, b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_fs_store_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPhotoStore::new(dir.path());
        let path = photo_path("dir-tenant", "user-1");

        store.put(&path, b"old").await.unwrap();
        store.put(&path, b"new").await.unwrap();

        let written = std::fs::read(dir.path().join(&path)).unwrap();
        assert_eq!(written, b"new");
    }
}
