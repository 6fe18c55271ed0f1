use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;

/// Named blob storage for uploaded images.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<()>;
    /// Returns `false` when there was nothing to delete.
    async fn delete_object(&self, key: &str) -> anyhow::Result<bool>;
    async fn exists(&self, key: &str) -> anyhow::Result<bool>;
}

/// Stores each blob as a flat file under `root`.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub async fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create upload dir {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        anyhow::ensure!(
            !key.is_empty()
                && key != "."
                && key != ".."
                && !key.contains('/')
                && !key.contains('\\')
                && !key.contains('\0'),
            "refusing storage key {:?}",
            key
        );
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<bool> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage() -> (TempDir, LocalStorage) {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("images")).await.unwrap();
        (tmp, storage)
    }

    #[tokio::test]
    async fn put_exists_delete() {
        let (_tmp, storage) = storage().await;
        storage
            .put_object("cat.png", Bytes::from_static(b"\x89PNG"))
            .await
            .unwrap();
        assert!(storage.exists("cat.png").await.unwrap());
        assert_eq!(
            std::fs::read(storage.root().join("cat.png")).unwrap(),
            b"\x89PNG"
        );

        assert!(storage.delete_object("cat.png").await.unwrap());
        assert!(!storage.exists("cat.png").await.unwrap());
        assert!(!storage.delete_object("cat.png").await.unwrap());
    }

    #[tokio::test]
    async fn rejects_keys_that_escape_root() {
        let (_tmp, storage) = storage().await;
        for key in ["", "..", "../etc/passwd", "a/b.png", "a\\b.png"] {
            assert!(
                storage.put_object(key, Bytes::new()).await.is_err(),
                "{:?}",
                key
            );
        }
    }
}
