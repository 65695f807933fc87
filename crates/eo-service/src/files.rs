//! Binary object storage
//!
//! Uploads are stored under generated unique keys (see
//! [`eo_org::unique_upload_name`]); the database only ever holds the key.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::error::FileStoreError;

/// An uploaded file as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Original file name; only its extension is kept
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Object storage keyed by relative paths.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<(), FileStoreError>;

    async fn read(&self, key: &str) -> Result<Vec<u8>, FileStoreError>;

    /// Delete a stored object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), FileStoreError>;

    async fn exists(&self, key: &str) -> Result<bool, FileStoreError>;
}

/// Files on the local disk under a media root.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    /// Use `root` as media root, creating it if needed.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, key: &str) -> Result<PathBuf, FileStoreError> {
        let relative = Path::new(key);
        let clean = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !clean {
            return Err(FileStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, key: &str, bytes: Vec<u8>) -> Result<(), FileStoreError> {
        let path = self.path_of(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        tracing::debug!(key = %key, "Stored file");
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, FileStoreError> {
        let path = self.path_of(key)?;
        Ok(fs::read(path).await?)
    }

    async fn delete(&self, key: &str) -> Result<(), FileStoreError> {
        let path = self.path_of(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key = %key, "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, FileStoreError> {
        let path = self.path_of(key)?;
        Ok(fs::try_exists(path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("media")).await.unwrap();

        storage.save("attachments/a.pdf", b"pdf".to_vec()).await.unwrap();
        assert!(storage.exists("attachments/a.pdf").await.unwrap());
        assert_eq!(storage.read("attachments/a.pdf").await.unwrap(), b"pdf");

        storage.delete("attachments/a.pdf").await.unwrap();
        assert!(!storage.exists("attachments/a.pdf").await.unwrap());

        // Second delete is a no-op
        storage.delete("attachments/a.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path()).await.unwrap();

        for key in ["", "../secret", "/etc/passwd", "attachments/../../x"] {
            let err = storage.save(key, vec![1]).await.unwrap_err();
            assert!(matches!(err, FileStoreError::InvalidKey(_)), "{key}");
        }
    }
}
