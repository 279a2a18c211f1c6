//! Persisted key/value storage for the session
//!
//! Values are opaque JSON documents; encoding and decoding is done by the callers.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::*;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage IO failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage surviving the dashboard restarts
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Reads the document stored under the key
    async fn load(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores the document under the key, replacing any previous one
    async fn save(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes the document, removing a missing key is not an error
    async fn clear(&self, key: &str) -> StorageResult<()>;
}

#[async_trait]
impl<S: SessionStorage + ?Sized> SessionStorage for Arc<S> {
    async fn load(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).load(key).await
    }

    async fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).save(key, value).await
    }

    async fn clear(&self, key: &str) -> StorageResult<()> {
        (**self).clear(key).await
    }
}

/// In-memory storage, for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn clear(&self, key: &str) -> StorageResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Storage keeping one JSON file per key in a directory
///
/// File names are the base64 (URL safe) encoded keys, so any key maps to a valid file name.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates the storage, the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        let name = BASE64_URL_SAFE_NO_PAD.encode(key.as_bytes());
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn load(&self, key: &str) -> StorageResult<Option<String>> {
        match tokio::fs::read_to_string(self.path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path(key), value).await?;
        Ok(())
    }

    async fn clear(&self, key: &str) -> StorageResult<()> {
        match tokio::fs::remove_file(self.path(key)).await {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn exercise(storage: &dyn SessionStorage) {
        assert_eq!(storage.load("currentSession").await.unwrap(), None);

        storage.save("currentSession", "{\"a\":1}").await.unwrap();
        storage.save("other", "{}").await.unwrap();
        assert_eq!(
            storage.load("currentSession").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );

        storage.save("currentSession", "{\"a\":2}").await.unwrap();
        assert_eq!(
            storage.load("currentSession").await.unwrap().as_deref(),
            Some("{\"a\":2}")
        );

        storage.clear("currentSession").await.unwrap();
        storage.clear("currentSession").await.unwrap();
        assert_eq!(storage.load("currentSession").await.unwrap(), None);
        assert_eq!(storage.load("other").await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn memory_storage() {
        exercise(&MemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn file_storage() {
        let dir = std::env::temp_dir().join(format!("dashboard-storage-{}", Uuid::new_v4()));
        exercise(&FileStorage::new(&dir)).await;
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
