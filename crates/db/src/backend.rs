use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::Document;
use crate::StoreError;

/// Where the document lives between process runs.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    async fn load(&self) -> Result<Option<Document>, StoreError>;
    async fn save(&self, doc: &Document) -> Result<(), StoreError>;
}

/// Pretty-printed JSON file, replaced atomically on each save.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl StorageBackend for JsonFileBackend {
    async fn load(&self) -> Result<Option<Document>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, doc: &Document) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Keeps the last saved document as JSON in memory. Used by tests and by
/// deployments that do not want anything on disk.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    saved: Mutex<Option<serde_json::Value>>,
    saves: Mutex<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(doc: &Document) -> Result<Self, StoreError> {
        Ok(Self {
            saved: Mutex::new(Some(serde_json::to_value(doc)?)),
            saves: Mutex::new(0),
        })
    }

    pub async fn snapshot(&self) -> Option<serde_json::Value> {
        self.saved.lock().await.clone()
    }

    pub async fn save_count(&self) -> usize {
        *self.saves.lock().await
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<Document>, StoreError> {
        match self.saved.lock().await.clone() {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, doc: &Document) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc)?;
        *self.saved.lock().await = Some(value);
        *self.saves.lock().await += 1;
        Ok(())
    }
}
