//! File-based hot cache object store
//!
//! A flat keyed object store over a directory. Keys are content-reference
//! hex strings, so they are validated to a safe character set before
//! touching the filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use fresco_core::{HotStore, StorageError};

/// Hot cache over the local filesystem
pub struct FileHotStore {
    base_dir: PathBuf,
}

impl FileHotStore {
    /// Create the store, ensuring the base directory exists
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        info!(path = %base_dir.display(), "Hot store initialized");

        Ok(Self { base_dir })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_dir.join(key))
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
    file.write_all(bytes)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
    file.sync_all()
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
    fs::rename(&temp_path, path)
        .await
        .map_err(|e| StorageError::Io(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl HotStore for FileHotStore {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(key)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    async fn read(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.object_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn write(&self, key: &str, bytes: &[u8], media_type: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        write_atomic(&path, bytes).await?;
        debug!(key, media_type, "Stored hot object");
        Ok(())
    }
}
