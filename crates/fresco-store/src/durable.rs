//! Durable content-addressed store over the local filesystem
//!
//! Artifact paths are derived from the content hash with a configurable
//! number of shard levels so no single directory accumulates the whole
//! history. Reads re-hash the bytes and refuse to hand out content that
//! no longer matches its address.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use fresco_core::{ContentRef, DurableStore, StorageError};

/// Configuration for the file durable store
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Base directory for artifact storage
    pub base_dir: PathBuf,
    /// Number of two-character shard levels in artifact paths
    pub shard_depth: u8,
    /// Upper bound on a single artifact's size in bytes
    pub max_artifact_size: u64,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data/durable"),
            shard_depth: 2,
            max_artifact_size: 100 * 1024 * 1024,
        }
    }
}

/// Content-addressed durable store over the local filesystem
pub struct FileDurableStore {
    config: FileStoreConfig,
}

impl FileDurableStore {
    /// Create the store, ensuring the base directory exists
    pub async fn new(config: FileStoreConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.base_dir).await?;
        info!(path = %config.base_dir.display(), "Durable artifact store ready");
        Ok(Self { config })
    }

    /// Sharded path for a content reference, e.g. `ab/cd/abcdef...`
    fn artifact_path(&self, content_ref: &ContentRef) -> PathBuf {
        let hex = content_ref.hash_hex();
        let mut path = self.config.base_dir.clone();
        let levels = (self.config.shard_depth as usize).min(hex.len() / 2);
        for level in 0..levels {
            path.push(&hex[level * 2..level * 2 + 2]);
        }
        path.push(&hex);
        path
    }
}

/// Land bytes under `path` without ever exposing a partial file: stage
/// into a sibling temp file, fsync, then rename into place.
async fn persist(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let staging = path.with_extension("tmp");
    let mut file = fs::File::create(&staging).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    fs::rename(&staging, path).await?;
    Ok(())
}

#[async_trait]
impl DurableStore for FileDurableStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn write(&self, bytes: &[u8]) -> Result<ContentRef, StorageError> {
        if bytes.len() as u64 > self.config.max_artifact_size {
            return Err(StorageError::CapacityExceeded);
        }

        let content_ref = ContentRef::from_data(bytes);
        let path = self.artifact_path(&content_ref);

        // Same bytes, same path: rewriting known content is a no-op.
        if fs::try_exists(&path).await? {
            debug!(hash = %content_ref.short_hash(), "Artifact already present");
            return Ok(content_ref);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        persist(&path, bytes).await?;

        debug!(hash = %content_ref.short_hash(), "Stored artifact");
        Ok(content_ref)
    }

    #[instrument(skip(self), fields(hash = %content_ref.short_hash()))]
    async fn read(&self, content_ref: &ContentRef) -> Result<Bytes, StorageError> {
        let path = self.artifact_path(content_ref);
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(content_ref.hash_hex()));
            }
            Err(e) => return Err(e.into()),
        };

        let actual = ContentRef::from_data(&data);
        if !actual.content_equals(content_ref) {
            warn!(
                expected = %content_ref.short_hash(),
                actual = %actual.short_hash(),
                "Stored artifact does not match its address"
            );
            return Err(StorageError::deserialization(format!(
                "artifact {} failed content verification",
                content_ref.short_hash()
            )));
        }

        Ok(Bytes::from(data))
    }
}
