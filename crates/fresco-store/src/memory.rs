//! In-memory store variants for tests and local development

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use fresco_core::{ContentRef, DurableStore, HotStore, StorageError};

/// In-memory content-addressed store
#[derive(Debug, Default)]
pub struct MemoryDurableStore {
    artifacts: DashMap<[u8; 32], Bytes>,
}

impl MemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct artifacts stored
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

#[async_trait]
impl DurableStore for MemoryDurableStore {
    async fn write(&self, bytes: &[u8]) -> Result<ContentRef, StorageError> {
        let content_ref = ContentRef::from_data(bytes);
        self.artifacts
            .entry(content_ref.hash)
            .or_insert_with(|| Bytes::copy_from_slice(bytes));
        Ok(content_ref)
    }

    async fn read(&self, content_ref: &ContentRef) -> Result<Bytes, StorageError> {
        self.artifacts
            .get(&content_ref.hash)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::NotFound(content_ref.hash_hex()))
    }
}

/// In-memory hot cache.
///
/// Counts writes so tests can assert idempotency (e.g. that a second
/// cache repair performs zero additional writes).
#[derive(Debug, Default)]
pub struct MemoryHotStore {
    objects: DashMap<String, (String, Bytes)>,
    writes: AtomicU64,
}

impl MemoryHotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of writes performed
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Media type recorded for a key, if present
    pub fn media_type(&self, key: &str) -> Option<String> {
        self.objects.get(key).map(|entry| entry.value().0.clone())
    }
}

#[async_trait]
impl HotStore for MemoryHotStore {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.contains_key(key))
    }

    async fn read(&self, key: &str) -> Result<Bytes, StorageError> {
        self.objects
            .get(key)
            .map(|entry| entry.value().1.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &str, bytes: &[u8], media_type: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.objects.insert(
            key.to_string(),
            (media_type.to_string(), Bytes::copy_from_slice(bytes)),
        );
        Ok(())
    }
}
