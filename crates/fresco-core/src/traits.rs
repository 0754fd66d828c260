//! Capability traits for the engine's external collaborators
//!
//! The engine never talks to a chain client, an object store or a
//! scheduler directly; it goes through these traits so that production
//! and test implementations are two variants behind the same interface.

use async_trait::async_trait;
use bytes::Bytes;

use crate::content_ref::ContentRef;
use crate::error::{LedgerError, ScheduleError, StorageError};
use crate::event::{ColorEvent, LedgerPointer, PublicationEvent, PublicationKind};

/// The event-sourced ledger holding canvas history and the canonical
/// per-region snapshot pointer.
///
/// Range queries are subject to collaborator-side limits on block-range
/// width and result count; those limits surface as
/// [`LedgerError::RangeQuery`]. Commits use conditional-update semantics:
/// a commit whose `base_block` no longer matches the canonical pointer is
/// rejected, which is the only safeguard against concurrent cycles.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Canonical snapshot pointer for a region
    async fn latest_snapshot_info(&self, region: u64) -> Result<LedgerPointer, LedgerError>;

    /// Color events in `[from, to]`; `to == None` issues one unbounded
    /// query where the collaborator supports it
    async fn query_color_events(
        &self,
        from: u64,
        to: Option<u64>,
    ) -> Result<Vec<ColorEvent>, LedgerError>;

    /// Full history of snapshot or delta artifact publications
    async fn query_publication_events(
        &self,
        kind: PublicationKind,
    ) -> Result<Vec<PublicationEvent>, LedgerError>;

    /// Commit a new canonical snapshot for a region. Must be the last
    /// step of materialization; rejection is fatal for the current chunk.
    async fn commit_snapshot(
        &self,
        region: u64,
        base_block: u64,
        new_block: u64,
        snapshot_ref: ContentRef,
        delta_ref: ContentRef,
    ) -> Result<(), LedgerError>;

    /// Current chain height
    async fn current_block_height(&self) -> Result<u64, LedgerError>;
}

/// Durable content-addressed store. Writes are idempotent: the same
/// bytes always yield the same reference.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn write(&self, bytes: &[u8]) -> Result<ContentRef, StorageError>;
    async fn read(&self, content_ref: &ContentRef) -> Result<Bytes, StorageError>;
}

/// Hot cache object store mirroring durable artifacts for low-latency
/// reads. Keys are content-reference hex strings.
#[async_trait]
pub trait HotStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
    async fn read(&self, key: &str) -> Result<Bytes, StorageError>;
    async fn write(&self, key: &str, bytes: &[u8], media_type: &str) -> Result<(), StorageError>;
}

/// Controller for the external schedule that triggers snapshot cycles.
#[async_trait]
pub trait ScheduleController: Send + Sync {
    /// Set the polling interval in minutes
    async fn set_interval(&self, minutes: u32) -> Result<(), ScheduleError>;
}
