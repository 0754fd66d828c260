//! Snapshot materializer: apply a delta to the base image and publish
//!
//! Ordering matters here. Artifacts go to durable storage first, then
//! into the hot cache, and the ledger commit is strictly the last step:
//! if uploads succeed but the commit fails, the artifacts are orphaned
//! but harmless, content-addressed and never referenced. A rejected
//! commit is fatal for the current chunk and must not be retried against
//! a possibly stale base.

use tracing::{debug, info, warn};

use fresco_core::{
    ColorEvent, ContentRef, DeltaRecord, DurableStore, HotStore, Ledger, LedgerPointer,
    PublicationKind, StorageError,
};

use crate::canvas::CanvasCodec;
use crate::compactor::{compact, extend_chain};
use crate::error::EngineError;

/// One chunk of changes to materialize onto a base snapshot
#[derive(Debug)]
pub struct MaterializeRequest<'a> {
    pub region: u64,
    /// Authoritative pointer read from the ledger for this chunk
    pub base: LedgerPointer,
    /// Block height the commit advances to (the chunk's last block)
    pub new_block: u64,
    /// Block-ordered events, all within `(base block, new_block]`
    pub events: &'a [ColorEvent],
    /// Most recently published delta record, for chain extension
    pub chain: Option<(ContentRef, DeltaRecord)>,
    /// Change-count bound below which the previous record is superseded
    pub small_threshold: usize,
}

/// A successful snapshot commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub new_block: u64,
    pub snapshot_ref: ContentRef,
    pub delta_ref: ContentRef,
    /// The delta record replaced by this commit, if the small-delta
    /// merge applied
    pub superseded: Option<ContentRef>,
}

/// Materialize one chunk: paint the base image, publish the snapshot and
/// delta record, and commit the new canonical pointer.
pub async fn materialize<L, D, H>(
    ledger: &L,
    durable: &D,
    hot: &H,
    codec: &CanvasCodec,
    request: MaterializeRequest<'_>,
) -> Result<CommitRecord, EngineError>
where
    L: Ledger + ?Sized,
    D: DurableStore + ?Sized,
    H: HotStore + ?Sized,
{
    let base_block = request.base.last_snapshot_block;
    if request.new_block <= base_block {
        return Err(EngineError::InvalidParameter(format!(
            "commit block {} does not advance past base snapshot block {base_block}",
            request.new_block
        )));
    }

    // Read the base image, preferring the hot cache.
    let base_key = request.base.last_snapshot_ref.hash_hex();
    let base_bytes = if hot.exists(&base_key).await? {
        hot.read(&base_key).await?
    } else {
        warn!(
            snapshot = %request.base.last_snapshot_ref.short_hash(),
            "Base snapshot missing from hot cache, reading durable store"
        );
        durable.read(&request.base.last_snapshot_ref).await?
    };

    // Compact the chunk and extend the delta chain. Only the NEW deltas
    // are painted: a superseded record's changes are already baked into
    // the base image.
    let new_deltas = compact(request.events);
    let extension = extend_chain(
        request.chain,
        new_deltas.clone(),
        request.base.last_snapshot_ref,
        request.small_threshold,
    );

    let mut grid = codec.decode(&base_bytes)?;
    codec.paint(&mut grid, &new_deltas);
    let snapshot_bytes = codec.encode(&grid)?;
    let delta_bytes = extension
        .record
        .to_bytes()
        .map_err(|e| StorageError::serialization(e.to_string()))?;

    // Durable first, then hot mirror.
    let snapshot_ref = durable.write(&snapshot_bytes).await?;
    let delta_ref = durable.write(&delta_bytes).await?;
    hot.write(
        &snapshot_ref.hash_hex(),
        &snapshot_bytes,
        PublicationKind::Snapshot.media_type(),
    )
    .await?;
    hot.write(
        &delta_ref.hash_hex(),
        &delta_bytes,
        PublicationKind::Delta.media_type(),
    )
    .await?;

    debug!(
        snapshot = %snapshot_ref.short_hash(),
        delta = %delta_ref.short_hash(),
        "Artifacts uploaded, committing pointer"
    );

    // Strictly last: the ledger commit.
    ledger
        .commit_snapshot(
            request.region,
            base_block,
            request.new_block,
            snapshot_ref,
            delta_ref,
        )
        .await?;

    info!(
        block = request.new_block,
        snapshot = %snapshot_ref.short_hash(),
        delta = %delta_ref.short_hash(),
        "Published snapshot commit"
    );

    Ok(CommitRecord {
        new_block: request.new_block,
        snapshot_ref,
        delta_ref,
        superseded: extension.superseded,
    })
}

/// Last block of a block-ordered event slice
pub(crate) fn last_block(events: &[ColorEvent]) -> Option<u64> {
    events.last().map(|e| e.block)
}
