//! Cache repair: resync the hot store from durable storage
//!
//! The hot store is assumed to be either fully populated or missing its
//! keys wholesale (a fresh bucket, a wiped cache). Repair is therefore a
//! full replay of the ledger's artifact publication history, not an
//! incremental diff.

use tracing::info;

use fresco_core::{ContentRef, DurableStore, HotStore, Ledger, PublicationKind};

use crate::error::EngineError;

/// Ensure the hot store holds every artifact the canonical pointer can
/// reach. Returns `true` if a resync ran, `false` if the cache was
/// already consistent. Running twice in a row performs zero writes on
/// the second run.
pub async fn repair_if_missing<L, D, H>(
    ledger: &L,
    durable: &D,
    hot: &H,
    canonical: &ContentRef,
) -> Result<bool, EngineError>
where
    L: Ledger + ?Sized,
    D: DurableStore + ?Sized,
    H: HotStore + ?Sized,
{
    if hot.exists(&canonical.hash_hex()).await? {
        return Ok(false);
    }

    info!(
        canonical = %canonical.short_hash(),
        "Hot cache missing canonical snapshot, resyncing full artifact history"
    );

    let mut copied = 0usize;
    for kind in [PublicationKind::Snapshot, PublicationKind::Delta] {
        for event in ledger.query_publication_events(kind).await? {
            let bytes = durable.read(&event.artifact_ref).await?;
            hot.write(&event.artifact_ref.hash_hex(), &bytes, kind.media_type())
                .await?;
            copied += 1;
        }
    }

    info!(copied, "Hot cache resync complete");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fresco_core::mock::MockLedger;
    use fresco_core::{LedgerPointer, PublicationEvent};
    use fresco_store::{MemoryDurableStore, MemoryHotStore};

    async fn seeded() -> (MockLedger, MemoryDurableStore, ContentRef) {
        let durable = MemoryDurableStore::new();
        let snapshot_ref = durable.write(b"snapshot png bytes").await.unwrap();
        let old_snapshot_ref = durable.write(b"older snapshot").await.unwrap();
        let delta_ref = durable.write(b"{\"delta\":[]}").await.unwrap();

        let pointer = LedgerPointer {
            last_snapshot_block: 20,
            last_snapshot_ref: snapshot_ref,
        };
        let ledger = MockLedger::new(100, pointer).with_publications(vec![
            PublicationEvent {
                kind: PublicationKind::Snapshot,
                block: 10,
                artifact_ref: old_snapshot_ref,
            },
            PublicationEvent {
                kind: PublicationKind::Delta,
                block: 20,
                artifact_ref: delta_ref,
            },
        ]);
        (ledger, durable, snapshot_ref)
    }

    #[tokio::test]
    async fn test_repair_copies_full_history() {
        let (ledger, durable, canonical) = seeded().await;
        let hot = MemoryHotStore::new();

        let repaired = repair_if_missing(&ledger, &durable, &hot, &canonical)
            .await
            .unwrap();
        assert!(repaired);

        // The mock seeds its pointer as a Snapshot publication, plus the
        // two extra publications above.
        assert_eq!(hot.write_count(), 3);
        assert!(hot.exists(&canonical.hash_hex()).await.unwrap());

        // Media types follow the publication kind.
        assert_eq!(hot.media_type(&canonical.hash_hex()).unwrap(), "image/png");
    }

    #[tokio::test]
    async fn test_repair_is_idempotent() {
        let (ledger, durable, canonical) = seeded().await;
        let hot = MemoryHotStore::new();

        repair_if_missing(&ledger, &durable, &hot, &canonical)
            .await
            .unwrap();
        let writes_after_first = hot.write_count();

        let repaired = repair_if_missing(&ledger, &durable, &hot, &canonical)
            .await
            .unwrap();
        assert!(!repaired);
        assert_eq!(hot.write_count(), writes_after_first);
    }

    #[tokio::test]
    async fn test_consistent_cache_is_untouched() {
        let (ledger, durable, canonical) = seeded().await;
        let hot = MemoryHotStore::new();
        hot.write(&canonical.hash_hex(), b"already cached", "image/png")
            .await
            .unwrap();

        let repaired = repair_if_missing(&ledger, &durable, &hot, &canonical)
            .await
            .unwrap();
        assert!(!repaired);
        assert_eq!(hot.write_count(), 1);
    }
}
