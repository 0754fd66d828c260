//! End-to-end snapshot cycle tests against the in-process collaborators

use std::sync::Arc;

use fresco_core::mock::{MockLedger, RecordingScheduler};
use fresco_core::{
    ColorEvent, ContentRef, DeltaRecord, DurableStore, HotStore, LedgerPointer, Palette,
};
use fresco_engine::{CanvasCodec, CycleOutcome, EngineConfig, EngineError, SnapshotEngine};
use fresco_store::{MemoryDurableStore, MemoryHotStore};

struct Fixture {
    ledger: Arc<MockLedger>,
    durable: Arc<MemoryDurableStore>,
    hot: Arc<MemoryHotStore>,
    scheduler: Arc<RecordingScheduler>,
    genesis_ref: ContentRef,
}

/// A 4x4 all-background canvas committed at block 5, chain at `height`.
async fn fixture(height: u64, events: Vec<ColorEvent>) -> Fixture {
    let codec = CanvasCodec::default();
    let durable = Arc::new(MemoryDurableStore::new());
    let hot = Arc::new(MemoryHotStore::new());

    let blank = codec.blank_canvas(4, 4);
    let bytes = codec.encode(&blank).unwrap();
    let genesis_ref = durable.write(&bytes).await.unwrap();
    hot.write(&genesis_ref.hash_hex(), &bytes, "image/png")
        .await
        .unwrap();

    let pointer = LedgerPointer {
        last_snapshot_block: 5,
        last_snapshot_ref: genesis_ref,
    };
    let ledger = Arc::new(MockLedger::new(height, pointer).with_color_events(events));

    Fixture {
        ledger,
        durable,
        hot,
        scheduler: Arc::new(RecordingScheduler::new()),
        genesis_ref,
    }
}

fn engine(
    f: &Fixture,
    config: EngineConfig,
) -> SnapshotEngine<MockLedger, MemoryDurableStore, MemoryHotStore, RecordingScheduler> {
    SnapshotEngine::new(
        Arc::clone(&f.ledger),
        Arc::clone(&f.durable),
        Arc::clone(&f.hot),
        Arc::clone(&f.scheduler),
        config,
    )
}

#[tokio::test]
async fn single_event_produces_snapshot_delta_and_commit() {
    let f = fixture(6, vec![ColorEvent::new(1, 2, 6)]).await;
    let config = EngineConfig::default()
        .with_confirmations(1)
        .with_batch_bounds(1, 3_500);

    let outcome = engine(&f, config).run_cycle().await.unwrap();

    let CycleOutcome::Committed { commits, deferred } = outcome else {
        panic!("expected a commit, got {outcome:?}");
    };
    assert_eq!(commits.len(), 1);
    assert_eq!(deferred, 0);
    assert_eq!(commits[0].new_block, 6);

    // The new canonical image has pixel 1 painted with palette entry 1.
    let codec = CanvasCodec::default();
    let snapshot = f.durable.read(&commits[0].snapshot_ref).await.unwrap();
    let grid = codec.decode(&snapshot).unwrap();
    let [r, g, b] = Palette::default().entry(1);
    assert_eq!(grid.get_pixel(0, 0).0, [r, g, b, 0xff]);

    // The delta record has a single block delta with one change.
    let record =
        DeltaRecord::from_bytes(&f.durable.read(&commits[0].delta_ref).await.unwrap()).unwrap();
    assert_eq!(record.deltas.len(), 1);
    assert_eq!(record.deltas[0].block, 6);
    assert_eq!(record.deltas[0].changes.len(), 1);
    assert_eq!(record.prev, None);
    assert_eq!(record.base, f.genesis_ref);

    // The ledger commit carried the right block range.
    let calls = f.ledger.commits();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].base_block, 5);
    assert_eq!(calls[0].new_block, 6);

    // Event at the chain head: the cadence chose the active interval.
    assert_eq!(f.scheduler.intervals(), vec![20]);
}

#[tokio::test]
async fn too_few_blocks_exits_cleanly() {
    let f = fixture(5, Vec::new()).await;
    let config = EngineConfig::default().with_confirmations(10);

    let outcome = engine(&f, config).run_cycle().await.unwrap();
    assert_eq!(outcome, CycleOutcome::TooFewBlocks);
    assert!(f.ledger.commits().is_empty());
    // No cadence adjustment before the early exit.
    assert!(f.scheduler.intervals().is_empty());
}

#[tokio::test]
async fn too_few_events_defers_without_ledger_writes() {
    let f = fixture(400, vec![ColorEvent::new(1, 2, 6)]).await;
    let config = EngineConfig::default().with_confirmations(1);

    let outcome = engine(&f, config).run_cycle().await.unwrap();
    assert_eq!(outcome, CycleOutcome::TooFewEvents { count: 1 });
    assert!(f.ledger.commits().is_empty());

    // The event is 394 blocks behind the head: idle interval.
    assert_eq!(f.scheduler.intervals(), vec![100]);
}

#[tokio::test]
async fn zero_confirmations_is_an_invalid_parameter() {
    let f = fixture(10, Vec::new()).await;
    let config = EngineConfig::default().with_confirmations(0);

    let err = engine(&f, config).run_cycle().await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidParameter(_)));
}

#[tokio::test]
async fn oversized_batch_splits_and_rereads_the_pointer() {
    // Seven events across blocks 6..=12; bounds 2/3 split them 3+3 with
    // one deferred.
    let events: Vec<ColorEvent> = (0..7)
        .map(|i| ColorEvent::new(i + 1, 2, 6 + i))
        .collect();
    let f = fixture(12, events).await;
    let config = EngineConfig::default()
        .with_confirmations(1)
        .with_batch_bounds(2, 3)
        .with_small_delta_threshold(0); // force chaining, not supersession

    let outcome = engine(&f, config).run_cycle().await.unwrap();

    let CycleOutcome::Committed { commits, deferred } = outcome else {
        panic!("expected commits, got {outcome:?}");
    };
    assert_eq!(commits.len(), 2);
    assert_eq!(deferred, 1);
    assert_eq!(commits[0].new_block, 8);
    assert_eq!(commits[1].new_block, 11);

    // The second chunk committed against the authoritative pointer the
    // first chunk produced, not a locally assumed one.
    let calls = f.ledger.commits();
    assert_eq!(calls[0].base_block, 5);
    assert_eq!(calls[1].base_block, 8);

    // The second record chains behind the first on the new base.
    let record =
        DeltaRecord::from_bytes(&f.durable.read(&commits[1].delta_ref).await.unwrap()).unwrap();
    assert_eq!(record.prev, Some(commits[0].delta_ref));
    assert_eq!(record.base, commits[0].snapshot_ref);
}

#[tokio::test]
async fn dense_block_is_committed_whole() {
    // Four changes land in one block while the chunk bound is 2: the
    // whole block must go out in a single commit, never cut in half
    // behind an advancing pointer.
    let events: Vec<ColorEvent> = (0..4).map(|i| ColorEvent::new(i + 1, 2, 6)).collect();
    let f = fixture(6, events).await;
    let config = EngineConfig::default()
        .with_confirmations(1)
        .with_batch_bounds(2, 2);

    let outcome = engine(&f, config.clone()).run_cycle().await.unwrap();
    let CycleOutcome::Committed { commits, deferred } = outcome else {
        panic!("expected a commit, got {outcome:?}");
    };
    assert_eq!(commits.len(), 1);
    assert_eq!(deferred, 0);
    assert_eq!(commits[0].new_block, 6);

    let record =
        DeltaRecord::from_bytes(&f.durable.read(&commits[0].delta_ref).await.unwrap()).unwrap();
    assert_eq!(record.change_count(), 4);

    // Nothing was left stranded behind the pointer.
    let outcome = engine(&f, config).run_cycle().await.unwrap();
    assert_eq!(outcome, CycleOutcome::TooFewEvents { count: 0 });
    assert_eq!(f.ledger.commits().len(), 1);
}

#[tokio::test]
async fn deferred_tail_never_shares_a_committed_block() {
    // Two changes at block 6 commit; the block-7 change defers whole and
    // stays reachable past the advanced pointer.
    let events = vec![
        ColorEvent::new(1, 2, 6),
        ColorEvent::new(2, 3, 6),
        ColorEvent::new(3, 4, 7),
    ];
    let f = fixture(7, events).await;
    let config = EngineConfig::default()
        .with_confirmations(1)
        .with_batch_bounds(2, 2);

    let outcome = engine(&f, config.clone()).run_cycle().await.unwrap();
    let CycleOutcome::Committed { commits, deferred } = outcome else {
        panic!("expected a commit, got {outcome:?}");
    };
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].new_block, 6);
    assert_eq!(deferred, 1);

    // The next cycle still sees the deferred change.
    let outcome = engine(&f, config).run_cycle().await.unwrap();
    assert_eq!(outcome, CycleOutcome::TooFewEvents { count: 1 });
}

#[tokio::test]
async fn small_successor_supersedes_the_previous_record() {
    let events: Vec<ColorEvent> = (0..4)
        .map(|i| ColorEvent::new(i + 1, 2, 6 + i))
        .collect();
    let f = fixture(9, events).await;
    let config = EngineConfig::default()
        .with_confirmations(1)
        .with_batch_bounds(2, 2)
        .with_small_delta_threshold(10);

    let outcome = engine(&f, config).run_cycle().await.unwrap();
    let CycleOutcome::Committed { commits, .. } = outcome else {
        panic!("expected commits, got {outcome:?}");
    };
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[1].superseded, Some(commits[0].delta_ref));

    // The combined record covers all four changes back to genesis.
    let record =
        DeltaRecord::from_bytes(&f.durable.read(&commits[1].delta_ref).await.unwrap()).unwrap();
    assert_eq!(record.change_count(), 4);
    assert_eq!(record.base, f.genesis_ref);
    assert_eq!(record.prev, None);
}

#[tokio::test]
async fn rejected_commit_abandons_remaining_chunks() {
    let events: Vec<ColorEvent> = (0..6)
        .map(|i| ColorEvent::new(i + 1, 2, 6 + i))
        .collect();
    let f = fixture(11, events.clone()).await;
    let rejecting = Arc::new(
        MockLedger::new(11, f.ledger.pointer())
            .with_color_events(events)
            .with_rejected_commits(),
    );
    // Reuse the seeded stores with a ledger that refuses every commit.
    let rejecting_ledger = Arc::clone(&rejecting);
    let engine = SnapshotEngine::new(
        rejecting_ledger,
        Arc::clone(&f.durable),
        Arc::clone(&f.hot),
        Arc::clone(&f.scheduler),
        EngineConfig::default()
            .with_confirmations(1)
            .with_batch_bounds(2, 3),
    );

    let err = engine.run_cycle().await.unwrap_err();
    assert!(err.is_commit_rejected());
    assert!(rejecting.commits().is_empty());
}

#[tokio::test]
async fn cold_hot_cache_is_repaired_before_the_cycle_proceeds() {
    let f = fixture(6, vec![ColorEvent::new(1, 2, 6)]).await;
    let cold_hot = Arc::new(MemoryHotStore::new());
    let engine = SnapshotEngine::new(
        Arc::clone(&f.ledger),
        Arc::clone(&f.durable),
        Arc::clone(&cold_hot),
        Arc::clone(&f.scheduler),
        EngineConfig::default()
            .with_confirmations(1)
            .with_batch_bounds(1, 3_500),
    );

    let outcome = engine.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Committed { .. }));

    // Repair mirrored the genesis snapshot before materialization used it.
    assert!(cold_hot.exists(&f.genesis_ref.hash_hex()).await.unwrap());
}

#[tokio::test]
async fn unstable_events_are_excluded_from_the_commit() {
    // Height 10 with confirmations 4: stable block is 7.
    let events = vec![
        ColorEvent::new(1, 2, 6),
        ColorEvent::new(2, 3, 7),
        ColorEvent::new(3, 4, 9), // not yet stable
    ];
    let f = fixture(10, events).await;
    let config = EngineConfig::default()
        .with_confirmations(4)
        .with_batch_bounds(1, 3_500);

    let outcome = engine(&f, config).run_cycle().await.unwrap();
    let CycleOutcome::Committed { commits, .. } = outcome else {
        panic!("expected a commit, got {outcome:?}");
    };
    assert_eq!(commits[0].new_block, 7);

    let record =
        DeltaRecord::from_bytes(&f.durable.read(&commits[0].delta_ref).await.unwrap()).unwrap();
    assert_eq!(record.change_count(), 2);
    assert_eq!(record.last_block(), Some(7));
}
