//! Cycle orchestrator: one snapshot invocation from pointer read to commit
//!
//! A cycle is a single cooperative control flow; nothing here runs
//! concurrently except the event batcher's internal fan-out. There is no
//! cross-invocation coordination: if two cycles race on one region, the
//! ledger's conditional commit decides, and the loser surfaces a fatal
//! [`CommitRejected`](fresco_core::LedgerError::CommitRejected) error.

use std::sync::Arc;

use tracing::{info, instrument};

use fresco_core::{
    ColorEvent, ContentRef, DeltaRecord, DurableStore, HotStore, IndexMode, Ledger,
    PublicationKind, ScheduleController, StorageError,
};

use crate::batcher::EventBatcher;
use crate::cadence::CadencePolicy;
use crate::canvas::CanvasCodec;
use crate::error::EngineError;
use crate::materializer::{last_block, materialize, CommitRecord, MaterializeRequest};
use crate::planner::{plan, BatchPlan};
use crate::repair::repair_if_missing;

/// Engine configuration; defaults mirror the production deployment
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Canvas region this engine snapshots
    pub region: u64,
    /// Confirmation depth: only blocks at least this deep are committed
    pub confirmations: u64,
    /// Below this change count the whole cycle defers
    pub min_batch_size: usize,
    /// Above this change count the batch splits into chunks
    pub max_batch_size: usize,
    /// Combined change count at or below which an existing delta record
    /// is superseded instead of extended
    pub small_delta_threshold: usize,
    /// Event batcher sub-range width in blocks
    pub batch_window: u64,
    /// Event batcher sub-queries in flight
    pub batch_concurrency: usize,
    /// Cadence policy for adapting the polling interval
    pub cadence: CadencePolicy,
    /// Interval while the canvas is active (minutes)
    pub min_interval_minutes: u32,
    /// Interval while the canvas is idle (minutes)
    pub max_interval_minutes: u32,
    /// Pixel/color indexing convention for this region
    pub index_mode: IndexMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            region: 0,
            confirmations: 2,
            min_batch_size: 3_000,
            max_batch_size: 3_500,
            small_delta_threshold: 6_000,
            batch_window: crate::batcher::DEFAULT_WINDOW,
            batch_concurrency: crate::batcher::DEFAULT_CONCURRENCY,
            cadence: CadencePolicy::default(),
            min_interval_minutes: 20,
            max_interval_minutes: 100,
            index_mode: IndexMode::OneBased,
        }
    }
}

impl EngineConfig {
    pub fn with_region(mut self, region: u64) -> Self {
        self.region = region;
        self
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn with_batch_bounds(mut self, min: usize, max: usize) -> Self {
        self.min_batch_size = min;
        self.max_batch_size = max;
        self
    }

    pub fn with_small_delta_threshold(mut self, threshold: usize) -> Self {
        self.small_delta_threshold = threshold;
        self
    }

    pub fn with_cadence(mut self, cadence: CadencePolicy) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_intervals(mut self, min_minutes: u32, max_minutes: u32) -> Self {
        self.min_interval_minutes = min_minutes;
        self.max_interval_minutes = max_minutes;
        self
    }

    pub fn with_index_mode(mut self, index_mode: IndexMode) -> Self {
        self.index_mode = index_mode;
        self
    }
}

/// Result of one cycle. The first two variants are expected steady-state
/// outcomes, not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The chain has fewer blocks than the confirmation depth
    TooFewBlocks,
    /// Fewer stable changes than the minimum batch size
    TooFewEvents { count: usize },
    /// One or more chunks were committed
    Committed {
        commits: Vec<CommitRecord>,
        /// Trailing changes left for the next invocation
        deferred: usize,
    },
}

/// The incremental snapshot engine for one canvas region
pub struct SnapshotEngine<L, D, H, S>
where
    L: Ledger + ?Sized,
    D: DurableStore + ?Sized,
    H: HotStore + ?Sized,
    S: ScheduleController + ?Sized,
{
    ledger: Arc<L>,
    durable: Arc<D>,
    hot: Arc<H>,
    scheduler: Arc<S>,
    config: EngineConfig,
    codec: CanvasCodec,
    batcher: EventBatcher,
}

impl<L, D, H, S> SnapshotEngine<L, D, H, S>
where
    L: Ledger + ?Sized + 'static,
    D: DurableStore + ?Sized,
    H: HotStore + ?Sized,
    S: ScheduleController + ?Sized,
{
    pub fn new(
        ledger: Arc<L>,
        durable: Arc<D>,
        hot: Arc<H>,
        scheduler: Arc<S>,
        config: EngineConfig,
    ) -> Self {
        let codec = CanvasCodec::new(config.index_mode);
        let batcher = EventBatcher::new(config.batch_window, config.batch_concurrency);
        Self {
            ledger,
            durable,
            hot,
            scheduler,
            config,
            codec,
            batcher,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one snapshot cycle to completion.
    #[instrument(skip(self), fields(region = self.config.region))]
    pub async fn run_cycle(&self) -> Result<CycleOutcome, EngineError> {
        // Parameter validation happens before any I/O.
        if self.config.confirmations == 0 {
            return Err(EngineError::InvalidParameter(
                "confirmation depth must be positive".to_string(),
            ));
        }
        if self.config.min_batch_size > self.config.max_batch_size {
            return Err(EngineError::InvalidParameter(format!(
                "min batch size {} exceeds max {}",
                self.config.min_batch_size, self.config.max_batch_size
            )));
        }

        let height = self.ledger.current_block_height().await?;
        if self.config.confirmations > height {
            info!(height, "Too few blocks for the confirmation depth");
            return Ok(CycleOutcome::TooFewBlocks);
        }

        let mut pointer = self.ledger.latest_snapshot_info(self.config.region).await?;
        repair_if_missing(
            self.ledger.as_ref(),
            self.durable.as_ref(),
            self.hot.as_ref(),
            &pointer.last_snapshot_ref,
        )
        .await?;

        // Fetch everything past the pointer; cadence judges activity on
        // the unfiltered list, commits only use stable blocks.
        let events = self
            .batcher
            .fetch_range(&self.ledger, pointer.last_snapshot_block + 1, Some(height))
            .await?;

        let interval = self.config.cadence.choose_interval(
            &events,
            height,
            self.config.min_interval_minutes,
            self.config.max_interval_minutes,
        );
        self.scheduler.set_interval(interval).await?;

        let stable_block = height + 1 - self.config.confirmations;
        let stable: Vec<ColorEvent> = events
            .into_iter()
            .filter(|e| e.block <= stable_block)
            .collect();

        let (chunks, deferred) = match plan(
            &stable,
            self.config.min_batch_size,
            self.config.max_batch_size,
        ) {
            BatchPlan::Defer { count } => {
                info!(count, "Too few new color events, deferring");
                return Ok(CycleOutcome::TooFewEvents { count });
            }
            BatchPlan::Commit { chunks, deferred } => (chunks, deferred),
        };

        let mut commits = Vec::with_capacity(chunks.len());
        for (index, range) in chunks.into_iter().enumerate() {
            if index > 0 {
                // The ledger is the source of truth for the new base, not
                // the pointer this cycle computed locally.
                pointer = self.ledger.latest_snapshot_info(self.config.region).await?;
            }

            let chunk = &stable[range];
            let new_block = last_block(chunk).unwrap_or(stable_block);
            let chain = self.load_chain_state().await?;

            // A rejected commit abandons all remaining chunks; retrying
            // them against a possibly stale base would be worse.
            let commit = materialize(
                self.ledger.as_ref(),
                self.durable.as_ref(),
                self.hot.as_ref(),
                &self.codec,
                MaterializeRequest {
                    region: self.config.region,
                    base: pointer,
                    new_block,
                    events: chunk,
                    chain,
                    small_threshold: self.config.small_delta_threshold,
                },
            )
            .await?;
            commits.push(commit);
        }

        Ok(CycleOutcome::Committed { commits, deferred })
    }

    /// Most recently published delta record, read back from durable
    /// storage for chain extension.
    async fn load_chain_state(
        &self,
    ) -> Result<Option<(ContentRef, DeltaRecord)>, EngineError> {
        let mut publications = self
            .ledger
            .query_publication_events(PublicationKind::Delta)
            .await?;
        let Some(latest) = publications.pop() else {
            return Ok(None);
        };
        let bytes = self.durable.read(&latest.artifact_ref).await?;
        let record = DeltaRecord::from_bytes(&bytes)
            .map_err(|e| StorageError::deserialization(e.to_string()))?;
        Ok(Some((latest.artifact_ref, record)))
    }
}
