//! Event batcher: fetch color events across a block range
//!
//! Ledger collaborators limit both the block-range width and the result
//! count of a single query. The batcher works around this by partitioning
//! the range into fixed-width sub-ranges and issuing them under a
//! bounded-concurrency limiter, then reassembling results in sub-range
//! order. Sub-range boundaries are disjoint and contiguous, so the merge
//! introduces no duplicates or gaps and preserves ascending block order
//! with emission order intact within a block.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use fresco_core::{ColorEvent, Ledger, LedgerError};

use crate::error::EngineError;

/// Default sub-range width, below typical per-query range limits
pub const DEFAULT_WINDOW: u64 = 2_000;

/// Default number of sub-queries in flight
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Bounded-concurrency fetcher for ledger color events
#[derive(Debug, Clone)]
pub struct EventBatcher {
    window: u64,
    concurrency: usize,
}

impl Default for EventBatcher {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl EventBatcher {
    pub fn new(window: u64, concurrency: usize) -> Self {
        Self {
            window: window.max(1),
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch color events in `[from, to]`, block-ordered.
    ///
    /// With `to == None` a single unbounded query is attempted (for
    /// collaborators that support it); if that fails with a range-query
    /// error, the batcher falls back once to the chunked bounded form
    /// against the current chain height before propagating.
    pub async fn fetch_range<L>(
        &self,
        ledger: &Arc<L>,
        from: u64,
        to: Option<u64>,
    ) -> Result<Vec<ColorEvent>, EngineError>
    where
        L: Ledger + ?Sized + 'static,
    {
        match to {
            Some(to) => self.fetch_chunked(ledger, from, to).await,
            None => match ledger.query_color_events(from, None).await {
                Ok(events) => Ok(events),
                Err(LedgerError::RangeQuery(reason)) => {
                    warn!(%reason, "Unbounded query failed, falling back to chunked form");
                    let height = ledger.current_block_height().await?;
                    self.fetch_chunked(ledger, from, height).await
                }
                Err(e) => Err(e.into()),
            },
        }
    }

    async fn fetch_chunked<L>(
        &self,
        ledger: &Arc<L>,
        from: u64,
        to: u64,
    ) -> Result<Vec<ColorEvent>, EngineError>
    where
        L: Ledger + ?Sized + 'static,
    {
        if from > to {
            return Ok(Vec::new());
        }

        let ranges = sub_ranges(from, to, self.window);
        debug!(from, to, sub_queries = ranges.len(), "Fetching color events");

        let limiter = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for (index, (lo, hi)) in ranges.iter().copied().enumerate() {
            let ledger = Arc::clone(ledger);
            let limiter = Arc::clone(&limiter);
            join_set.spawn(async move {
                let _permit = limiter
                    .acquire_owned()
                    .await
                    .map_err(|_| LedgerError::Rpc("query limiter closed".to_string()))?;
                let events = ledger.query_color_events(lo, Some(hi)).await?;
                Ok::<_, LedgerError>((index, events))
            });
        }

        // Gather out of completion order, then normalize back to
        // sub-range order; the compactor requires sorted input.
        let mut buckets: Vec<Option<Vec<ColorEvent>>> = vec![None; ranges.len()];
        while let Some(joined) = join_set.join_next().await {
            let (index, events) = joined
                .map_err(|e| LedgerError::Rpc(format!("sub-query task failed: {e}")))??;
            buckets[index] = Some(events);
        }

        Ok(buckets.into_iter().flatten().flatten().collect())
    }
}

/// Partition `[from, to]` into contiguous windows of at most `window`
/// blocks, with no overlap or gap.
fn sub_ranges(from: u64, to: u64, window: u64) -> Vec<(u64, u64)> {
    let mut ranges = Vec::new();
    let mut lo = from;
    while lo <= to {
        let hi = lo.saturating_add(window - 1).min(to);
        ranges.push((lo, hi));
        if hi == u64::MAX {
            break;
        }
        lo = hi + 1;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use fresco_core::mock::MockLedger;
    use fresco_core::{ContentRef, LedgerPointer};

    fn ledger_with_events(height: u64, events: Vec<ColorEvent>) -> MockLedger {
        let pointer = LedgerPointer {
            last_snapshot_block: 0,
            last_snapshot_ref: ContentRef::from_data(b"genesis"),
        };
        MockLedger::new(height, pointer).with_color_events(events)
    }

    fn events_at_blocks(blocks: &[u64]) -> Vec<ColorEvent> {
        blocks
            .iter()
            .enumerate()
            .map(|(i, &b)| ColorEvent::new(i as u64 + 1, 1, b))
            .collect()
    }

    #[test]
    fn test_sub_ranges_cover_without_gaps() {
        let ranges = sub_ranges(1, 5000, 2000);
        assert_eq!(ranges, vec![(1, 2000), (2001, 4000), (4001, 5000)]);

        let single = sub_ranges(10, 12, 2000);
        assert_eq!(single, vec![(10, 12)]);
    }

    #[tokio::test]
    async fn test_chunked_fetch_preserves_block_order() {
        let blocks: Vec<u64> = vec![5, 70, 150, 151, 220, 290];
        let ledger = Arc::new(ledger_with_events(300, events_at_blocks(&blocks)));

        let batcher = EventBatcher::new(100, 2);
        let events = batcher.fetch_range(&ledger, 1, Some(300)).await.unwrap();

        let fetched: Vec<u64> = events.iter().map(|e| e.block).collect();
        assert_eq!(fetched, blocks);

        // One sub-query per 100-block window.
        assert_eq!(ledger.range_queries().len(), 3);
    }

    #[tokio::test]
    async fn test_wide_query_falls_back_once_to_chunked() {
        let blocks: Vec<u64> = vec![10, 20, 30];
        let ledger = Arc::new(
            ledger_with_events(50, events_at_blocks(&blocks)).with_failing_wide_queries(),
        );

        let batcher = EventBatcher::new(25, 4);
        let events = batcher.fetch_range(&ledger, 1, None).await.unwrap();
        assert_eq!(events.len(), 3);

        let queries = ledger.range_queries();
        assert_eq!(queries[0], (1, None));
        assert!(queries[1..].iter().all(|(_, to)| to.is_some()));
    }

    #[tokio::test]
    async fn test_empty_range_is_empty() {
        let ledger = Arc::new(ledger_with_events(10, Vec::new()));
        let batcher = EventBatcher::default();
        let events = batcher.fetch_range(&ledger, 11, Some(10)).await.unwrap();
        assert!(events.is_empty());
    }
}
