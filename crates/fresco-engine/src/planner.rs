//! Batch planner: decide whether to commit, defer, or split a change set
//!
//! Chunk boundaries always fall on block edges. A chunk's commit advances
//! the ledger pointer to its last block, and the next cycle resumes from
//! the block after the pointer; splitting a block across two chunks (or
//! into the deferred tail) would therefore strand the second half of its
//! changes behind an already-advanced pointer. A block denser than the
//! size bound is committed whole, over the bound, rather than split.

use std::ops::Range;

use tracing::debug;

use fresco_core::ColorEvent;

/// Plan for a newly observed change set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchPlan {
    /// Too few changes; the cycle ends without any ledger writes
    Defer { count: usize },
    /// One or more safely-sized commits
    Commit {
        /// Consecutive index ranges into the change set, each ending on
        /// a block edge and holding at most `max_size` changes unless a
        /// single block alone exceeds the bound
        chunks: Vec<Range<usize>>,
        /// Trailing changes below `min_size`, left for the next cycle.
        /// Always whole blocks past the last committed one.
        deferred: usize,
    },
}

/// Partition block-ordered changes into committable chunks.
///
/// - fewer than `min_size` changes: defer entirely
/// - between the bounds: a single commit
/// - more than `max_size`: consecutive block-aligned chunks of at most
///   `max_size` changes (a block larger than the bound stays whole); a
///   trailing chunk smaller than `min_size` is deferred, not committed
pub fn plan(events: &[ColorEvent], min_size: usize, max_size: usize) -> BatchPlan {
    debug_assert!(min_size <= max_size);

    // A zero minimum would admit empty chunks.
    let min_size = min_size.max(1);
    let max_size = max_size.max(min_size);

    let count = events.len();
    if count < min_size {
        return BatchPlan::Defer { count };
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < count {
        let end = chunk_end(events, start, max_size);
        chunks.push(start..end);
        start = end;
    }

    let mut deferred = 0;
    if chunks.len() > 1 {
        if let [.., last] = chunks.as_slice() {
            if last.len() < min_size {
                deferred = last.len();
                chunks.pop();
            }
        }
    }

    debug!(count, chunks = chunks.len(), deferred, "Planned change set");
    BatchPlan::Commit { chunks, deferred }
}

/// End of the chunk starting at `start`: the last block edge within the
/// size bound, or the end of the straddling block when the block at
/// `start` alone exceeds the bound.
fn chunk_end(events: &[ColorEvent], start: usize, max_size: usize) -> usize {
    let block_edge = |i: usize| i == events.len() || events[i].block != events[i - 1].block;
    let bound = start.saturating_add(max_size).min(events.len());

    let mut end = bound;
    while end > start && !block_edge(end) {
        end -= 1;
    }
    if end == start {
        end = bound;
        while !block_edge(end) {
            end += 1;
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: usize = 3000;
    const MAX: usize = 3500;

    /// One event per distinct ascending block
    fn sparse_events(count: usize) -> Vec<ColorEvent> {
        (0..count)
            .map(|i| ColorEvent::new(i as u64 + 1, 1, i as u64 + 1))
            .collect()
    }

    fn events_at_blocks(blocks: &[u64]) -> Vec<ColorEvent> {
        blocks
            .iter()
            .enumerate()
            .map(|(i, &b)| ColorEvent::new(i as u64 + 1, 1, b))
            .collect()
    }

    #[test]
    fn test_below_minimum_defers() {
        assert_eq!(
            plan(&sparse_events(2999), MIN, MAX),
            BatchPlan::Defer { count: 2999 }
        );
        assert_eq!(plan(&[], MIN, MAX), BatchPlan::Defer { count: 0 });
    }

    #[test]
    fn test_exact_minimum_commits_once() {
        assert_eq!(
            plan(&sparse_events(3000), MIN, MAX),
            BatchPlan::Commit {
                chunks: vec![0..3000],
                deferred: 0
            }
        );
    }

    #[test]
    fn test_within_bounds_commits_once() {
        assert_eq!(
            plan(&sparse_events(3400), MIN, MAX),
            BatchPlan::Commit {
                chunks: vec![0..3400],
                deferred: 0
            }
        );
    }

    #[test]
    fn test_oversized_set_splits() {
        let BatchPlan::Commit { chunks, deferred } = plan(&sparse_events(7000), MIN, MAX) else {
            panic!("expected commit plan");
        };
        assert_eq!(chunks, vec![0..3500, 3500..7000]);
        assert_eq!(deferred, 0);

        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total, 7000);
        assert!(chunks.iter().all(|c| c.len() <= MAX && c.len() >= MIN));
    }

    #[test]
    fn test_small_remainder_is_deferred() {
        let BatchPlan::Commit { chunks, deferred } = plan(&sparse_events(7200), MIN, MAX) else {
            panic!("expected commit plan");
        };
        assert_eq!(chunks, vec![0..3500, 3500..7000]);
        assert_eq!(deferred, 200);
    }

    #[test]
    fn test_large_remainder_is_committed() {
        let BatchPlan::Commit { chunks, deferred } = plan(&sparse_events(10_000), MIN, MAX) else {
            panic!("expected commit plan");
        };
        assert_eq!(chunks, vec![0..3500, 3500..7000, 7000..10_000]);
        assert_eq!(deferred, 0);
    }

    #[test]
    fn test_dense_block_is_never_split() {
        // All four changes share block 6; the bound of 2 must not cut
        // through the block.
        let events = events_at_blocks(&[6, 6, 6, 6]);
        assert_eq!(
            plan(&events, 2, 2),
            BatchPlan::Commit {
                chunks: vec![0..4],
                deferred: 0
            }
        );
    }

    #[test]
    fn test_chunk_ends_snap_to_block_edges() {
        let events = events_at_blocks(&[6, 6, 6, 7, 7, 8]);
        let BatchPlan::Commit { chunks, deferred } = plan(&events, 2, 4) else {
            panic!("expected commit plan");
        };
        // The bound of 4 falls inside block 7, so the first chunk pulls
        // back to the edge after block 6.
        assert_eq!(chunks, vec![0..3, 3..6]);
        assert_eq!(deferred, 0);
    }

    #[test]
    fn test_deferred_tail_holds_whole_blocks_only() {
        let events = events_at_blocks(&[6, 6, 7]);
        let BatchPlan::Commit { chunks, deferred } = plan(&events, 2, 2) else {
            panic!("expected commit plan");
        };
        // Block 7 defers whole; no part of it rides along with block 6.
        assert_eq!(chunks, vec![0..2]);
        assert_eq!(deferred, 1);
    }

    #[test]
    fn test_block_larger_than_bound_stays_whole() {
        let events = events_at_blocks(&[5, 6, 6, 6, 6]);
        let BatchPlan::Commit { chunks, deferred } = plan(&events, 2, 2) else {
            panic!("expected commit plan");
        };
        assert_eq!(chunks, vec![0..1, 1..5]);
        assert_eq!(deferred, 0);
    }
}
