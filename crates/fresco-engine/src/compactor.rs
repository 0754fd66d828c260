//! Delta compactor: fold raw events into per-block change lists and
//! build/consume chained delta records
//!
//! Compaction requires block-ordered input (the batcher guarantees it).
//! [`extend_chain`] bounds chain length: rather than appending a tiny
//! record to the chain, a small unsealed predecessor is read back,
//! flattened, merged with the new changes and superseded by one combined
//! record.

use tracing::debug;

use fresco_core::{BlockDelta, ColorEvent, ContentRef, DeltaRecord, PixelChange};

/// Group block-ordered events into one [`BlockDelta`] per distinct block,
/// preserving emission order within each block.
pub fn compact(events: &[ColorEvent]) -> Vec<BlockDelta> {
    let mut deltas: Vec<BlockDelta> = Vec::new();

    for event in events {
        let change = PixelChange {
            pixel_id: event.pixel_id,
            color_id: event.color_id,
        };
        match deltas.last_mut() {
            Some(last) if last.block == event.block => last.changes.push(change),
            _ => {
                let mut delta = BlockDelta::new(event.block, event.timestamp);
                delta.changes.push(change);
                deltas.push(delta);
            }
        }
    }

    debug!(blocks = deltas.len(), "Compacted color events");
    deltas
}

/// Merge adjacent deltas that share a block number.
///
/// Compaction is associative with batching: compacting an ordered
/// partition of an event list chunk by chunk and merging the
/// concatenated results equals compacting the whole list at once.
pub fn merge_adjacent(deltas: Vec<BlockDelta>) -> Vec<BlockDelta> {
    let mut merged: Vec<BlockDelta> = Vec::new();
    for delta in deltas {
        match merged.last_mut() {
            Some(last) if last.block == delta.block => {
                last.changes.extend(delta.changes);
                if last.timestamp.is_none() {
                    last.timestamp = delta.timestamp;
                }
            }
            _ => merged.push(delta),
        }
    }
    merged
}

/// Flatten a delta record back into the events it was compacted from.
/// Inverse of [`compact`], used when merging a small existing record
/// with newly observed events.
pub fn expand(record: &DeltaRecord) -> Vec<ColorEvent> {
    record
        .deltas
        .iter()
        .flat_map(|delta| {
            delta.changes.iter().map(|change| ColorEvent {
                pixel_id: change.pixel_id,
                color_id: change.color_id,
                block: delta.block,
                timestamp: delta.timestamp,
            })
        })
        .collect()
}

/// Result of extending the delta chain with a new batch of deltas
#[derive(Debug, Clone, PartialEq)]
pub struct ChainExtension {
    /// The record to publish
    pub record: DeltaRecord,
    /// The record this one supersedes, if the small-delta merge applied
    pub superseded: Option<ContentRef>,
}

/// Build the next record in the delta chain.
///
/// `prev` is the most recently published record (with its address), if
/// any. When the combined change count of `prev` and the new deltas stays
/// at or below `small_threshold`, the new record absorbs the old one:
/// same base, same back-reference, inherited offset. Otherwise the new
/// record chains behind `prev` on top of `base`.
pub fn extend_chain(
    prev: Option<(ContentRef, DeltaRecord)>,
    new_deltas: Vec<BlockDelta>,
    base: ContentRef,
    small_threshold: usize,
) -> ChainExtension {
    let new_count: usize = new_deltas.iter().map(|d| d.changes.len()).sum();

    match prev {
        None => ChainExtension {
            record: DeltaRecord::new(new_deltas, None, base, 0),
            superseded: None,
        },
        Some((prev_ref, old)) if old.change_count() + new_count <= small_threshold => {
            debug!(
                superseded = %prev_ref.short_hash(),
                combined = old.change_count() + new_count,
                "Superseding small delta record"
            );
            let mut deltas = old.deltas;
            deltas.extend(new_deltas);
            ChainExtension {
                record: DeltaRecord::new(merge_adjacent(deltas), old.prev, old.base, old.base_offset),
                superseded: Some(prev_ref),
            }
        }
        Some((prev_ref, old)) => {
            // A chained record on the same base continues where the
            // previous record stopped; on a fresh base it starts at 0.
            let base_offset = if old.base == base {
                old.base_offset + old.change_count() as u64
            } else {
                0
            };
            ChainExtension {
                record: DeltaRecord::new(new_deltas, Some(prev_ref), base, base_offset),
                superseded: None,
            }
        }
    }
}
