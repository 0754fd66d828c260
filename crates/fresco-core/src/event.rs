//! Canvas change events and the compacted delta chain
//!
//! The delta record wire document is versioned: field names changed across
//! upstream revisions (`bk_num` vs `bk`, `prev_delta` vs `prev`, the late
//! addition of the base offset), so documents written before the version
//! tag existed deserialize through aliases and defaults. New documents are
//! always written as [`DELTA_WIRE_VERSION`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content_ref::ContentRef;

/// Current version written into delta record documents
pub const DELTA_WIRE_VERSION: u32 = 2;

/// One ledger-recorded change of a single cell's palette index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorEvent {
    pub pixel_id: u64,
    pub color_id: u32,
    pub block: u64,
    /// Block timestamp, when the ledger provided one
    pub timestamp: Option<DateTime<Utc>>,
}

impl ColorEvent {
    pub fn new(pixel_id: u64, color_id: u32, block: u64) -> Self {
        Self {
            pixel_id,
            color_id,
            block,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A single cell change inside a block delta (wire names `i`/`c`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelChange {
    #[serde(rename = "i")]
    pub pixel_id: u64,
    #[serde(rename = "c")]
    pub color_id: u32,
}

/// All changes recorded in one ledger block, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDelta {
    #[serde(rename = "bk", alias = "bk_num")]
    pub block: u64,
    #[serde(rename = "time", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "cs")]
    pub changes: Vec<PixelChange>,
}

impl BlockDelta {
    pub fn new(block: u64, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            block,
            timestamp,
            changes: Vec::new(),
        }
    }
}

fn legacy_version() -> u32 {
    1
}

/// A compact, chained record of changes since a base snapshot.
///
/// Replaying `deltas` onto the image at `base` (skipping the first
/// `base_offset` changes already covered by earlier records in the chain)
/// yields the canvas as of the last block in `deltas`. `prev == None`
/// means this is the first record since `base` was published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaRecord {
    #[serde(rename = "v", default = "legacy_version")]
    pub version: u32,
    #[serde(rename = "delta")]
    pub deltas: Vec<BlockDelta>,
    #[serde(rename = "prev", alias = "prev_delta", default)]
    pub prev: Option<ContentRef>,
    #[serde(rename = "base", alias = "snapshot")]
    pub base: ContentRef,
    #[serde(rename = "base_offset", default)]
    pub base_offset: u64,
}

impl DeltaRecord {
    /// Build a record at the current wire version
    pub fn new(
        deltas: Vec<BlockDelta>,
        prev: Option<ContentRef>,
        base: ContentRef,
        base_offset: u64,
    ) -> Self {
        Self {
            version: DELTA_WIRE_VERSION,
            deltas,
            prev,
            base,
            base_offset,
        }
    }

    /// Total number of cell changes across all blocks
    pub fn change_count(&self) -> usize {
        self.deltas.iter().map(|d| d.changes.len()).sum()
    }

    /// Block number of the last delta, if any
    pub fn last_block(&self) -> Option<u64> {
        self.deltas.last().map(|d| d.block)
    }

    /// Serialize to the JSON wire document
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from the JSON wire document (any supported version)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Per-region canonical state held by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPointer {
    pub last_snapshot_block: u64,
    pub last_snapshot_ref: ContentRef,
}

/// Kind of artifact publication recorded by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicationKind {
    Snapshot,
    Delta,
}

impl PublicationKind {
    /// Media type hint used when mirroring the artifact into the hot store
    pub fn media_type(&self) -> &'static str {
        match self {
            PublicationKind::Snapshot => "image/png",
            PublicationKind::Delta => "application/json",
        }
    }
}

/// One artifact publication recorded by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationEvent {
    pub kind: PublicationKind,
    pub block: u64,
    pub artifact_ref: ContentRef,
}
