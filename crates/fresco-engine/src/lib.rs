//! Incremental snapshot engine for an event-sourced pixel canvas
//!
//! The engine periodically materializes the canvas state recorded by an
//! append-only ledger into a PNG artifact, publishes it together with a
//! content-addressed delta chain, and commits the new canonical pointer
//! back to the ledger. One [`SnapshotEngine::run_cycle`] invocation:
//!
//! 1. reads the canonical [`LedgerPointer`](fresco_core::LedgerPointer)
//! 2. repairs the hot cache from durable storage if it fell out of sync
//! 3. batches new color events across the block range, working around
//!    per-query limits with bounded-concurrency sub-queries
//! 4. adapts the polling cadence to observed activity
//! 5. plans the batch (defer, single commit, or split into safe chunks)
//! 6. materializes each chunk: paint, encode, upload, commit
//!
//! Cycles are single control flows; the only internal parallelism is the
//! event batcher's fan-out. Concurrent cycles against the same region are
//! arbitrated solely by the ledger's conditional-update commit semantics.

pub mod batcher;
pub mod cadence;
pub mod canvas;
pub mod compactor;
pub mod cycle;
pub mod error;
pub mod materializer;
pub mod planner;
pub mod repair;

pub use batcher::EventBatcher;
pub use cadence::CadencePolicy;
pub use canvas::CanvasCodec;
pub use compactor::{compact, expand, extend_chain, merge_adjacent, ChainExtension};
pub use cycle::{CycleOutcome, EngineConfig, SnapshotEngine};
pub use error::EngineError;
pub use materializer::{materialize, CommitRecord, MaterializeRequest};
pub use planner::{plan, BatchPlan};
pub use repair::repair_if_missing;
