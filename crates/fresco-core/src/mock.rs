//! In-process mock collaborators for tests and simulations
//!
//! [`MockLedger`] models the ledger's conditional-update commit semantics:
//! a commit whose assumed base block does not match the canonical pointer
//! is rejected, and a successful commit advances the pointer and appends
//! the corresponding publication events, exactly as the chain contract
//! would.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::content_ref::ContentRef;
use crate::error::{LedgerError, ScheduleError};
use crate::event::{ColorEvent, LedgerPointer, PublicationEvent, PublicationKind};
use crate::traits::{Ledger, ScheduleController};

/// A recorded `commit_snapshot` call
#[derive(Debug, Clone, PartialEq)]
pub struct CommitCall {
    pub region: u64,
    pub base_block: u64,
    pub new_block: u64,
    pub snapshot_ref: ContentRef,
    pub delta_ref: ContentRef,
}

#[derive(Debug)]
struct MockLedgerState {
    height: u64,
    pointer: LedgerPointer,
    color_events: Vec<ColorEvent>,
    publications: Vec<PublicationEvent>,
    commits: Vec<CommitCall>,
    range_queries: Vec<(u64, Option<u64>)>,
    reject_commits: bool,
    fail_wide_queries: bool,
}

/// Scriptable in-memory ledger
#[derive(Debug)]
pub struct MockLedger {
    state: Mutex<MockLedgerState>,
}

impl MockLedger {
    /// Ledger at `height` with an initial canonical pointer
    pub fn new(height: u64, pointer: LedgerPointer) -> Self {
        Self {
            state: Mutex::new(MockLedgerState {
                height,
                pointer,
                color_events: Vec::new(),
                publications: vec![PublicationEvent {
                    kind: PublicationKind::Snapshot,
                    block: pointer.last_snapshot_block,
                    artifact_ref: pointer.last_snapshot_ref,
                }],
                commits: Vec::new(),
                range_queries: Vec::new(),
                reject_commits: false,
                fail_wide_queries: false,
            }),
        }
    }

    /// Seed color events (must already be block-ordered)
    pub fn with_color_events(self, events: Vec<ColorEvent>) -> Self {
        self.state.lock().unwrap().color_events = events;
        self
    }

    /// Seed extra publication history
    pub fn with_publications(self, publications: Vec<PublicationEvent>) -> Self {
        self.state
            .lock()
            .unwrap()
            .publications
            .extend(publications);
        self
    }

    /// Reject every commit attempt
    pub fn with_rejected_commits(self) -> Self {
        self.state.lock().unwrap().reject_commits = true;
        self
    }

    /// Fail unbounded (`to == None`) range queries, as a collaborator
    /// with a block-range width limit would
    pub fn with_failing_wide_queries(self) -> Self {
        self.state.lock().unwrap().fail_wide_queries = true;
        self
    }

    /// All commits accepted so far
    pub fn commits(&self) -> Vec<CommitCall> {
        self.state.lock().unwrap().commits.clone()
    }

    /// All range queries observed, in arrival order
    pub fn range_queries(&self) -> Vec<(u64, Option<u64>)> {
        self.state.lock().unwrap().range_queries.clone()
    }

    /// Current canonical pointer
    pub fn pointer(&self) -> LedgerPointer {
        self.state.lock().unwrap().pointer
    }

    pub fn set_height(&self, height: u64) {
        self.state.lock().unwrap().height = height;
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn latest_snapshot_info(&self, _region: u64) -> Result<LedgerPointer, LedgerError> {
        Ok(self.state.lock().unwrap().pointer)
    }

    async fn query_color_events(
        &self,
        from: u64,
        to: Option<u64>,
    ) -> Result<Vec<ColorEvent>, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.range_queries.push((from, to));
        if to.is_none() && state.fail_wide_queries {
            return Err(LedgerError::RangeQuery(
                "unbounded query exceeds range limit".to_string(),
            ));
        }
        let upper = to.unwrap_or(u64::MAX);
        Ok(state
            .color_events
            .iter()
            .filter(|e| e.block >= from && e.block <= upper)
            .cloned()
            .collect())
    }

    async fn query_publication_events(
        &self,
        kind: PublicationKind,
    ) -> Result<Vec<PublicationEvent>, LedgerError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .publications
            .iter()
            .filter(|e| e.kind == kind)
            .copied()
            .collect())
    }

    async fn commit_snapshot(
        &self,
        region: u64,
        base_block: u64,
        new_block: u64,
        snapshot_ref: ContentRef,
        delta_ref: ContentRef,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.reject_commits {
            return Err(LedgerError::CommitRejected(
                "commit rejection scripted by test".to_string(),
            ));
        }
        if base_block != state.pointer.last_snapshot_block {
            return Err(LedgerError::CommitRejected(format!(
                "assumed base block {base_block} does not match canonical {}",
                state.pointer.last_snapshot_block
            )));
        }
        if new_block <= base_block {
            return Err(LedgerError::CommitRejected(format!(
                "new block {new_block} does not advance past base {base_block}"
            )));
        }
        state.pointer = LedgerPointer {
            last_snapshot_block: new_block,
            last_snapshot_ref: snapshot_ref,
        };
        state.publications.push(PublicationEvent {
            kind: PublicationKind::Snapshot,
            block: new_block,
            artifact_ref: snapshot_ref,
        });
        state.publications.push(PublicationEvent {
            kind: PublicationKind::Delta,
            block: new_block,
            artifact_ref: delta_ref,
        });
        state.commits.push(CommitCall {
            region,
            base_block,
            new_block,
            snapshot_ref,
            delta_ref,
        });
        Ok(())
    }

    async fn current_block_height(&self) -> Result<u64, LedgerError> {
        Ok(self.state.lock().unwrap().height)
    }
}

/// Schedule controller that records every interval change
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    intervals: Mutex<Vec<u32>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// All intervals set so far, in order
    pub fn intervals(&self) -> Vec<u32> {
        self.intervals.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScheduleController for RecordingScheduler {
    async fn set_interval(&self, minutes: u32) -> Result<(), ScheduleError> {
        self.intervals.lock().unwrap().push(minutes);
        Ok(())
    }
}
