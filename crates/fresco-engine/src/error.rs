//! Engine error taxonomy
//!
//! "Too few blocks" and "too few events" are NOT errors; they are normal
//! early-exit outcomes reported through
//! [`CycleOutcome`](crate::cycle::CycleOutcome).

use thiserror::Error;

use fresco_core::{LedgerError, ScheduleError, StorageError};

/// Fatal errors for a snapshot cycle (or a chunk within one)
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required parameter is invalid (e.g. a zero confirmation depth).
    /// Checked before any I/O is performed.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// PNG encode/decode failure
    #[error("Canvas codec error: {0}")]
    Codec(String),

    /// Hot or durable store failure; not retried inside the engine
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Ledger failure, including rejected commits
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Schedule controller failure
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl EngineError {
    pub(crate) fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }

    /// Whether this error is a ledger commit rejection
    pub fn is_commit_rejected(&self) -> bool {
        matches!(self, EngineError::Ledger(LedgerError::CommitRejected(_)))
    }
}
