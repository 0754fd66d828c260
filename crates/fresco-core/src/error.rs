//! Error types shared across the Fresco crates

use thiserror::Error;

/// Errors from the durable or hot object stores.
///
/// Storage failures are fatal for the invocation; any retry policy
/// belongs to the store implementation, not the engine.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during a store operation
    #[error("I/O error: {0}")]
    Io(String),

    /// Requested artifact was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Artifact exceeds the store's size limit
    #[error("Capacity exceeded")]
    CapacityExceeded,

    /// Error during serialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error during deserialization (includes hash mismatches)
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Object key is not acceptable to the store
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl StorageError {
    /// Create a new NotFound error
    pub fn not_found(item: impl Into<String>) -> Self {
        Self::NotFound(item.into())
    }

    /// Create a new Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a new Deserialization error
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization(message.into())
    }

    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }
}

/// Errors from the ledger collaborator.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A block-range event query failed (range too wide, too many
    /// results, or a transport fault). The event batcher retries once
    /// with an explicit bounded range before this becomes fatal.
    #[error("Range query failed: {0}")]
    RangeQuery(String),

    /// The ledger rejected a snapshot commit, typically because the
    /// assumed base block no longer matches the canonical pointer.
    #[error("Commit rejected: {0}")]
    CommitRejected(String),

    /// Any other ledger RPC failure
    #[error("Ledger error: {0}")]
    Rpc(String),
}

/// Errors from the schedule controller.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Failed to update schedule: {0}")]
    Update(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::Io(_)));
    }

    #[test]
    fn test_not_found_error() {
        let err = StorageError::not_found("abc123");
        assert!(err.to_string().contains("abc123"));
    }

    #[test]
    fn test_commit_rejected_display() {
        let err = LedgerError::CommitRejected("stale base block".to_string());
        assert!(err.to_string().contains("stale base block"));
    }
}
