//! Storage error types

use thiserror::Error;

/// Errors that can occur during persistence operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Record not found.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Insert would create a duplicate (e.g. a trade id already committed).
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// A commit would violate an account invariant (balance would go
    /// negative, `total != available + reserved`, etc). No part of the
    /// write set was applied.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The commit did not complete within its configured timeout. Treated
    /// as failed; caller must roll back any in-memory book change
    /// (spec.md §5).
    #[error("commit timed out")]
    CommitTimeout,
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
