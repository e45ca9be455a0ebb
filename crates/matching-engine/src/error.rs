//! Matching engine error types

use thiserror::Error;

/// Errors that can occur during order matching.
#[derive(Error, Debug)]
pub enum MatchingError {
    /// Invalid order (rejected before touching the book).
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Order not found on the instrument's book.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// Book integrity check failed mid-match. Fatal: never attempt partial
    /// recovery, abort and surface (spec.md §4.2 failure semantics).
    #[error("book integrity violation: {0}")]
    IntegrityViolation(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<MatchingError> for common::ErrorKind {
    fn from(err: MatchingError) -> Self {
        match err {
            MatchingError::InvalidOrder(_) => common::ErrorKind::InvalidOrder,
            MatchingError::OrderNotFound(_) => common::ErrorKind::OrderNotFound,
            MatchingError::IntegrityViolation(_) | MatchingError::Internal(_) => {
                common::ErrorKind::InvalidOrder
            }
        }
    }
}
