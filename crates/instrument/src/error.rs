//! Error types for the instrument crate.

use thiserror::Error;

/// Result type alias for instrument operations.
pub type InstrumentResult<T> = Result<T, InstrumentError>;

/// Errors that can occur in instrument operations.
#[derive(Error, Debug, Clone)]
pub enum InstrumentError {
    /// Instrument not found.
    #[error("instrument not found: {0}")]
    NotFound(String),

    /// Instrument already exists.
    #[error("instrument already exists: {0}")]
    AlreadyExists(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<InstrumentError> for common::ErrorKind {
    fn from(err: InstrumentError) -> Self {
        match err {
            InstrumentError::NotFound(_) => common::ErrorKind::OrderNotFound,
            InstrumentError::AlreadyExists(_) | InstrumentError::Internal(_) => {
                common::ErrorKind::InvalidOrder
            }
        }
    }
}
