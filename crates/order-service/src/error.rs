//! Order service error types.
//!
//! Every rejection path carries a structured §7 error code rather than a
//! bare string, so the typed result value is the only way an error ever
//! leaves the core (no swallowed errors, no transport-shaped strings).

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum OrderServiceError {
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("instrument inactive: {0}")]
    InstrumentInactive(String),

    #[error("order size too small: {0}")]
    OrderSizeTooSmall(String),

    #[error("order size too large: {0}")]
    OrderSizeTooLarge(String),

    #[error("price out of range: {0}")]
    PriceOutOfRange(String),

    #[error("tick size violation: {0}")]
    TickSizeViolation(String),

    #[error("lot size violation: {0}")]
    LotSizeViolation(String),

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("order already in a terminal state: {0}")]
    OrderAlreadyTerminal(Uuid),

    #[error("forbidden: order {0} does not belong to this user")]
    Forbidden(Uuid),

    #[error("no liquidity available for instrument {0}")]
    NoLiquidity(String),

    /// Persistence commit failed or timed out; caller may retry with a
    /// fresh idempotency key (spec.md §7 "Transient errors").
    #[error("commit failed: {0}")]
    CommitFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type OrderServiceResult<T> = std::result::Result<T, OrderServiceError>;

impl From<instrument::InstrumentError> for OrderServiceError {
    fn from(err: instrument::InstrumentError) -> Self {
        match err {
            instrument::InstrumentError::NotFound(symbol) => {
                OrderServiceError::InstrumentInactive(symbol)
            }
            other => OrderServiceError::Internal(other.to_string()),
        }
    }
}

impl From<storage::StorageError> for OrderServiceError {
    fn from(err: storage::StorageError) -> Self {
        OrderServiceError::CommitFailed(err.to_string())
    }
}

impl From<matching_engine::MatchingError> for OrderServiceError {
    fn from(err: matching_engine::MatchingError) -> Self {
        OrderServiceError::InvalidOrder(err.to_string())
    }
}

impl From<OrderServiceError> for common::ErrorKind {
    fn from(err: OrderServiceError) -> Self {
        match err {
            OrderServiceError::InvalidOrder(_) => common::ErrorKind::InvalidOrder,
            OrderServiceError::InsufficientBalance(_) => common::ErrorKind::InsufficientBalance,
            OrderServiceError::InstrumentInactive(_) => common::ErrorKind::InstrumentInactive,
            OrderServiceError::OrderSizeTooSmall(_) => common::ErrorKind::OrderSizeTooSmall,
            OrderServiceError::OrderSizeTooLarge(_) => common::ErrorKind::OrderSizeTooLarge,
            OrderServiceError::PriceOutOfRange(_) => common::ErrorKind::PriceOutOfRange,
            OrderServiceError::TickSizeViolation(_) => common::ErrorKind::TickSizeViolation,
            OrderServiceError::LotSizeViolation(_) => common::ErrorKind::LotSizeViolation,
            OrderServiceError::OrderNotFound(_) => common::ErrorKind::OrderNotFound,
            OrderServiceError::OrderAlreadyTerminal(_) => common::ErrorKind::OrderAlreadyTerminal,
            OrderServiceError::Forbidden(_) => common::ErrorKind::Forbidden,
            OrderServiceError::NoLiquidity(_) => common::ErrorKind::NoLiquidity,
            OrderServiceError::CommitFailed(_) | OrderServiceError::Internal(_) => {
                common::ErrorKind::InvalidOrder
            }
        }
    }
}
