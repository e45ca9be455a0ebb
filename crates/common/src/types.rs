//! Domain enums shared by every crate in the exchange core.

use serde::{Deserialize, Serialize};

/// Which side of the book an order rests on or trades against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Side::Buy)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Order type. Stop orders are out of scope for this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Limit,
    Market,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Limit => write!(f, "limit"),
            OrderType::Market => write!(f, "market"),
        }
    }
}

/// How long an order remains active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good Till Cancel - remains in book until filled or cancelled.
    #[default]
    Gtc,
    /// Immediate or Cancel - fill what's available now, cancel the rest.
    Ioc,
    /// Fill or Kill - fill the entire order now, or cancel all of it.
    Fok,
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Ioc => write!(f, "IOC"),
            TimeInForce::Fok => write!(f, "FOK"),
        }
    }
}

/// Lifecycle status of a persisted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Resting in the book, unfilled.
    Working,
    /// Resting in the book, partially filled.
    PartiallyFilled,
    /// Terminal: fully filled.
    Filled,
    /// Terminal: cancelled (explicitly, or IOC/FOK residual discarded).
    Cancelled,
    /// Terminal: rejected before ever entering the book.
    Rejected,
    /// Terminal: expired (time-based, reserved for future TIF support).
    Expired,
}

impl OrderStatus {
    /// `status ∈ {Working, PartiallyFilled} ⇒ order is in book` (spec.md §3).
    pub fn is_resting(&self) -> bool {
        matches!(self, OrderStatus::Working | OrderStatus::PartiallyFilled)
    }

    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Cancelled
                | OrderStatus::Rejected
                | OrderStatus::Expired
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Working => write!(f, "working"),
            OrderStatus::PartiallyFilled => write!(f, "partially_filled"),
            OrderStatus::Filled => write!(f, "filled"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Rejected => write!(f, "rejected"),
            OrderStatus::Expired => write!(f, "expired"),
        }
    }
}

/// The structured error codes the core surfaces at its boundary (spec.md §6).
/// Every crate-local error type converts into one of these at the edge
/// rather than leaking its own representation to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidOrder,
    InsufficientBalance,
    InstrumentInactive,
    OrderSizeTooSmall,
    OrderSizeTooLarge,
    PriceOutOfRange,
    TickSizeViolation,
    LotSizeViolation,
    OrderNotFound,
    OrderAlreadyTerminal,
    Forbidden,
    NoLiquidity,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
