//! Market-data projection error types

use thiserror::Error;

/// Errors surfaced by the market-data projection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketDataError {
    /// A delta arrived out of order; the replica is stale and needs a
    /// fresh snapshot before it can resume applying deltas (spec.md §4.5).
    #[error("sequence gap: expected {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },

    /// No book exists yet for the requested instrument.
    #[error("no market data for instrument: {0}")]
    UnknownInstrument(String),
}

/// Result type for market data operations
pub type Result<T> = std::result::Result<T, MarketDataError>;
