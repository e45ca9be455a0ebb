//! Market-Data Projection for the exchange core (spec.md §4.5, component G)
//!
//! Derives point-in-time order-book snapshots and incremental
//! sequence-numbered deltas from the matching engine's per-instrument book,
//! and fans the delta stream out to downstream consumers over a bounded
//! channel. Derivatives pricing (Black-Scholes/Greeks/vol-surface/mark
//! price/index price) and candle aggregation are out of this crate's
//! scope — margin/derivatives accounting and candle aggregation are
//! explicit non-goals of the core this crate projects.

pub mod error;
pub mod hub;
pub mod types;

pub use error::MarketDataError;
pub use hub::MarketDataHub;
pub use types::{DeltaChange, MarketDataDelta, OrderBookSnapshot, PriceLevel, Replica};

/// Result type for market data operations
pub type Result<T> = std::result::Result<T, MarketDataError>;
