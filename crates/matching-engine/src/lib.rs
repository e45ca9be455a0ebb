//! Price-time priority limit order book and matching engine for the
//! exchange core.
//!
//! # Architecture
//!
//! The matching engine exposes a synchronous operation model per
//! instrument: `(book_state, order) -> (new_book_state, trades)`. Given the
//! same sequence of inputs it always produces the same outputs — this
//! determinism is what lets the event log double as a replay/crash-recovery
//! mechanism. Concurrency across instruments comes from running separate
//! `MatchingEngine` instances (or shards) in parallel, never from
//! suspending mid-match.
//!
//! ## Core components
//!
//! - [`domain`] — `BookOrder`, `PriceLevel`, `OrderBook`, `Trade`.
//! - [`engine`] — the matching algorithm: crossing, self-trade prevention,
//!   time-in-force handling, cancel/modify.
//! - [`result`] — outcome types for `processOrder`/`cancelOrder`.
//! - [`event`] / [`log`] — deterministic event log for replay.
//! - [`metrics`] — engine-local counters/histograms.

pub mod domain;
pub mod engine;
pub mod error;
pub mod event;
pub mod log;
pub mod metrics;
pub mod result;

pub use domain::{BookChange, BookOrder, OrderBook, OrderBookSnapshot, PriceLevel, PriceLevelView, Trade};
pub use engine::MatchingEngine;
pub use error::MatchingError;
pub use event::MatchingEvent;
pub use log::{create_event_log, EventLog, SharedEventLog};
pub use metrics::{MatchingEngineMetrics, MetricsSnapshot};
pub use result::{CancelResult, MatchResult, RejectedReason};
