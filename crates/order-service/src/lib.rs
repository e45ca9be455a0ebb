//! Order validation, sequencing, and the atomic commit boundary between
//! the matching engine and durable storage (spec.md §4.3).
//!
//! # Features
//!
//! - Pre-engine validation: instrument state, price/tick/lot/quantity bounds,
//!   account state, balance reservation.
//! - Sequencing through the owned `MatchingEngine`'s per-instrument priority
//!   counter.
//! - Single atomic commit of order/trade/balance/position changes through a
//!   `storage::PersistencePort`, with in-memory rollback on commit failure.

pub mod accounting;
pub mod error;
pub mod manager;
pub mod types;

pub use error::{OrderServiceError, OrderServiceResult};
pub use manager::OrderService;
pub use types::{
    CancelResponse, ModifyOrderRequest, ModifyOrderResponse, OrderFilter, PlaceOrderRequest,
    PlaceOrderResponse,
};
