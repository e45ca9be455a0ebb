//! # Instrument Crate
//!
//! Defines the `Instrument` domain type (symbol, price/quantity bounds,
//! tick/lot size, activity and expiration) and the `InstrumentStore`
//! trait the order service and matching engine validate against.

pub mod error;
pub mod store;
pub mod types;

pub use error::{InstrumentError, InstrumentResult};
pub use store::{InMemoryInstrumentStore, InstrumentStore};
pub use types::Instrument;
