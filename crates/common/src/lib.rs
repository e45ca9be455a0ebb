//! Shared types and utilities for the exchange core
//!
//! This crate provides the domain enums, the decimal arithmetic type, and
//! the common error type used across every crate in the core.
//!
//! # Modules
//!
//! - [`error`] - Common error type
//! - [`types`] - Shared domain enums (`Side`, `OrderType`, `TimeInForce`, `OrderStatus`, `ErrorKind`)
//! - [`decimal`] - Exact fixed-point decimal arithmetic (never `f64`)

pub mod decimal;
pub mod error;
pub mod types;

pub use decimal::{Decimal, DecimalExt};
pub use error::{Error, Result};
pub use types::*;
