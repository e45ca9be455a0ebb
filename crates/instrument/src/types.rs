//! Core domain type for instruments.
//!
//! An instrument is identified by a symbol (unique, immutable string) and
//! carries the trading constraints the order service and matching engine
//! validate against: price bounds, tick size, lot size, quantity bounds,
//! activity state, and an optional expiration.

use chrono::{DateTime, Utc};
use common::Decimal;
use serde::{Deserialize, Serialize};

/// A tradeable instrument and its trading constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Unique, immutable symbol (e.g. "BTC-USDT").
    pub symbol: String,
    /// Quote currency identifier (e.g. "USDT").
    pub quote_currency: String,
    /// Minimum acceptable limit price.
    pub min_price: Decimal,
    /// Maximum acceptable limit price.
    pub max_price: Decimal,
    /// Prices must be an exact multiple of this.
    pub tick_size: Decimal,
    /// Quantities must be an exact multiple of this.
    pub lot_size: Decimal,
    /// Minimum order quantity.
    pub min_quantity: Decimal,
    /// Maximum order quantity.
    pub max_quantity: Decimal,
    /// Whether new orders are currently accepted.
    pub is_active: bool,
    /// Optional expiration; past this point the instrument is inactive.
    pub expiration_date: Option<DateTime<Utc>>,
}

impl Instrument {
    /// True once `expiration_date` has passed.
    pub fn is_expired(&self) -> bool {
        match self.expiration_date {
            Some(expiry) => Utc::now() >= expiry,
            None => false,
        }
    }

    /// `isActive ∧ ¬expired` — the single gate new order acceptance checks
    /// before anything else (validation order in the order service).
    pub fn is_tradeable(&self) -> bool {
        self.is_active && !self.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample() -> Instrument {
        Instrument {
            symbol: "BTC-USDT".to_string(),
            quote_currency: "USDT".to_string(),
            min_price: Decimal::from_str("0.01").unwrap(),
            max_price: Decimal::from_str("1000000").unwrap(),
            tick_size: Decimal::from_str("0.01").unwrap(),
            lot_size: Decimal::from_str("0.0001").unwrap(),
            min_quantity: Decimal::from_str("0.0001").unwrap(),
            max_quantity: Decimal::from_str("1000").unwrap(),
            is_active: true,
            expiration_date: None,
        }
    }

    #[test]
    fn tradeable_when_active_and_not_expired() {
        assert!(sample().is_tradeable());
    }

    #[test]
    fn not_tradeable_when_inactive() {
        let mut instrument = sample();
        instrument.is_active = false;
        assert!(!instrument.is_tradeable());
    }

    #[test]
    fn not_tradeable_when_expired() {
        let mut instrument = sample();
        instrument.expiration_date = Some(Utc::now() - chrono::Duration::seconds(1));
        assert!(instrument.is_expired());
        assert!(!instrument.is_tradeable());
    }

    #[test]
    fn no_expiration_never_expires() {
        assert!(!sample().is_expired());
    }
}
