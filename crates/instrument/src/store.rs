//! Instrument storage trait and in-memory implementation.

use crate::error::{InstrumentError, InstrumentResult};
use crate::types::Instrument;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Storage abstraction for instruments.
///
/// Implementations can back this with any storage backend; the matching
/// engine and order service only ever see this trait.
#[async_trait]
pub trait InstrumentStore: Send + Sync {
    /// Get an instrument by its symbol.
    async fn get(&self, symbol: &str) -> InstrumentResult<Option<Instrument>>;

    /// List all known instruments.
    async fn list(&self) -> InstrumentResult<Vec<Instrument>>;

    /// Insert a new instrument. Errors if the symbol already exists.
    async fn insert(&self, instrument: Instrument) -> InstrumentResult<()>;

    /// Replace an existing instrument.
    async fn update(&self, instrument: Instrument) -> InstrumentResult<()>;

    /// Require that a symbol resolve to a tradeable instrument.
    async fn require(&self, symbol: &str) -> InstrumentResult<Instrument> {
        self.get(symbol)
            .await?
            .ok_or_else(|| InstrumentError::NotFound(symbol.to_string()))
    }
}

/// In-memory `InstrumentStore`, suitable for tests and the demo binary.
#[derive(Debug, Default)]
pub struct InMemoryInstrumentStore {
    instruments: Arc<RwLock<HashMap<String, Instrument>>>,
}

impl InMemoryInstrumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clone for InMemoryInstrumentStore {
    fn clone(&self) -> Self {
        Self {
            instruments: Arc::clone(&self.instruments),
        }
    }
}

#[async_trait]
impl InstrumentStore for InMemoryInstrumentStore {
    async fn get(&self, symbol: &str) -> InstrumentResult<Option<Instrument>> {
        Ok(self.instruments.read().get(symbol).cloned())
    }

    async fn list(&self) -> InstrumentResult<Vec<Instrument>> {
        Ok(self.instruments.read().values().cloned().collect())
    }

    async fn insert(&self, instrument: Instrument) -> InstrumentResult<()> {
        let mut instruments = self.instruments.write();
        if instruments.contains_key(&instrument.symbol) {
            return Err(InstrumentError::AlreadyExists(instrument.symbol));
        }
        instruments.insert(instrument.symbol.clone(), instrument);
        Ok(())
    }

    async fn update(&self, instrument: Instrument) -> InstrumentResult<()> {
        let mut instruments = self.instruments.write();
        if !instruments.contains_key(&instrument.symbol) {
            return Err(InstrumentError::NotFound(instrument.symbol));
        }
        instruments.insert(instrument.symbol.clone(), instrument);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample(symbol: &str) -> Instrument {
        Instrument {
            symbol: symbol.to_string(),
            quote_currency: "USDT".to_string(),
            min_price: common::Decimal::from_str("0.01").unwrap(),
            max_price: common::Decimal::from_str("1000000").unwrap(),
            tick_size: common::Decimal::from_str("0.01").unwrap(),
            lot_size: common::Decimal::from_str("0.0001").unwrap(),
            min_quantity: common::Decimal::from_str("0.0001").unwrap(),
            max_quantity: common::Decimal::from_str("1000").unwrap(),
            is_active: true,
            expiration_date: None,
        }
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = InMemoryInstrumentStore::new();
        store.insert(sample("BTC-USDT")).await.unwrap();
        assert!(store.get("BTC-USDT").await.unwrap().is_some());
        assert!(store.get("ETH-USDT").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_duplicate_rejected() {
        let store = InMemoryInstrumentStore::new();
        store.insert(sample("BTC-USDT")).await.unwrap();
        let err = store.insert(sample("BTC-USDT")).await.unwrap_err();
        assert!(matches!(err, InstrumentError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn update_missing_rejected() {
        let store = InMemoryInstrumentStore::new();
        let err = store.update(sample("BTC-USDT")).await.unwrap_err();
        assert!(matches!(err, InstrumentError::NotFound(_)));
    }

    #[tokio::test]
    async fn require_resolves_existing() {
        let store = InMemoryInstrumentStore::new();
        store.insert(sample("BTC-USDT")).await.unwrap();
        let instrument = store.require("BTC-USDT").await.unwrap();
        assert_eq!(instrument.symbol, "BTC-USDT");
    }
}
