//! The publishing side of the projection: turns a matching engine's
//! `BookChange`s into sequence-numbered `MarketDataDelta`s and fans them
//! out to subscribers over a bounded channel (spec.md §4.5, §9 "bounded
//! projection channel" — no shared mutable subscriber state).

use std::collections::HashMap;

use chrono::Utc;
use matching_engine::BookChange;
use tokio::sync::broadcast;
use tracing::debug;

use crate::types::MarketDataDelta;

/// Deltas a slow subscriber hasn't drained yet are dropped rather than
/// blocking the engine; a dropped delta means that subscriber must fetch
/// a fresh snapshot (spec.md §4.5 gap handling).
const CHANNEL_CAPACITY: usize = 1024;

/// Per-instrument fan-out of market-data deltas. One instance is shared by
/// an `OrderService` and every downstream consumer that wants a live feed.
pub struct MarketDataHub {
    channels: parking_lot::RwLock<HashMap<String, broadcast::Sender<MarketDataDelta>>>,
}

impl MarketDataHub {
    pub fn new() -> Self {
        Self {
            channels: parking_lot::RwLock::new(HashMap::new()),
        }
    }

    fn sender_for(&self, symbol: &str) -> broadcast::Sender<MarketDataDelta> {
        if let Some(tx) = self.channels.read().get(symbol) {
            return tx.clone();
        }
        let mut channels = self.channels.write();
        channels
            .entry(symbol.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Subscribe to `symbol`'s delta stream. A fresh snapshot should be
    /// taken before or immediately after subscribing so the consumer can
    /// align the first applied delta's sequence to it.
    pub fn subscribe(&self, symbol: &str) -> broadcast::Receiver<MarketDataDelta> {
        self.sender_for(symbol).subscribe()
    }

    /// Publishes the changes produced by one structural book mutation.
    /// `sequence` must be the book's sequence immediately after the
    /// mutation (spec.md §4.5). A no-op if `changes` is empty — rejected
    /// orders and quantity-only modifies with nothing to report don't
    /// advance the delta stream.
    pub fn publish(&self, symbol: &str, sequence: u64, changes: &[BookChange]) {
        if changes.is_empty() {
            return;
        }
        let delta = MarketDataDelta {
            symbol: symbol.to_string(),
            sequence,
            timestamp: Utc::now(),
            changes: changes.iter().copied().map(Into::into).collect(),
        };
        debug!(symbol, sequence, changes = delta.changes.len(), "publishing market data delta");
        // No receivers is the common case outside of tests; the engine
        // never blocks on, or cares about, subscriber presence.
        let _ = self.sender_for(symbol).send(delta);
    }
}

impl Default for MarketDataHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Decimal, Side};
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let hub = MarketDataHub::new();
        hub.publish(
            "BTC-USD",
            1,
            &[BookChange { side: Side::Buy, price: d("100"), quantity: d("1"), order_count: 1 }],
        );
    }

    #[tokio::test]
    async fn subscriber_receives_published_delta_in_order() {
        let hub = MarketDataHub::new();
        let mut rx = hub.subscribe("BTC-USD");

        hub.publish(
            "BTC-USD",
            1,
            &[BookChange { side: Side::Buy, price: d("100"), quantity: d("1"), order_count: 1 }],
        );
        hub.publish(
            "BTC-USD",
            2,
            &[BookChange { side: Side::Buy, price: d("100"), quantity: Decimal::ZERO, order_count: 0 }],
        );

        let first = rx.recv().await.unwrap();
        assert_eq!(first.sequence, 1);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.sequence, 2);
    }

    #[test]
    fn empty_changes_are_not_published() {
        let hub = MarketDataHub::new();
        let mut rx = hub.subscribe("BTC-USD");
        hub.publish("BTC-USD", 1, &[]);
        assert!(rx.try_recv().is_err());
    }
}
