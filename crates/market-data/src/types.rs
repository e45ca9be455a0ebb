//! Wire types for the market-data projection (spec.md §4.5/§6).
//!
//! These mirror `matching_engine::domain::{OrderBookSnapshot, BookChange}`
//! but are the crate's own public shape so a transport layer can serialize
//! them without depending on the engine's internal book representation.

use chrono::{DateTime, Utc};
use common::{Decimal, Side};
use serde::{Deserialize, Serialize};

/// One aggregated price level, best-first within its side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
    pub order_count: usize,
}

/// Atomic point-in-time view of a book's resting liquidity, with the
/// sequence it reflects. Bids descending, asks ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderBookSnapshot {
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        Some((self.best_ask()? + self.best_bid()?) / Decimal::TWO)
    }

    /// Applies one delta's changes in place. `quantity == 0` removes the
    /// level; anything else upserts it. Used by consumers maintaining a
    /// snapshot + delta-stream replica (spec.md §4.5).
    fn apply(&mut self, delta: &MarketDataDelta) {
        for change in &delta.changes {
            let levels = match change.side {
                Side::Buy => &mut self.bids,
                Side::Sell => &mut self.asks,
            };
            levels.retain(|l| l.price != change.price);
            if !change.quantity.is_zero() {
                levels.push(PriceLevel {
                    price: change.price,
                    quantity: change.quantity,
                    order_count: change.order_count,
                });
            }
            match change.side {
                Side::Buy => levels.sort_by_key(|l| std::cmp::Reverse(l.price)),
                Side::Sell => levels.sort_by_key(|l| l.price),
            }
        }
        self.sequence = delta.sequence;
        self.timestamp = delta.timestamp;
    }
}

impl From<matching_engine::OrderBookSnapshot> for OrderBookSnapshot {
    fn from(s: matching_engine::OrderBookSnapshot) -> Self {
        let view = |v: matching_engine::PriceLevelView| PriceLevel {
            price: v.price,
            quantity: v.quantity,
            order_count: v.order_count,
        };
        Self {
            symbol: s.instrument_symbol,
            sequence: s.sequence,
            timestamp: s.timestamp,
            bids: s.bids.into_iter().map(view).collect(),
            asks: s.asks.into_iter().map(view).collect(),
        }
    }
}

/// One price level's change within a delta. `quantity == 0` means "remove
/// this price level" (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaChange {
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub order_count: usize,
}

impl From<matching_engine::BookChange> for DeltaChange {
    fn from(c: matching_engine::BookChange) -> Self {
        Self {
            side: c.side,
            price: c.price,
            quantity: c.quantity,
            order_count: c.order_count,
        }
    }
}

/// An ordered batch of structural changes, tagged with the sequence the
/// book reached immediately after producing them. A consumer holding
/// snapshot@S applies deltas@S+1, S+2, … to stay consistent; a gap in
/// sequence means the replica is stale and needs a fresh snapshot
/// (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataDelta {
    pub symbol: String,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub changes: Vec<DeltaChange>,
}

/// A consumer-side replica: a snapshot kept current by applying a stream
/// of deltas, rejecting anything that would leave a sequence gap.
#[derive(Debug, Clone)]
pub struct Replica {
    snapshot: OrderBookSnapshot,
}

impl Replica {
    pub fn from_snapshot(snapshot: OrderBookSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &OrderBookSnapshot {
        &self.snapshot
    }

    /// Applies `delta` if it is the next expected sequence; otherwise
    /// leaves the replica untouched and reports the gap.
    pub fn apply(&mut self, delta: &MarketDataDelta) -> Result<(), crate::MarketDataError> {
        let expected = self.snapshot.sequence + 1;
        if delta.sequence != expected {
            return Err(crate::MarketDataError::SequenceGap {
                expected,
                got: delta.sequence,
            });
        }
        self.snapshot.apply(delta);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn empty_snapshot() -> OrderBookSnapshot {
        OrderBookSnapshot {
            symbol: "BTC-USD".to_string(),
            sequence: 0,
            timestamp: Utc::now(),
            bids: vec![],
            asks: vec![],
        }
    }

    #[test]
    fn replica_applies_insert_then_remove() {
        let mut replica = Replica::from_snapshot(empty_snapshot());
        replica
            .apply(&MarketDataDelta {
                symbol: "BTC-USD".to_string(),
                sequence: 1,
                timestamp: Utc::now(),
                changes: vec![DeltaChange {
                    side: Side::Buy,
                    price: d("100"),
                    quantity: d("5"),
                    order_count: 1,
                }],
            })
            .unwrap();
        assert_eq!(replica.snapshot().bids.len(), 1);
        assert_eq!(replica.snapshot().bids[0].quantity, d("5"));

        replica
            .apply(&MarketDataDelta {
                symbol: "BTC-USD".to_string(),
                sequence: 2,
                timestamp: Utc::now(),
                changes: vec![DeltaChange {
                    side: Side::Buy,
                    price: d("100"),
                    quantity: Decimal::ZERO,
                    order_count: 0,
                }],
            })
            .unwrap();
        assert!(replica.snapshot().bids.is_empty());
    }

    #[test]
    fn replica_rejects_sequence_gap() {
        let mut replica = Replica::from_snapshot(empty_snapshot());
        let err = replica
            .apply(&MarketDataDelta {
                symbol: "BTC-USD".to_string(),
                sequence: 3,
                timestamp: Utc::now(),
                changes: vec![],
            })
            .unwrap_err();
        assert!(matches!(
            err,
            crate::MarketDataError::SequenceGap { expected: 1, got: 3 }
        ));
    }

    #[test]
    fn snapshot_derives_spread_and_mid() {
        let snapshot = OrderBookSnapshot {
            symbol: "BTC-USD".to_string(),
            sequence: 1,
            timestamp: Utc::now(),
            bids: vec![PriceLevel { price: d("99"), quantity: d("1"), order_count: 1 }],
            asks: vec![PriceLevel { price: d("101"), quantity: d("1"), order_count: 1 }],
        };
        assert_eq!(snapshot.spread(), Some(d("2")));
        assert_eq!(snapshot.mid_price(), Some(d("100")));
    }
}
