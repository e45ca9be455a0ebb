//! Core domain types: price levels, order books, and trades.
//!
//! `OrderBook` exclusively owns its resting [`BookOrder`]s through per-side
//! [`PriceLevel`] queues; `order_index` holds only the `(price, side)`
//! lookup key needed to find an order's level, never a back-reference.
//! Removals always go through the index.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use common::{Decimal, Side};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MatchingError;

/// The engine's working copy of an order while it rests in, or walks
/// across, a book. A subset of the persisted `Order` record (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookOrder {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub instrument_symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub remaining_quantity: Decimal,
    /// Monotonic per-instrument acceptance order; the time-priority
    /// dimension of price-time priority. Assigned once, preserved across
    /// quantity-decrease modifications.
    pub priority: u64,
    pub time_in_force: common::TimeInForce,
}

impl BookOrder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: Uuid,
        user_id: Uuid,
        instrument_symbol: String,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        priority: u64,
        time_in_force: common::TimeInForce,
    ) -> Self {
        Self {
            order_id,
            user_id,
            instrument_symbol,
            side,
            price,
            remaining_quantity: quantity,
            priority,
            time_in_force,
        }
    }

    pub fn fill(&mut self, quantity: Decimal) {
        self.remaining_quantity = (self.remaining_quantity - quantity).max(Decimal::ZERO);
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_quantity <= Decimal::ZERO
    }
}

/// FIFO queue of orders resting at one price, plus the aggregate a reader
/// needs without rescanning the queue (spec.md §3 `PriceLevel`).
///
/// Invariant: `total_quantity == Σ order.remaining_quantity`;
/// `order_count() == ` queue length.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    orders: VecDeque<BookOrder>,
    total_quantity: Decimal,
}

impl PriceLevel {
    fn push_back(&mut self, order: BookOrder) {
        self.total_quantity += order.remaining_quantity;
        self.orders.push_back(order);
    }

    fn push_front(&mut self, order: BookOrder) {
        self.total_quantity += order.remaining_quantity;
        self.orders.push_front(order);
    }

    fn pop_front(&mut self) -> Option<BookOrder> {
        let order = self.orders.pop_front()?;
        self.total_quantity -= order.remaining_quantity;
        Some(order)
    }

    fn remove(&mut self, order_id: Uuid) -> Option<BookOrder> {
        let idx = self.orders.iter().position(|o| o.order_id == order_id)?;
        let order = self.orders.remove(idx)?;
        self.total_quantity -= order.remaining_quantity;
        Some(order)
    }

    pub fn total_quantity(&self) -> Decimal {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BookOrder> {
        self.orders.iter()
    }

    /// Aggregate quantity at this level, excluding orders owned by
    /// `user_id` — what a taker from that user could actually trade
    /// against here (self-trade prevention skips those orders).
    fn quantity_excluding(&self, user_id: Uuid) -> Decimal {
        self.orders.iter().filter(|o| o.user_id != user_id).map(|o| o.remaining_quantity).sum()
    }
}

/// One structural change to a book: a price level gained, lost, or changed
/// its aggregate quantity/order count. Fed to the market-data projection.
/// `quantity == 0` means the level was removed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookChange {
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub order_count: usize,
}

/// Trade record, immutable once produced (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub instrument_symbol: String,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub buyer_user_id: Uuid,
    pub seller_user_id: Uuid,
    pub quantity: Decimal,
    /// Execution price — always the maker's (resting order's) price.
    pub price: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instrument_symbol: String,
        buy_order_id: Uuid,
        sell_order_id: Uuid,
        buyer_user_id: Uuid,
        seller_user_id: Uuid,
        price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Self {
            trade_id: Uuid::new_v4(),
            instrument_symbol,
            buy_order_id,
            sell_order_id,
            buyer_user_id,
            seller_user_id,
            quantity,
            price,
            executed_at: Utc::now(),
        }
    }
}

/// Read-only view of one price level, used in snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevelView {
    pub price: Decimal,
    pub quantity: Decimal,
    pub order_count: usize,
}

/// Atomic point-in-time copy of a book's resting liquidity (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub instrument_symbol: String,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// Best first (highest price first).
    pub bids: Vec<PriceLevelView>,
    /// Best first (lowest price first).
    pub asks: Vec<PriceLevelView>,
}

/// Per-instrument limit order book: ordered price levels per side, plus an
/// `order_id -> (price, side)` index for O(log P) cancel/modify (spec.md
/// §3/§4.4).
#[derive(Debug, Clone)]
pub struct OrderBook {
    pub instrument_symbol: String,
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    asks: BTreeMap<Decimal, PriceLevel>,
    order_index: HashMap<Uuid, (Decimal, Side)>,
    sequence: u64,
}

impl OrderBook {
    pub fn new(instrument_symbol: String) -> Self {
        Self {
            instrument_symbol,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            order_index: HashMap::new(),
            sequence: 0,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    fn bump_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next().map(|Reverse(p)| *p)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        Some((self.best_ask()? + self.best_bid()?) / Decimal::TWO)
    }

    pub fn is_empty(&self) -> bool {
        self.order_index.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }

    pub fn contains_order(&self, order_id: Uuid) -> bool {
        self.order_index.contains_key(&order_id)
    }

    fn level_change(&self, side: Side, price: Decimal) -> BookChange {
        let level = match side {
            Side::Buy => self.bids.get(&Reverse(price)),
            Side::Sell => self.asks.get(&price),
        };
        BookChange {
            side,
            price,
            quantity: level.map(PriceLevel::total_quantity).unwrap_or(Decimal::ZERO),
            order_count: level.map(PriceLevel::order_count).unwrap_or(0),
        }
    }

    fn remove_level_if_empty(&mut self, side: Side, price: Decimal) {
        match side {
            Side::Buy => {
                if self.bids.get(&Reverse(price)).is_some_and(PriceLevel::is_empty) {
                    self.bids.remove(&Reverse(price));
                }
            }
            Side::Sell => {
                if self.asks.get(&price).is_some_and(PriceLevel::is_empty) {
                    self.asks.remove(&price);
                }
            }
        }
    }

    /// Insert a resting order at the back of its price level.
    pub fn add_order(&mut self, order: BookOrder) -> BookChange {
        let (side, price) = (order.side, order.price);
        let order_id = order.order_id;
        match side {
            Side::Buy => self.bids.entry(Reverse(price)).or_default().push_back(order),
            Side::Sell => self.asks.entry(price).or_default().push_back(order),
        }
        self.order_index.insert(order_id, (price, side));
        self.bump_sequence();
        self.level_change(side, price)
    }

    /// Remove an order by id via the index. O(log P) plus a linear scan of
    /// the (typically short) FIFO queue at that price.
    pub fn remove_order(&mut self, order_id: Uuid) -> Option<(BookOrder, BookChange)> {
        let (price, side) = self.order_index.remove(&order_id)?;
        let level = match side {
            Side::Buy => self.bids.get_mut(&Reverse(price)),
            Side::Sell => self.asks.get_mut(&price),
        }?;
        let order = level.remove(order_id)?;
        self.remove_level_if_empty(side, price);
        self.bump_sequence();
        let change = self.level_change(side, price);
        Some((order, change))
    }

    /// Update a resting order's remaining quantity in place (priority
    /// preserved). Used for quantity-decrease modifications; increases and
    /// price changes go through `remove_order` + `add_order` instead
    /// (spec.md §4.2 modify semantics).
    pub fn update_order_quantity(
        &mut self,
        order_id: Uuid,
        new_quantity: Decimal,
    ) -> Option<BookChange> {
        let (price, side) = *self.order_index.get(&order_id)?;
        let level = match side {
            Side::Buy => self.bids.get_mut(&Reverse(price)),
            Side::Sell => self.asks.get_mut(&price),
        }?;
        let order = level.orders.iter_mut().find(|o| o.order_id == order_id)?;
        let delta = new_quantity - order.remaining_quantity;
        order.remaining_quantity = new_quantity;
        level.total_quantity += delta;
        self.bump_sequence();
        Some(self.level_change(side, price))
    }

    /// Best-price-first view of resting orders on one side, by level.
    fn levels(&self, side: Side) -> Box<dyn Iterator<Item = (Decimal, &PriceLevel)> + '_> {
        match side {
            Side::Buy => Box::new(self.bids.iter().map(|(Reverse(p), lvl)| (*p, lvl))),
            Side::Sell => Box::new(self.asks.iter().map(|(p, lvl)| (*p, lvl))),
        }
    }

    fn level_mut(&mut self, side: Side, price: Decimal) -> Option<&mut PriceLevel> {
        match side {
            Side::Buy => self.bids.get_mut(&Reverse(price)),
            Side::Sell => self.asks.get_mut(&price),
        }
    }

    /// Best price on `side` that is not in `excluded`, and a mutable handle
    /// to its level. Lets a multi-level walk skip a level it already
    /// determined has nothing left to trade against (e.g. only the taker's
    /// own orders remain there) without re-visiting it forever.
    pub(crate) fn best_level_mut_excluding(
        &mut self,
        side: Side,
        excluded: &std::collections::HashSet<Decimal>,
    ) -> Option<(Decimal, &mut PriceLevel)> {
        let price = match side {
            Side::Buy => self.bids.keys().map(|Reverse(p)| *p).find(|p| !excluded.contains(p))?,
            Side::Sell => self.asks.keys().copied().find(|p| !excluded.contains(p))?,
        };
        self.level_mut(side, price).map(|lvl| (price, lvl))
    }

    pub(crate) fn pop_front_at(&mut self, side: Side, price: Decimal) -> Option<BookOrder> {
        self.level_mut(side, price).and_then(PriceLevel::pop_front)
    }

    pub(crate) fn push_front_at(&mut self, side: Side, price: Decimal, order: BookOrder) {
        if let Some(level) = self.level_mut(side, price) {
            level.push_front(order);
        }
    }

    pub(crate) fn register_removed(&mut self, order_id: Uuid) {
        self.order_index.remove(&order_id);
    }

    pub(crate) fn structural_change_after_match(&mut self, side: Side, price: Decimal) -> BookChange {
        self.remove_level_if_empty(side, price);
        self.bump_sequence();
        self.level_change(side, price)
    }

    pub fn quantity_at(&self, side: Side, price: Decimal) -> Decimal {
        match side {
            Side::Buy => self.bids.get(&Reverse(price)).map(PriceLevel::total_quantity),
            Side::Sell => self.asks.get(&price).map(PriceLevel::total_quantity),
        }
        .unwrap_or(Decimal::ZERO)
    }

    pub fn orders_at_price(&self, side: Side, price: Decimal) -> Vec<&BookOrder> {
        match side {
            Side::Buy => self.bids.get(&Reverse(price)),
            Side::Sell => self.asks.get(&price),
        }
        .map(|lvl| lvl.iter().collect())
        .unwrap_or_default()
    }

    /// Aggregate liquidity available to a Buy at or below `max_price` —
    /// the FOK pre-check for a buy taker. Excludes `taker_user_id`'s own
    /// resting orders, since self-trade prevention means the taker could
    /// never actually fill against them (spec.md §4.2).
    pub fn available_ask_quantity_at_or_below(&self, max_price: Decimal, taker_user_id: Uuid) -> Decimal {
        self.levels(Side::Sell)
            .take_while(|(price, _)| *price <= max_price)
            .map(|(_, lvl)| lvl.quantity_excluding(taker_user_id))
            .sum()
    }

    /// Aggregate liquidity available to a Sell at or above `min_price` —
    /// the FOK pre-check for a sell taker. Excludes `taker_user_id`'s own
    /// resting orders for the same reason.
    pub fn available_bid_quantity_at_or_above(&self, min_price: Decimal, taker_user_id: Uuid) -> Decimal {
        self.levels(Side::Buy)
            .take_while(|(price, _)| *price >= min_price)
            .map(|(_, lvl)| lvl.quantity_excluding(taker_user_id))
            .sum()
    }

    pub fn snapshot(&self) -> OrderBookSnapshot {
        self.snapshot_with_depth(usize::MAX)
    }

    pub fn snapshot_with_depth(&self, depth: usize) -> OrderBookSnapshot {
        let view = |price: Decimal, lvl: &PriceLevel| PriceLevelView {
            price,
            quantity: lvl.total_quantity(),
            order_count: lvl.order_count(),
        };
        OrderBookSnapshot {
            instrument_symbol: self.instrument_symbol.clone(),
            sequence: self.sequence,
            timestamp: Utc::now(),
            bids: self.levels(Side::Buy).take(depth).map(|(p, l)| view(p, l)).collect(),
            asks: self.levels(Side::Sell).take(depth).map(|(p, l)| view(p, l)).collect(),
        }
    }

    /// Checks the invariant that `order_index` and the price-level contents
    /// are mutually consistent (spec.md §8 property 8). A violation is a
    /// fatal, non-recoverable condition.
    pub fn validate_integrity(&self) -> Result<(), MatchingError> {
        for (&order_id, &(price, side)) in &self.order_index {
            let found = match side {
                Side::Buy => self.bids.get(&Reverse(price)),
                Side::Sell => self.asks.get(&price),
            }
            .map(|lvl| lvl.iter().any(|o| o.order_id == order_id))
            .unwrap_or(false);
            if !found {
                return Err(MatchingError::IntegrityViolation(format!(
                    "order {order_id} indexed at ({side:?}, {price}) but absent from that level"
                )));
            }
        }
        let mut indexed = 0usize;
        for (&price, lvl) in &self.bids {
            for order in lvl.iter() {
                indexed += 1;
                if self.order_index.get(&order.order_id) != Some(&(price.0, Side::Buy)) {
                    return Err(MatchingError::IntegrityViolation(format!(
                        "bid order {} missing or mismatched in order_index",
                        order.order_id
                    )));
                }
            }
        }
        for (&price, lvl) in &self.asks {
            for order in lvl.iter() {
                indexed += 1;
                if self.order_index.get(&order.order_id) != Some(&(price, Side::Sell)) {
                    return Err(MatchingError::IntegrityViolation(format!(
                        "ask order {} missing or mismatched in order_index",
                        order.order_id
                    )));
                }
            }
        }
        if indexed != self.order_index.len() {
            return Err(MatchingError::IntegrityViolation(
                "order_index size does not match total resting orders".to_string(),
            ));
        }
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

    fn order(side: Side, price: &str, qty: &str, priority: u64) -> BookOrder {
        BookOrder::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "BTC-USD".to_string(),
            side,
            d(price),
            d(qty),
            priority,
            common::TimeInForce::Gtc,
        )
    }

    #[test]
    fn insert_and_remove_round_trips_sequence() {
        let mut book = OrderBook::new("BTC-USD".to_string());
        let o = order(Side::Buy, "100", "1", 1);
        let id = o.order_id;
        book.add_order(o);
        assert_eq!(book.sequence(), 1);
        assert_eq!(book.best_bid(), Some(d("100")));

        let (removed, _) = book.remove_order(id).unwrap();
        assert_eq!(removed.order_id, id);
        assert_eq!(book.sequence(), 2);
        assert!(book.is_empty());
    }

    #[test]
    fn spread_and_mid_price() {
        let mut book = OrderBook::new("BTC-USD".to_string());
        book.add_order(order(Side::Buy, "99", "1", 1));
        book.add_order(order(Side::Sell, "101", "1", 2));
        assert_eq!(book.spread(), Some(d("2")));
        assert_eq!(book.mid_price(), Some(d("100")));
    }

    #[test]
    fn price_level_aggregates_track_fifo_queue() {
        let mut book = OrderBook::new("BTC-USD".to_string());
        book.add_order(order(Side::Sell, "100", "1", 1));
        book.add_order(order(Side::Sell, "100", "2", 2));
        assert_eq!(book.quantity_at(Side::Sell, d("100")), d("3"));
        assert_eq!(book.orders_at_price(Side::Sell, d("100")).len(), 2);
    }

    #[test]
    fn update_order_quantity_preserves_priority_and_updates_aggregate() {
        let mut book = OrderBook::new("BTC-USD".to_string());
        let o = order(Side::Buy, "100", "5", 1);
        let id = o.order_id;
        book.add_order(o);
        book.update_order_quantity(id, d("2"));
        assert_eq!(book.quantity_at(Side::Buy, d("100")), d("2"));
        assert_eq!(book.orders_at_price(Side::Buy, d("100"))[0].priority, 1);
    }

    #[test]
    fn fok_liquidity_walk_spans_multiple_levels() {
        let mut book = OrderBook::new("BTC-USD".to_string());
        book.add_order(order(Side::Sell, "99", "4", 1));
        book.add_order(order(Side::Sell, "100", "7", 2));
        let someone_else = Uuid::new_v4();
        assert_eq!(book.available_ask_quantity_at_or_below(d("100"), someone_else), d("11"));
        assert_eq!(book.available_ask_quantity_at_or_below(d("99"), someone_else), d("4"));
    }

    #[test]
    fn fok_liquidity_walk_excludes_takers_own_resting_orders() {
        let mut book = OrderBook::new("BTC-USD".to_string());
        let taker_user = Uuid::new_v4();
        let mut own_order = order(Side::Sell, "99", "4", 1);
        own_order.user_id = taker_user;
        book.add_order(own_order);
        book.add_order(order(Side::Sell, "100", "7", 2));
        assert_eq!(book.available_ask_quantity_at_or_below(d("100"), taker_user), d("7"));
    }

    #[test]
    fn integrity_check_passes_for_well_formed_book() {
        let mut book = OrderBook::new("BTC-USD".to_string());
        book.add_order(order(Side::Buy, "100", "1", 1));
        book.add_order(order(Side::Sell, "101", "1", 2));
        assert!(book.validate_integrity().is_ok());
    }
}
