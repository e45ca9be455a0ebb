//! Core matching algorithm.
//!
//! CRITICAL PROPERTIES:
//! 1. Deterministic (same inputs → same outputs, always).
//! 2. Per-instrument isolation (books never interact).
//! 3. Strict price-time priority within a book.
//! 4. Self-trade prevention: a user never trades against their own resting
//!    order (skip-maker — see spec.md §9 open question).

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use common::{Decimal, Side};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{BookOrder, OrderBook, Trade};
use crate::error::MatchingError;
use crate::event::MatchingEvent;
use crate::log::EventLog;
use crate::metrics::{MatchingEngineMetrics, MetricsSnapshot};
use crate::result::{CancelResult, MatchResult, RejectedReason};

/// The matching engine: one order book per instrument, a monotonic
/// per-instrument priority counter, and an optional metrics sink.
///
/// Exposes a synchronous operation model per instrument (spec.md §9):
/// concurrency across instruments comes from running separate engine
/// instances in parallel, never from suspending mid-match.
pub struct MatchingEngine {
    books: HashMap<String, OrderBook>,
    /// Next priority to assign, per instrument. A single matching-engine
    /// instance owns one instrument's book, so one counter per instrument
    /// suffices (spec.md §5).
    priority_counters: HashMap<String, u64>,
    metrics: Option<MatchingEngineMetrics>,
    /// Deterministic log of every structural mutation, keyed by the book's
    /// own per-instrument sequence — replaying it against a snapshot take
    /// before the first logged event reproduces the current book state
    /// exactly (spec.md §8 snapshot+replay property).
    event_log: EventLog,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self {
            books: HashMap::new(),
            priority_counters: HashMap::new(),
            metrics: None,
            event_log: EventLog::new(),
        }
    }

    pub fn new_with_metrics() -> Self {
        Self {
            books: HashMap::new(),
            priority_counters: HashMap::new(),
            metrics: Some(MatchingEngineMetrics::new()),
            event_log: EventLog::new(),
        }
    }

    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.metrics.as_ref().map(MatchingEngineMetrics::snapshot)
    }

    /// Events recorded from `from_sequence` onwards, across all instruments.
    pub fn events_from(&self, from_sequence: u64) -> Vec<MatchingEvent> {
        self.event_log.get_from(from_sequence)
    }

    fn get_or_create_book(&mut self, instrument_symbol: &str) -> &mut OrderBook {
        self.books
            .entry(instrument_symbol.to_string())
            .or_insert_with(|| OrderBook::new(instrument_symbol.to_string()))
    }

    /// Assign the next monotonic priority for `instrument_symbol`. Callers
    /// must assign priority before insertion into the book (spec.md §4.3
    /// sequencing).
    pub fn next_priority(&mut self, instrument_symbol: &str) -> u64 {
        let counter = self.priority_counters.entry(instrument_symbol.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn get_book(&self, instrument_symbol: &str) -> Option<&OrderBook> {
        self.books.get(instrument_symbol)
    }

    pub fn has_book(&self, instrument_symbol: &str) -> bool {
        self.books.contains_key(instrument_symbol)
    }

    pub fn instruments(&self) -> Vec<String> {
        self.books.keys().cloned().collect()
    }

    pub fn remove_empty_book(&mut self, instrument_symbol: &str) -> bool {
        if self.books.get(instrument_symbol).is_some_and(OrderBook::is_empty) {
            self.books.remove(instrument_symbol);
            true
        } else {
            false
        }
    }

    /// `processOrder` (spec.md §4.2): match `order` against the book for
    /// its instrument, producing trades and a residual disposition.
    ///
    /// Caller must have already assigned `order.priority` via
    /// `next_priority` before calling this.
    pub fn process_order(&mut self, order: BookOrder) -> MatchResult {
        let start = Instant::now();
        if let Some(ref metrics) = self.metrics {
            metrics.record_order_received();
        }

        info!(
            order_id = %order.order_id,
            instrument = %order.instrument_symbol,
            side = ?order.side,
            price = %order.price,
            quantity = %order.remaining_quantity,
            "processing order"
        );

        let instrument_symbol = order.instrument_symbol.clone();

        // FOK pre-check: validate aggregate liquidity before touching the book.
        if order.time_in_force == common::TimeInForce::Fok {
            let book = self.get_or_create_book(&instrument_symbol);
            let available = match order.side {
                Side::Buy => book.available_ask_quantity_at_or_below(order.price, order.user_id),
                Side::Sell => book.available_bid_quantity_at_or_above(order.price, order.user_id),
            };
            if available < order.remaining_quantity {
                info!(order_id = %order.order_id, "FOK order rejected: insufficient liquidity");
                return MatchResult::rejected(order, RejectedReason::FokUnfillable);
            }
        }

        let maker_side = order.side.opposite();
        let result = self.match_against(&instrument_symbol, order, maker_side);

        if let Some(ref metrics) = self.metrics {
            metrics.record_latency(start.elapsed());
            for _ in &result.trades {
                metrics.record_trade();
            }
            if result.has_trades() {
                metrics.record_order_matched();
            } else if result.rejected_reason.is_some() {
                metrics.record_order_rejected();
            }
            if let Some(book) = self.books.get(&instrument_symbol) {
                metrics.set_order_book_depth(book.order_count() as u64);
            }
        }

        let sequence = self.books.get(&instrument_symbol).map(OrderBook::sequence).unwrap_or(0);
        for trade in &result.trades {
            self.event_log.append(MatchingEvent::TradeExecuted { trade: trade.clone(), sequence });
        }
        if let Some(ref residual) = result.residual {
            if result.residual_rests_in_book {
                self.event_log.append(MatchingEvent::OrderAccepted {
                    order_id: residual.order_id,
                    instrument_symbol: instrument_symbol.clone(),
                    sequence,
                });
            }
        }

        result
    }

    /// Walk the opposite side's price levels in best-price order, matching
    /// FIFO within each level, skipping any resting order owned by the
    /// taker (self-trade prevention).
    fn match_against(&mut self, instrument_symbol: &str, mut taker: BookOrder, maker_side: Side) -> MatchResult {
        let mut trades = Vec::new();
        let mut book_changes = Vec::new();

        {
            let book = self.get_or_create_book(instrument_symbol);
            let mut exhausted_levels: HashSet<Decimal> = HashSet::new();
            'walk: loop {
                let Some((level_price, _)) = book.best_level_mut_excluding(maker_side, &exhausted_levels) else {
                    break;
                };

                let crosses = match taker.side {
                    Side::Buy => level_price <= taker.price,
                    Side::Sell => level_price >= taker.price,
                };
                if !crosses {
                    break;
                }

                // Walk the FIFO queue at this level, skipping self-trades,
                // until we either exhaust the level or fill the taker.
                let mut skipped = Vec::new();
                loop {
                    let Some(mut maker) = book.pop_front_at(maker_side, level_price) else {
                        break;
                    };

                    if maker.user_id == taker.user_id {
                        // Self-trade prevention: skip, do not trade, do not
                        // cancel the maker (spec.md §4.2 adopted policy).
                        skipped.push(maker);
                        continue;
                    }

                    let trade_qty = taker.remaining_quantity.min(maker.remaining_quantity);
                    taker.fill(trade_qty);
                    maker.fill(trade_qty);

                    let (buy_order_id, sell_order_id, buyer_user_id, seller_user_id) = match taker.side {
                        Side::Buy => (taker.order_id, maker.order_id, taker.user_id, maker.user_id),
                        Side::Sell => (maker.order_id, taker.order_id, maker.user_id, taker.user_id),
                    };
                    trades.push(Trade::new(
                        instrument_symbol.to_string(),
                        buy_order_id,
                        sell_order_id,
                        buyer_user_id,
                        seller_user_id,
                        maker.price, // maker's price — price improvement for the taker
                        trade_qty,
                    ));

                    if !maker.is_filled() {
                        book.push_front_at(maker_side, level_price, maker);
                    } else {
                        book.register_removed(maker.order_id);
                    }

                    if taker.is_filled() {
                        break;
                    }
                }
                // If the inner loop ran out of orders to pop (rather than
                // filling the taker) while some were skipped as self-trades,
                // those self-orders are the only thing left at this price —
                // restoring them and retrying this level would spin forever,
                // so mark it exhausted and walk on to the next price level
                // instead of aborting the whole walk (spec.md §4.2: self-trade
                // prevention skips one resting order, it never curtails a
                // multi-level walk).
                let only_self_left = !taker.is_filled() && !skipped.is_empty();
                for order in skipped.into_iter().rev() {
                    book.push_front_at(maker_side, level_price, order);
                }

                book_changes.push(book.structural_change_after_match(maker_side, level_price));

                if taker.is_filled() {
                    break 'walk;
                }
                if only_self_left {
                    exhausted_levels.insert(level_price);
                    continue 'walk;
                }
            }
        }

        for trade in &trades {
            debug!(trade_id = %trade.trade_id, price = %trade.price, quantity = %trade.quantity, "trade executed");
        }

        if taker.is_filled() {
            return MatchResult::fully_matched(trades, book_changes);
        }

        match taker.time_in_force {
            common::TimeInForce::Gtc => {
                taker.priority = self.next_priority(instrument_symbol);
                let book = self.get_or_create_book(instrument_symbol);
                let change = book.add_order(taker.clone());
                book_changes.push(change);
                MatchResult::partial_match(trades, taker, true, book_changes)
            }
            common::TimeInForce::Ioc => {
                if trades.is_empty() {
                    // No crossable liquidity at all (or only self-trades were
                    // available) — a zero-fill IOC/Market order is rejected,
                    // not silently cancelled (spec.md §4.2/§6/§8).
                    MatchResult::rejected(taker, RejectedReason::NoLiquidity)
                } else {
                    MatchResult::partial_match(trades, taker, false, book_changes)
                }
            }
            common::TimeInForce::Fok => {
                // Pre-check guarantees full fill; reaching here with a
                // residual indicates a book-integrity bug.
                MatchResult::rejected(taker, RejectedReason::FokUnfillable)
            }
        }
    }

    /// `cancelOrder` (spec.md §4.2): idempotent — cancelling an order that
    /// is not on the book returns `cancelled: false`, never an error.
    pub fn cancel_order(&mut self, instrument_symbol: &str, order_id: Uuid) -> CancelResult {
        let book = self.get_or_create_book(instrument_symbol);
        let removed = book.remove_order(order_id).map(|(order, change)| (order, change, book.sequence()));
        match removed {
            Some((order, change, sequence)) => {
                info!(order_id = %order_id, instrument = %instrument_symbol, "order cancelled");
                self.event_log.append(MatchingEvent::OrderRemoved {
                    order_id,
                    instrument_symbol: instrument_symbol.to_string(),
                    sequence,
                });
                CancelResult::removed(order, vec![change])
            }
            None => CancelResult::not_found(),
        }
    }

    /// `modifyOrder` (spec.md §4.2): quantity decrease updates in place and
    /// preserves priority; a quantity increase or any price change removes
    /// and re-inserts with a freshly assigned priority, which may
    /// immediately match.
    pub fn modify_order(
        &mut self,
        instrument_symbol: &str,
        order_id: Uuid,
        new_quantity: Option<Decimal>,
        new_price: Option<Decimal>,
    ) -> Result<MatchResult, MatchingError> {
        let Some(current) = self.find_order(instrument_symbol, order_id) else {
            return Err(MatchingError::OrderNotFound(order_id.to_string()));
        };

        let price_unchanged = new_price.is_none_or(|p| p == current.price);
        let quantity_decrease = new_quantity.is_some_and(|q| q <= current.remaining_quantity);

        if price_unchanged && quantity_decrease {
            let book = self.get_or_create_book(instrument_symbol);
            let change = book
                .update_order_quantity(order_id, new_quantity.unwrap())
                .ok_or_else(|| MatchingError::OrderNotFound(order_id.to_string()))?;
            let mut updated = current;
            updated.remaining_quantity = new_quantity.unwrap();
            return Ok(MatchResult::partial_match(vec![], updated, true, vec![change]));
        }

        // Quantity increase or price change: remove and re-insert with a
        // fresh priority, then re-run matching (it may cross immediately).
        let book = self.get_or_create_book(instrument_symbol);
        let (_, remove_change) = book
            .remove_order(order_id)
            .ok_or_else(|| MatchingError::OrderNotFound(order_id.to_string()))?;
        let mut reinserted = current;
        reinserted.price = new_price.unwrap_or(reinserted.price);
        reinserted.remaining_quantity = new_quantity.unwrap_or(reinserted.remaining_quantity);
        reinserted.priority = self.next_priority(instrument_symbol);

        let maker_side = reinserted.side.opposite();
        let mut result = self.match_against(instrument_symbol, reinserted, maker_side);
        result.book_changes.insert(0, remove_change);
        Ok(result)
    }

    fn find_order(&self, instrument_symbol: &str, order_id: Uuid) -> Option<BookOrder> {
        let book = self.books.get(instrument_symbol)?;
        if !book.contains_order(order_id) {
            return None;
        }
        for side in [Side::Buy, Side::Sell] {
            let snapshot = book.snapshot();
            let levels = if side == Side::Buy { &snapshot.bids } else { &snapshot.asks };
            for level in levels {
                for order in book.orders_at_price(side, level.price) {
                    if order.order_id == order_id {
                        return Some(order.clone());
                    }
                }
            }
        }
        None
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}
