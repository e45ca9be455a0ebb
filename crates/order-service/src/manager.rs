//! `OrderService` — validation, sequencing, matching-engine invocation, and
//! atomic commit (spec.md §4.3). One instance owns one matching engine and
//! talks to it under a single lock, which is the concurrency model spec.md
//! §5 calls for at the per-instrument granularity: every order for an
//! instrument is processed to completion before the next is admitted.

use std::sync::Arc;
use std::time::Duration;

use common::{Decimal, OrderStatus as CoreOrderStatus, OrderType, Side, TimeInForce};
use config::MarketBuyPolicy;
use instrument::InstrumentStore;
use market_data::MarketDataHub;
use matching_engine::{BookOrder, MatchResult, MatchingEngine, RejectedReason};
use parking_lot::Mutex;
use storage::{Order, OrderWriteSet, PersistencePort, PositionUpsert};
use uuid::Uuid;

use crate::accounting;
use crate::error::{OrderServiceError, OrderServiceResult};
use crate::types::{
    CancelResponse, ModifyOrderRequest, ModifyOrderResponse, OrderFilter, PlaceOrderRequest,
    PlaceOrderResponse,
};

pub struct OrderService {
    engine: Mutex<MatchingEngine>,
    instruments: Arc<dyn InstrumentStore>,
    persistence: Arc<dyn PersistencePort>,
    commit_timeout: Duration,
    market_buy_policy: MarketBuyPolicy,
    market_data: Arc<MarketDataHub>,
}

impl OrderService {
    pub fn new(
        instruments: Arc<dyn InstrumentStore>,
        persistence: Arc<dyn PersistencePort>,
        commit_timeout: Duration,
        market_buy_policy: MarketBuyPolicy,
    ) -> Self {
        Self {
            engine: Mutex::new(MatchingEngine::new_with_metrics()),
            instruments,
            persistence,
            commit_timeout,
            market_buy_policy,
            market_data: Arc::new(MarketDataHub::new()),
        }
    }

    /// Shared handle to the market-data projection: subscribe for a live
    /// delta feed on an instrument, independent of order placement
    /// (spec.md §4.5).
    pub fn market_data(&self) -> Arc<MarketDataHub> {
        self.market_data.clone()
    }

    /// Atomic point-in-time snapshot of an instrument's book, or `None` if
    /// no book has been created for it yet (spec.md §4.5).
    pub fn market_data_snapshot(&self, instrument_symbol: &str) -> Option<market_data::OrderBookSnapshot> {
        self.engine.lock().get_book(instrument_symbol).map(|b| b.snapshot().into())
    }

    /// Publishes the book changes from one matching operation and returns
    /// the book's post-operation sequence, so callers can log/assert it
    /// without taking the engine lock again.
    fn publish_market_data(&self, instrument_symbol: &str, book_changes: &[matching_engine::BookChange]) {
        if book_changes.is_empty() {
            return;
        }
        let sequence = self.engine.lock().get_book(instrument_symbol).map(|b| b.sequence()).unwrap_or(0);
        self.market_data.publish(instrument_symbol, sequence, book_changes);
    }

    /// `placeOrder(userId, req) → { order, trades }` (spec.md §4.3).
    pub async fn place_order(
        &self,
        user_id: Uuid,
        req: PlaceOrderRequest,
    ) -> OrderServiceResult<PlaceOrderResponse> {
        let instrument = self.instruments.require(&req.instrument_symbol).await?;
        if !instrument.is_tradeable() {
            return Err(OrderServiceError::InstrumentInactive(req.instrument_symbol.clone()));
        }

        let limit_price = self.validate_and_resolve_price(&req, &instrument)?;
        self.validate_quantity(&req, &instrument)?;

        let account = self
            .persistence
            .get_account(req.account_id)
            .await?
            .ok_or_else(|| OrderServiceError::InvalidOrder("account not found".to_string()))?;
        if account.user_id != user_id {
            return Err(OrderServiceError::Forbidden(req.account_id));
        }
        if !account.is_active {
            return Err(OrderServiceError::InvalidOrder("account is not active".to_string()));
        }

        let (reserve_currency, reserve_amount) = accounting::required_reservation(
            req.side,
            &req.instrument_symbol,
            &instrument.quote_currency,
            req.quantity,
            limit_price,
        );
        let balance = self
            .persistence
            .get_balance(req.account_id, &reserve_currency)
            .await?;
        if !accounting::has_sufficient_available(balance.as_ref(), reserve_amount) {
            return Err(OrderServiceError::InsufficientBalance(format!(
                "need {reserve_amount} {reserve_currency}"
            )));
        }

        let order_id = Uuid::new_v4();
        let time_in_force = if req.order_type == OrderType::Market {
            match req.time_in_force {
                TimeInForce::Ioc | TimeInForce::Fok => req.time_in_force,
                TimeInForce::Gtc => TimeInForce::Ioc,
            }
        } else {
            req.time_in_force
        };

        let match_result = {
            let mut engine = self.engine.lock();
            let priority = engine.next_priority(&req.instrument_symbol);
            let book_order = BookOrder::new(
                order_id,
                user_id,
                req.instrument_symbol.clone(),
                req.side,
                limit_price,
                req.quantity,
                priority,
                time_in_force,
            );
            engine.process_order(book_order)
        };

        if let Some(reason) = match_result.rejected_reason {
            return Err(match reason {
                RejectedReason::FokUnfillable => {
                    OrderServiceError::NoLiquidity(req.instrument_symbol.clone())
                }
                RejectedReason::NoLiquidity => {
                    OrderServiceError::NoLiquidity(req.instrument_symbol.clone())
                }
            });
        }

        let now = chrono::Utc::now();
        let filled_quantity = match_result.filled_quantity();
        let status = if filled_quantity >= req.quantity {
            CoreOrderStatus::Filled
        } else if match_result.residual_rests_in_book {
            if filled_quantity > Decimal::ZERO {
                CoreOrderStatus::PartiallyFilled
            } else {
                CoreOrderStatus::Working
            }
        } else {
            CoreOrderStatus::Cancelled
        };

        let persisted_order = Order {
            id: order_id,
            user_id,
            account_id: req.account_id,
            instrument_symbol: req.instrument_symbol.clone(),
            side: req.side,
            order_type: req.order_type,
            time_in_force,
            quantity: req.quantity,
            filled_quantity,
            price: match req.order_type {
                OrderType::Limit => req.price,
                OrderType::Market => None,
            },
            status,
            priority: match_result
                .residual
                .as_ref()
                .map(|o| o.priority)
                .unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        let unfilled_residual = req.quantity - filled_quantity;
        let write_set = self
            .build_write_set(
                &instrument.quote_currency,
                &req.instrument_symbol,
                persisted_order.clone(),
                &match_result,
                if status == CoreOrderStatus::Cancelled {
                    Some((reserve_currency.clone(), unfilled_residual_reservation(
                        req.side,
                        reserve_amount,
                        req.quantity,
                        unfilled_residual,
                    )))
                } else {
                    None
                },
                req.account_id,
            )
            .await?;

        // Reserve before commit so the commit's balance deltas are computed
        // against post-reservation state; both land in the same commit.
        let mut full_write_set = write_set;
        full_write_set.balance_deltas.insert(
            0,
            accounting::reserve_delta(req.account_id, &reserve_currency, reserve_amount),
        );

        if let Err(err) = self.commit_with_rollback(full_write_set, &req.instrument_symbol, order_id, &match_result).await {
            return Err(err);
        }
        self.publish_market_data(&req.instrument_symbol, &match_result.book_changes);

        Ok(PlaceOrderResponse {
            order: persisted_order,
            trades: match_result.trades,
        })
    }

    /// `cancelOrder(userId, orderId) → { order }` (spec.md §4.3).
    pub async fn cancel_order(
        &self,
        user_id: Uuid,
        instrument_symbol: &str,
        order_id: Uuid,
    ) -> OrderServiceResult<CancelResponse> {
        let existing = self
            .persistence
            .get_order(order_id)
            .await?
            .ok_or(OrderServiceError::OrderNotFound(order_id))?;
        if existing.user_id != user_id {
            return Err(OrderServiceError::Forbidden(order_id));
        }
        if existing.status.is_terminal() {
            return Err(OrderServiceError::OrderAlreadyTerminal(order_id));
        }

        let cancel_result = {
            let mut engine = self.engine.lock();
            engine.cancel_order(instrument_symbol, order_id)
        };

        let mut updated = existing.clone();
        updated.status = CoreOrderStatus::Cancelled;
        updated.updated_at = chrono::Utc::now();

        let instrument = self.instruments.require(instrument_symbol).await?;
        let (reserve_currency, _) = accounting::required_reservation(
            existing.side,
            instrument_symbol,
            &instrument.quote_currency,
            Decimal::ZERO,
            Decimal::ZERO,
        );
        let remaining = existing.quantity - existing.filled_quantity;
        let release_amount = match existing.side {
            Side::Buy => remaining * existing.price.unwrap_or(Decimal::ZERO),
            Side::Sell => remaining,
        };

        let write_set = OrderWriteSet {
            upsert_orders: vec![updated.clone()],
            insert_trades: vec![],
            balance_deltas: if release_amount > Decimal::ZERO {
                vec![accounting::release_delta(existing.account_id, &reserve_currency, release_amount)]
            } else {
                vec![]
            },
            position_upserts: vec![],
        };

        if let Err(err) = self.persistence.commit(write_set).await {
            if cancel_result.cancelled {
                // Best-effort rollback: restore the order to the book.
                if let Some(order) = cancel_result.order {
                    let mut engine = self.engine.lock();
                    let _ = engine.process_order(order);
                }
            }
            return Err(err.into());
        }
        self.publish_market_data(instrument_symbol, &cancel_result.book_changes);

        Ok(CancelResponse {
            order_id,
            status: CoreOrderStatus::Cancelled,
        })
    }

    /// `modifyOrder(userId, req) → { order, trades }` (spec.md §4.3).
    pub async fn modify_order(
        &self,
        user_id: Uuid,
        instrument_symbol: &str,
        req: ModifyOrderRequest,
    ) -> OrderServiceResult<ModifyOrderResponse> {
        let existing = self
            .persistence
            .get_order(req.order_id)
            .await?
            .ok_or(OrderServiceError::OrderNotFound(req.order_id))?;
        if existing.user_id != user_id {
            return Err(OrderServiceError::Forbidden(req.order_id));
        }
        if existing.status.is_terminal() {
            return Err(OrderServiceError::OrderAlreadyTerminal(req.order_id));
        }

        let match_result = {
            let mut engine = self.engine.lock();
            engine.modify_order(instrument_symbol, req.order_id, req.new_quantity, req.new_price)?
        };

        let filled_quantity = existing.filled_quantity + match_result.filled_quantity();
        let status = if filled_quantity >= existing.quantity {
            CoreOrderStatus::Filled
        } else if match_result.residual_rests_in_book {
            CoreOrderStatus::PartiallyFilled
        } else {
            CoreOrderStatus::Cancelled
        };

        let mut updated = existing.clone();
        updated.quantity = req.new_quantity.unwrap_or(existing.quantity);
        updated.price = req.new_price.or(existing.price);
        updated.filled_quantity = filled_quantity;
        updated.status = status;
        updated.updated_at = chrono::Utc::now();

        let instrument = self.instruments.require(instrument_symbol).await?;
        let write_set = self
            .build_write_set(
                &instrument.quote_currency,
                instrument_symbol,
                updated.clone(),
                &match_result,
                None,
                existing.account_id,
            )
            .await?;

        self.persistence.commit(write_set).await?;
        self.publish_market_data(instrument_symbol, &match_result.book_changes);

        Ok(ModifyOrderResponse {
            order: updated,
            trades: match_result.trades,
        })
    }

    pub async fn get_order(&self, order_id: Uuid) -> OrderServiceResult<Option<Order>> {
        Ok(self.persistence.get_order(order_id).await?)
    }

    pub async fn list_orders(
        &self,
        user_id: Uuid,
        filter: OrderFilter,
    ) -> OrderServiceResult<Vec<Order>> {
        Ok(self
            .persistence
            .list_orders_for_user(user_id, filter.statuses.as_deref())
            .await?)
    }

    fn validate_and_resolve_price(
        &self,
        req: &PlaceOrderRequest,
        instrument: &instrument::Instrument,
    ) -> OrderServiceResult<Decimal> {
        match req.order_type {
            OrderType::Limit => {
                let price = req
                    .price
                    .ok_or_else(|| OrderServiceError::InvalidOrder("limit orders require a price".to_string()))?;
                if price < instrument.min_price || price > instrument.max_price {
                    return Err(OrderServiceError::PriceOutOfRange(format!(
                        "{price} outside [{}, {}]",
                        instrument.min_price, instrument.max_price
                    )));
                }
                if !common::DecimalExt::is_multiple_of(&price, instrument.tick_size) {
                    return Err(OrderServiceError::TickSizeViolation(format!(
                        "{price} is not a multiple of tick size {}",
                        instrument.tick_size
                    )));
                }
                Ok(price)
            }
            OrderType::Market => {
                if req.price.is_some() {
                    return Err(OrderServiceError::InvalidOrder(
                        "market orders must not carry a price".to_string(),
                    ));
                }
                match (req.side, self.market_buy_policy) {
                    (Side::Buy, MarketBuyPolicy::Reject) => Err(OrderServiceError::InvalidOrder(
                        "market buy orders are rejected by policy".to_string(),
                    )),
                    (Side::Buy, MarketBuyPolicy::MaxPrice) => Ok(instrument.max_price),
                    (Side::Sell, _) => Ok(instrument.min_price),
                }
            }
        }
    }

    fn validate_quantity(
        &self,
        req: &PlaceOrderRequest,
        instrument: &instrument::Instrument,
    ) -> OrderServiceResult<()> {
        if !common::DecimalExt::is_multiple_of(&req.quantity, instrument.lot_size) {
            return Err(OrderServiceError::LotSizeViolation(format!(
                "{} is not a multiple of lot size {}",
                req.quantity, instrument.lot_size
            )));
        }
        if req.quantity < instrument.min_quantity {
            return Err(OrderServiceError::OrderSizeTooSmall(format!(
                "{} below minimum {}",
                req.quantity, instrument.min_quantity
            )));
        }
        if req.quantity > instrument.max_quantity {
            return Err(OrderServiceError::OrderSizeTooLarge(format!(
                "{} above maximum {}",
                req.quantity, instrument.max_quantity
            )));
        }
        Ok(())
    }

    async fn build_write_set(
        &self,
        quote_currency: &str,
        instrument_symbol: &str,
        order: Order,
        match_result: &MatchResult,
        release: Option<(String, Decimal)>,
        account_id: Uuid,
    ) -> OrderServiceResult<OrderWriteSet> {
        let mut balance_deltas = Vec::new();
        let mut position_upserts: Vec<PositionUpsert> = Vec::new();
        let mut positions_touched: std::collections::HashMap<Uuid, storage::Position> = std::collections::HashMap::new();

        for trade in &match_result.trades {
            let buyer_account = self.account_for_order(trade.buy_order_id, order.id, account_id).await?;
            let seller_account = self.account_for_order(trade.sell_order_id, order.id, account_id).await?;
            let deltas = accounting::trade_balance_deltas(
                instrument_symbol,
                quote_currency,
                buyer_account,
                seller_account,
                trade.quantity,
                trade.price,
            );
            balance_deltas.extend(deltas);

            for (user_id, side) in [(trade.buyer_user_id, Side::Buy), (trade.seller_user_id, Side::Sell)] {
                let existing = match positions_touched.get(&user_id) {
                    Some(p) => Some(p.clone()),
                    None => self.persistence.get_position(user_id, instrument_symbol).await?,
                };
                let updated = accounting::apply_fill_to_position(
                    existing.as_ref(),
                    user_id,
                    instrument_symbol,
                    side,
                    trade.quantity,
                    trade.price,
                );
                positions_touched.insert(user_id, updated);
            }
        }

        if let Some((currency, amount)) = release {
            if amount > Decimal::ZERO {
                balance_deltas.push(accounting::release_delta(account_id, &currency, amount));
            }
        }

        for position in positions_touched.into_values() {
            position_upserts.push(PositionUpsert {
                user_id: position.user_id,
                instrument_symbol: position.instrument_symbol,
                quantity: position.quantity,
                average_price: position.average_price,
                unrealized_pnl: position.unrealized_pnl,
                realized_pnl: position.realized_pnl,
            });
        }

        Ok(OrderWriteSet {
            upsert_orders: vec![order],
            insert_trades: match_result
                .trades
                .iter()
                .map(|t| storage::TradeRecord {
                    id: t.trade_id,
                    instrument_symbol: t.instrument_symbol.clone(),
                    buy_order_id: t.buy_order_id,
                    sell_order_id: t.sell_order_id,
                    buyer_user_id: t.buyer_user_id,
                    seller_user_id: t.seller_user_id,
                    quantity: t.quantity,
                    price: t.price,
                    executed_at: t.executed_at,
                })
                .collect(),
            balance_deltas,
            position_upserts,
        })
    }

    /// Commits `write_set` within `commit_timeout`. On failure or timeout,
    /// the in-memory book change for this order is rolled back: a residual
    /// that was rested is pulled back off the book (spec.md §5 "on timeout,
    /// commit is treated as failed and in-memory state is rolled back").
    async fn commit_with_rollback(
        &self,
        write_set: OrderWriteSet,
        instrument_symbol: &str,
        order_id: Uuid,
        match_result: &MatchResult,
    ) -> OrderServiceResult<()> {
        let result = tokio::time::timeout(self.commit_timeout, self.persistence.commit(write_set)).await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                self.rollback_book_change(instrument_symbol, order_id, match_result);
                Err(err.into())
            }
            Err(_) => {
                self.rollback_book_change(instrument_symbol, order_id, match_result);
                Err(OrderServiceError::CommitFailed("persistence commit timed out".to_string()))
            }
        }
    }

    /// Resolves the account that should be debited/credited for `side_order_id`
    /// in a trade: if it is the order we're currently placing/modifying, its
    /// account is already known; otherwise it is a resting maker whose
    /// account was recorded when it was first persisted.
    async fn account_for_order(
        &self,
        side_order_id: Uuid,
        this_order_id: Uuid,
        this_account_id: Uuid,
    ) -> OrderServiceResult<Uuid> {
        if side_order_id == this_order_id {
            return Ok(this_account_id);
        }
        let maker = self
            .persistence
            .get_order(side_order_id)
            .await?
            .ok_or_else(|| OrderServiceError::Internal(format!("maker order {side_order_id} not found")))?;
        Ok(maker.account_id)
    }

    fn rollback_book_change(&self, instrument_symbol: &str, order_id: Uuid, match_result: &MatchResult) {
        if match_result.residual_rests_in_book {
            let mut engine = self.engine.lock();
            engine.cancel_order(instrument_symbol, order_id);
        }
    }
}

fn unfilled_residual_reservation(
    side: Side,
    reserve_amount: Decimal,
    original_quantity: Decimal,
    unfilled_quantity: Decimal,
) -> Decimal {
    if original_quantity.is_zero() {
        return Decimal::ZERO;
    }
    match side {
        Side::Buy => reserve_amount * unfilled_quantity / original_quantity,
        Side::Sell => unfilled_quantity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instrument::InMemoryInstrumentStore;
    use std::str::FromStr;
    use storage::{Account, InMemoryPersistence};

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sample_instrument() -> instrument::Instrument {
        instrument::Instrument {
            symbol: "BTC-USDT".to_string(),
            quote_currency: "USDT".to_string(),
            min_price: d("0.01"),
            max_price: d("1000000"),
            tick_size: d("0.01"),
            lot_size: d("0.0001"),
            min_quantity: d("0.0001"),
            max_quantity: d("1000"),
            is_active: true,
            expiration_date: None,
        }
    }

    async fn setup() -> (OrderService, Uuid, Uuid) {
        let instruments = Arc::new(InMemoryInstrumentStore::new());
        instruments.insert(sample_instrument()).await.unwrap();
        let persistence = Arc::new(InMemoryPersistence::new());

        let buyer_account = Uuid::new_v4();
        let seller_account = Uuid::new_v4();
        let buyer_user = Uuid::new_v4();
        let seller_user = Uuid::new_v4();
        persistence
            .create_account(Account { id: buyer_account, user_id: buyer_user, is_active: true })
            .await
            .unwrap();
        persistence
            .create_account(Account { id: seller_account, user_id: seller_user, is_active: true })
            .await
            .unwrap();
        persistence.credit_balance(buyer_account, "USDT", d("1000000")).await.unwrap();
        persistence.credit_balance(seller_account, "BTC", d("1000")).await.unwrap();

        let service = OrderService::new(
            instruments,
            persistence,
            Duration::from_secs(1),
            MarketBuyPolicy::MaxPrice,
        );
        (service, buyer_user, seller_user)
    }

    #[tokio::test]
    async fn rejects_inactive_instrument() {
        let instruments = Arc::new(InMemoryInstrumentStore::new());
        let mut inactive = sample_instrument();
        inactive.is_active = false;
        instruments.insert(inactive).await.unwrap();
        let persistence = Arc::new(InMemoryPersistence::new());
        let service = OrderService::new(instruments, persistence, Duration::from_secs(1), MarketBuyPolicy::MaxPrice);

        let req = PlaceOrderRequest {
            account_id: Uuid::new_v4(),
            instrument_symbol: "BTC-USDT".to_string(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtc,
            quantity: d("1"),
            price: Some(d("100")),
        };
        let result = service.place_order(Uuid::new_v4(), req).await;
        assert!(matches!(result, Err(OrderServiceError::InstrumentInactive(_))));
    }

    #[tokio::test]
    async fn rejects_price_not_on_tick() {
        let (service, buyer, _seller) = setup().await;
        let req = PlaceOrderRequest {
            account_id: Uuid::new_v4(),
            instrument_symbol: "BTC-USDT".to_string(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtc,
            quantity: d("1"),
            price: Some(d("100.005")),
        };
        let result = service.place_order(buyer, req).await;
        assert!(matches!(result, Err(OrderServiceError::TickSizeViolation(_))));
    }

    #[tokio::test]
    async fn rejects_insufficient_balance() {
        let (service, buyer, _seller) = setup().await;
        let req = PlaceOrderRequest {
            account_id: Uuid::new_v4(), // not the buyer's real, zero-balance account
            instrument_symbol: "BTC-USDT".to_string(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtc,
            quantity: d("1"),
            price: Some(d("100")),
        };
        let result = service.place_order(buyer, req).await;
        assert!(result.is_err());
    }
}
