//! End-to-end order-placement scenarios exercised through `OrderService`,
//! covering the concrete trade/priority/rollback behaviors a matching core
//! must get right: simple crossing, partial fills, price-time priority,
//! self-trade prevention, a market order walking multiple levels, and
//! balance-driven rejection with no side effects.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use common::{Decimal, OrderStatus, OrderType, Side, TimeInForce};
use config::MarketBuyPolicy;
use instrument::{InMemoryInstrumentStore, Instrument, InstrumentStore};
use order_service::{OrderService, PlaceOrderRequest};
use storage::{Account, InMemoryPersistence, PersistencePort};
use uuid::Uuid;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn btc_usd() -> Instrument {
    Instrument {
        symbol: "BTC-USD".to_string(),
        quote_currency: "USD".to_string(),
        min_price: d("0.01"),
        max_price: d("10000000"),
        tick_size: d("0.01"),
        lot_size: d("0.0001"),
        min_quantity: d("0.0001"),
        max_quantity: d("10000"),
        is_active: true,
        expiration_date: None,
    }
}

struct Harness {
    service: OrderService,
    persistence: Arc<InMemoryPersistence>,
}

struct Trader {
    user_id: Uuid,
    account_id: Uuid,
}

impl Harness {
    async fn new() -> Self {
        let instruments = Arc::new(InMemoryInstrumentStore::new());
        instruments.insert(btc_usd()).await.unwrap();
        let persistence = Arc::new(InMemoryPersistence::new());
        let service = OrderService::new(
            instruments,
            persistence.clone(),
            Duration::from_secs(1),
            MarketBuyPolicy::MaxPrice,
        );
        Self { service, persistence }
    }

    /// Onboards a trader with generous USD and BTC balances so validation
    /// never fails on funding unless the scenario specifically wants it to.
    async fn trader(&self) -> Trader {
        let user_id = Uuid::new_v4();
        let account_id = Uuid::new_v4();
        self.persistence
            .create_account(Account { id: account_id, user_id, is_active: true })
            .await
            .unwrap();
        self.persistence.credit_balance(account_id, "USD", d("100000000")).await.unwrap();
        self.persistence.credit_balance(account_id, "BTC", d("100000")).await.unwrap();
        Trader { user_id, account_id }
    }

    async fn limit(
        &self,
        trader: &Trader,
        side: Side,
        quantity: &str,
        price: &str,
    ) -> order_service::PlaceOrderResponse {
        self.service
            .place_order(
                trader.user_id,
                PlaceOrderRequest {
                    account_id: trader.account_id,
                    instrument_symbol: "BTC-USD".to_string(),
                    side,
                    order_type: OrderType::Limit,
                    time_in_force: TimeInForce::Gtc,
                    quantity: d(quantity),
                    price: Some(d(price)),
                },
            )
            .await
            .unwrap()
    }
}

/// S1 — a resting sell at 50000 crosses an incoming buy at 50000: one
/// trade for the full quantity, both orders filled, nothing left resting.
#[tokio::test]
async fn simple_match_fully_fills_both_sides() {
    let harness = Harness::new().await;
    let seller = harness.trader().await;
    let buyer = harness.trader().await;

    let sell = harness.limit(&seller, Side::Sell, "1.0", "50000.00").await;
    assert_eq!(sell.order.status, OrderStatus::Working);
    assert!(sell.trades.is_empty());

    let buy = harness.limit(&buyer, Side::Buy, "1.0", "50000.00").await;
    assert_eq!(buy.trades.len(), 1);
    assert_eq!(buy.trades[0].quantity, d("1.0"));
    assert_eq!(buy.trades[0].price, d("50000.00"));
    assert_eq!(buy.trades[0].buyer_user_id, buyer.user_id);
    assert_eq!(buy.trades[0].seller_user_id, seller.user_id);
    assert_eq!(buy.order.status, OrderStatus::Filled);

    assert!(harness.service.market_data_snapshot("BTC-USD").unwrap().bids.is_empty());
    assert!(harness.service.market_data_snapshot("BTC-USD").unwrap().asks.is_empty());
}

/// S2 — a larger resting sell only partially fills against a smaller buy;
/// the maker stays in the book with its remaining quantity.
#[tokio::test]
async fn partial_fill_leaves_maker_resting_with_remainder() {
    let harness = Harness::new().await;
    let seller = harness.trader().await;
    let buyer = harness.trader().await;

    harness.limit(&seller, Side::Sell, "2.0", "50000").await;
    let buy = harness.limit(&buyer, Side::Buy, "1.0", "50000").await;

    assert_eq!(buy.trades.len(), 1);
    assert_eq!(buy.trades[0].quantity, d("1.0"));
    assert_eq!(buy.order.status, OrderStatus::Filled);

    let snapshot = harness.service.market_data_snapshot("BTC-USD").unwrap();
    assert_eq!(snapshot.asks.len(), 1);
    assert_eq!(snapshot.asks[0].quantity, d("1.0"));
}

/// S3 — two resting sells at the same price; the earlier one (lower
/// priority) trades first and the later one is untouched.
#[tokio::test]
async fn price_time_priority_prefers_earlier_order_at_same_price() {
    let harness = Harness::new().await;
    let first_seller = harness.trader().await;
    let second_seller = harness.trader().await;
    let buyer = harness.trader().await;

    harness.limit(&first_seller, Side::Sell, "1.0", "50000").await;
    harness.limit(&second_seller, Side::Sell, "1.0", "50000").await;

    let buy = harness.limit(&buyer, Side::Buy, "1.0", "50000").await;
    assert_eq!(buy.trades.len(), 1);
    assert_eq!(buy.trades[0].seller_user_id, first_seller.user_id);

    let snapshot = harness.service.market_data_snapshot("BTC-USD").unwrap();
    assert_eq!(snapshot.asks[0].quantity, d("1.0"));
    assert_eq!(snapshot.asks[0].order_count, 1);
}

/// S4 — a user's own resting sell and incoming buy at the same price must
/// never trade against each other; both rest, spread collapses to zero.
#[tokio::test]
async fn self_trade_prevention_leaves_both_orders_resting() {
    let harness = Harness::new().await;
    let trader = harness.trader().await;

    let sell = harness.limit(&trader, Side::Sell, "1.0", "50000").await;
    let buy = harness.limit(&trader, Side::Buy, "1.0", "50000").await;

    assert!(buy.trades.is_empty());
    assert_eq!(sell.order.status, OrderStatus::Working);
    assert_eq!(buy.order.status, OrderStatus::Working);

    let snapshot = harness.service.market_data_snapshot("BTC-USD").unwrap();
    assert_eq!(snapshot.spread(), Some(Decimal::ZERO));
}

/// S5 — a market buy walks two ask levels, filling against both makers at
/// their respective (price-improving) prices.
#[tokio::test]
async fn market_order_walks_multiple_price_levels() {
    let harness = Harness::new().await;
    let seller_near = harness.trader().await;
    let seller_far = harness.trader().await;
    let buyer = harness.trader().await;

    harness.limit(&seller_near, Side::Sell, "1.0", "49000").await;
    harness.limit(&seller_far, Side::Sell, "2.0", "49500").await;

    let buy = harness
        .service
        .place_order(
            buyer.user_id,
            PlaceOrderRequest {
                account_id: buyer.account_id,
                instrument_symbol: "BTC-USD".to_string(),
                side: Side::Buy,
                order_type: OrderType::Market,
                time_in_force: TimeInForce::Ioc,
                quantity: d("3.0"),
                price: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(buy.trades.len(), 2);
    assert_eq!(buy.trades[0].price, d("49000"));
    assert_eq!(buy.trades[0].quantity, d("1.0"));
    assert_eq!(buy.trades[1].price, d("49500"));
    assert_eq!(buy.trades[1].quantity, d("2.0"));
    assert_eq!(buy.order.status, OrderStatus::Filled);

    let snapshot = harness.service.market_data_snapshot("BTC-USD").unwrap();
    assert!(snapshot.asks.is_empty());
}

/// A market order against an empty opposing book has nothing to fill and
/// must be rejected with `NoLiquidity`, not silently cancelled.
#[tokio::test]
async fn market_order_against_empty_book_is_rejected_with_no_liquidity() {
    let harness = Harness::new().await;
    let buyer = harness.trader().await;

    let result = harness
        .service
        .place_order(
            buyer.user_id,
            PlaceOrderRequest {
                account_id: buyer.account_id,
                instrument_symbol: "BTC-USD".to_string(),
                side: Side::Buy,
                order_type: OrderType::Market,
                time_in_force: TimeInForce::Ioc,
                quantity: d("1.0"),
                price: None,
            },
        )
        .await;

    assert!(matches!(result, Err(order_service::OrderServiceError::NoLiquidity(_))));
}

/// S6 — a buyer without enough available balance is rejected before the
/// engine ever sees the order: no order persisted, no book mutation, and
/// balance is untouched.
#[tokio::test]
async fn insufficient_balance_rejects_without_touching_the_book() {
    let instruments = Arc::new(InMemoryInstrumentStore::new());
    instruments.insert(btc_usd()).await.unwrap();
    let persistence = Arc::new(InMemoryPersistence::new());
    let service = OrderService::new(instruments, persistence.clone(), Duration::from_secs(1), MarketBuyPolicy::MaxPrice);

    let user_id = Uuid::new_v4();
    let account_id = Uuid::new_v4();
    persistence.create_account(Account { id: account_id, user_id, is_active: true }).await.unwrap();
    persistence.credit_balance(account_id, "USD", d("1000")).await.unwrap();

    let result = service
        .place_order(
            user_id,
            PlaceOrderRequest {
                account_id,
                instrument_symbol: "BTC-USD".to_string(),
                side: Side::Buy,
                order_type: OrderType::Limit,
                time_in_force: TimeInForce::Gtc,
                quantity: d("100"),
                price: Some(d("50000")),
            },
        )
        .await;

    assert!(matches!(result, Err(order_service::OrderServiceError::InsufficientBalance(_))));
    assert!(service.market_data_snapshot("BTC-USD").is_none());
    let balance = persistence.get_balance(account_id, "USD").await.unwrap().unwrap();
    assert_eq!(balance.available, d("1000"));
    assert_eq!(balance.reserved, Decimal::ZERO);
}

/// Cancelling an order publishes a removal delta and frees its reservation.
#[tokio::test]
async fn cancel_removes_resting_order_and_releases_reservation() {
    let harness = Harness::new().await;
    let trader = harness.trader().await;

    let placed = harness.limit(&trader, Side::Buy, "1.0", "50000").await;
    let balance_before = harness.persistence.get_balance(trader.account_id, "USD").await.unwrap().unwrap();
    assert_eq!(balance_before.reserved, d("50000"));

    let cancelled = harness.service.cancel_order(trader.user_id, "BTC-USD", placed.order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let balance_after = harness.persistence.get_balance(trader.account_id, "USD").await.unwrap().unwrap();
    assert_eq!(balance_after.reserved, Decimal::ZERO);
    assert!(harness.service.market_data_snapshot("BTC-USD").unwrap().bids.is_empty());
}

/// A subscriber attached before any activity sees deltas in strictly
/// increasing sequence order as resting liquidity is added and then
/// consumed (spec.md §4.5 delta-stream contract).
#[tokio::test]
async fn market_data_subscriber_observes_increasing_sequence() {
    let harness = Harness::new().await;
    let seller = harness.trader().await;
    let buyer = harness.trader().await;

    let mut rx = harness.service.market_data().subscribe("BTC-USD");

    harness.limit(&seller, Side::Sell, "1.0", "50000").await;
    harness.limit(&buyer, Side::Buy, "1.0", "50000").await;

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert!(second.sequence > first.sequence);
}
