//! Property tests over random order streams, checking the universal
//! invariants a price-time priority book must hold at all times.

use common::{Decimal, Side, TimeInForce};
use matching_engine::{BookOrder, MatchingEngine};
use proptest::prelude::*;
use std::str::FromStr;
use uuid::Uuid;

const INSTRUMENT: &str = "BTC-USD";
const USERS: usize = 4;
const PRICES: &[&str] = &["99", "100", "101"];

fn price(i: usize) -> Decimal {
    Decimal::from_str(PRICES[i]).unwrap()
}

fn user(i: usize) -> Uuid {
    Uuid::from_u128(i as u128 + 1)
}

#[derive(Debug, Clone)]
struct RandomOrder {
    user_idx: usize,
    side: bool,
    price_idx: usize,
    quantity: u32,
}

fn arb_order() -> impl Strategy<Value = RandomOrder> {
    (0..USERS, any::<bool>(), 0..PRICES.len(), 1u32..20).prop_map(
        |(user_idx, side, price_idx, quantity)| RandomOrder {
            user_idx,
            side,
            price_idx,
            quantity,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// `sequence` always equals the number of structural mutations so far,
    /// no empty price level is ever reachable, and every level's aggregate
    /// matches the sum of its resting orders (spec.md §8 properties 1-2).
    #[test]
    fn book_aggregates_stay_consistent(orders in proptest::collection::vec(arb_order(), 1..60)) {
        let mut engine = MatchingEngine::new();
        let mut structural_mutations = 0u64;

        for o in orders {
            let side = if o.side { Side::Buy } else { Side::Sell };
            let mut order = BookOrder::new(
                Uuid::new_v4(),
                user(o.user_idx),
                INSTRUMENT.to_string(),
                side,
                price(o.price_idx),
                Decimal::from(o.quantity),
                0,
                TimeInForce::Gtc,
            );
            order.priority = engine.next_priority(INSTRUMENT);
            let result = engine.process_order(order);
            structural_mutations += result.book_changes.len() as u64;

            let book = engine.get_book(INSTRUMENT).unwrap();
            prop_assert_eq!(book.sequence(), structural_mutations);
            book.validate_integrity().unwrap();

            for p in PRICES {
                let p = Decimal::from_str(p).unwrap();
                for side in [Side::Buy, Side::Sell] {
                    let orders_here = book.orders_at_price(side, p);
                    if orders_here.is_empty() {
                        prop_assert_eq!(book.quantity_at(side, p), Decimal::ZERO);
                    } else {
                        let sum: Decimal = orders_here.iter().map(|o| o.remaining_quantity).sum();
                        prop_assert_eq!(book.quantity_at(side, p), sum);
                    }
                }
            }
        }
    }

    /// No trade is ever a self-trade, and every trade's two sides differ.
    #[test]
    fn no_trade_is_ever_a_self_trade(orders in proptest::collection::vec(arb_order(), 1..60)) {
        let mut engine = MatchingEngine::new();

        for o in orders {
            let side = if o.side { Side::Buy } else { Side::Sell };
            let mut order = BookOrder::new(
                Uuid::new_v4(),
                user(o.user_idx),
                INSTRUMENT.to_string(),
                side,
                price(o.price_idx),
                Decimal::from(o.quantity),
                0,
                TimeInForce::Gtc,
            );
            order.priority = engine.next_priority(INSTRUMENT);
            let result = engine.process_order(order);

            for trade in &result.trades {
                prop_assert_ne!(trade.buyer_user_id, trade.seller_user_id);
                prop_assert_ne!(trade.buy_order_id, trade.sell_order_id);
                prop_assert!(trade.quantity > Decimal::ZERO);
            }
        }
    }

    /// Strict price-time priority: the earlier-accepted order at a price
    /// level always trades before the later one.
    #[test]
    fn earlier_priority_trades_first_at_same_price(qty_a in 1u32..10, qty_b in 1u32..10, taker_qty in 1u32..20) {
        let mut engine = MatchingEngine::new();
        let maker_a = user(0);
        let maker_b = user(1);
        let taker = user(2);

        let mut order_a = BookOrder::new(Uuid::new_v4(), maker_a, INSTRUMENT.to_string(), Side::Sell, price(1), Decimal::from(qty_a), 0, TimeInForce::Gtc);
        order_a.priority = engine.next_priority(INSTRUMENT);
        engine.process_order(order_a);

        let mut order_b = BookOrder::new(Uuid::new_v4(), maker_b, INSTRUMENT.to_string(), Side::Sell, price(1), Decimal::from(qty_b), 0, TimeInForce::Gtc);
        order_b.priority = engine.next_priority(INSTRUMENT);
        engine.process_order(order_b);

        let mut taker_order = BookOrder::new(Uuid::new_v4(), taker, INSTRUMENT.to_string(), Side::Buy, price(1), Decimal::from(taker_qty), 0, TimeInForce::Gtc);
        taker_order.priority = engine.next_priority(INSTRUMENT);
        let result = engine.process_order(taker_order);

        if !result.trades.is_empty() {
            prop_assert_eq!(result.trades[0].seller_user_id, maker_a);
            if result.trades.len() > 1 {
                prop_assert_eq!(result.trades[1].seller_user_id, maker_b);
            }
        }
    }
}
