//! Durable record types the persistence port owns exclusively (spec.md §3
//! Ownership): `Order`, `TradeRecord`, `Account`, `Balance`, `Position`, and
//! the write-set shapes used to commit them atomically.

use chrono::{DateTime, Utc};
use common::{Decimal, OrderStatus, OrderType, Side, TimeInForce};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted order (spec.md §3). Distinct from `matching_engine::BookOrder`,
/// which is the engine's in-memory working copy while the order rests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub instrument_symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
    /// `None` for Market orders.
    pub price: Option<Decimal>,
    pub status: OrderStatus,
    pub priority: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_fully_filled(&self) -> bool {
        self.filled_quantity >= self.quantity
    }
}

/// A persisted trade, immutable once written (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub instrument_symbol: String,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub buyer_user_id: Uuid,
    pub seller_user_id: Uuid,
    pub quantity: Decimal,
    pub price: Decimal,
    pub executed_at: DateTime<Utc>,
}

/// A trading account: one user may hold several currency balances under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_active: bool,
}

/// A (account, currency) balance. Invariant: `total == available + reserved`,
/// and all three are `>= 0` (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub account_id: Uuid,
    pub currency: String,
    pub available: Decimal,
    pub reserved: Decimal,
}

impl Balance {
    pub fn total(&self) -> Decimal {
        self.available + self.reserved
    }

    pub fn zero(account_id: Uuid, currency: impl Into<String>) -> Self {
        Self {
            account_id,
            currency: currency.into(),
            available: Decimal::ZERO,
            reserved: Decimal::ZERO,
        }
    }
}

/// A (user, instrument) position. `average_price` is only meaningful while
/// `quantity != 0` (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub user_id: Uuid,
    pub instrument_symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
}

/// One account's available/reserved adjustment, applied atomically with the
/// rest of an `OrderWriteSet` (spec.md §6 `balanceDeltas`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub account_id: Uuid,
    pub currency: String,
    pub available_delta: Decimal,
    pub reserved_delta: Decimal,
}

/// A position's new resident state after a fill, applied atomically with
/// the rest of an `OrderWriteSet` (spec.md §6 `positionUpserts`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpsert {
    pub user_id: Uuid,
    pub instrument_symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
}

/// The bundle committed atomically by the persistence port: an order
/// upsert, the trades it produced, balance deltas, and position upserts.
/// All four occur or none do (spec.md §6 persistence port).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderWriteSet {
    pub upsert_orders: Vec<Order>,
    pub insert_trades: Vec<TradeRecord>,
    pub balance_deltas: Vec<BalanceDelta>,
    pub position_upserts: Vec<PositionUpsert>,
}
