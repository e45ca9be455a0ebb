//! The persistence port: the single seam between the matching/order core
//! and durable storage (spec.md §4.3, §6). Every state-changing operation
//! goes through `commit`, which applies an `OrderWriteSet` atomically.

use crate::error::StorageResult;
use crate::types::{Account, Balance, Order, OrderWriteSet, Position, TradeRecord};
use async_trait::async_trait;
use common::OrderStatus;
use uuid::Uuid;

/// Durable storage for orders, trades, balances, and positions.
///
/// `commit` is the only mutating method that touches more than one kind of
/// record, and it is all-or-nothing: either every upsert/insert/delta in
/// the write set lands, or none does (spec.md §4.3). Everything else is a
/// read accessor or a single-record seed used when onboarding an account.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Atomically applies an order upsert together with the trades,
    /// balance deltas, and position upserts it produced.
    async fn commit(&self, write_set: OrderWriteSet) -> StorageResult<()>;

    async fn get_order(&self, order_id: Uuid) -> StorageResult<Option<Order>>;

    async fn list_orders_for_user(
        &self,
        user_id: Uuid,
        statuses: Option<&[OrderStatus]>,
    ) -> StorageResult<Vec<Order>>;

    async fn get_trades_for_order(&self, order_id: Uuid) -> StorageResult<Vec<TradeRecord>>;

    async fn get_account(&self, account_id: Uuid) -> StorageResult<Option<Account>>;

    async fn get_balance(&self, account_id: Uuid, currency: &str) -> StorageResult<Option<Balance>>;

    async fn get_position(
        &self,
        user_id: Uuid,
        instrument_symbol: &str,
    ) -> StorageResult<Option<Position>>;

    /// Seeds a new account. Not part of the hot order path; used by
    /// onboarding flows and test setup.
    async fn create_account(&self, account: Account) -> StorageResult<()>;

    /// Credits `currency`'s available balance for `account_id` by `amount`,
    /// creating the balance row at zero first if it doesn't yet exist.
    /// Not part of `commit` because funding is not triggered by order flow.
    async fn credit_balance(
        &self,
        account_id: Uuid,
        currency: &str,
        amount: common::Decimal,
    ) -> StorageResult<Balance>;
}
