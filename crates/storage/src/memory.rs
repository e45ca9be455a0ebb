//! A single-process, in-memory `PersistencePort`. Used by the demo binary
//! and by tests; grounded on the same guarded-map pattern the order store
//! uses, but with `commit` implemented as pre-validate-then-apply so a
//! rejected write set never partially lands (spec.md §4.3).

use crate::error::{StorageError, StorageResult};
use crate::port::PersistencePort;
use crate::types::{Account, Balance, Order, OrderWriteSet, Position, TradeRecord};
use async_trait::async_trait;
use common::{Decimal, OrderStatus};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct State {
    orders: HashMap<Uuid, Order>,
    trades: HashMap<Uuid, TradeRecord>,
    accounts: HashMap<Uuid, Account>,
    balances: HashMap<(Uuid, String), Balance>,
    positions: HashMap<(Uuid, String), Position>,
}

/// In-memory persistence port. Not durable across process restarts; exists
/// for the demo binary and for tests that exercise order-service logic
/// without a real database.
pub struct InMemoryPersistence {
    state: RwLock<State>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistencePort for InMemoryPersistence {
    async fn commit(&self, write_set: OrderWriteSet) -> StorageResult<()> {
        let mut state = self.state.write();

        for trade in &write_set.insert_trades {
            if state.trades.contains_key(&trade.id) {
                return Err(StorageError::Duplicate(format!("trade {}", trade.id)));
            }
        }

        // Pre-compute every balance the write set would touch before
        // mutating anything, so a violation anywhere aborts the whole
        // commit (spec.md §4.3: all four occur or none do).
        let mut proposed_balances: HashMap<(Uuid, String), Balance> = HashMap::new();
        for delta in &write_set.balance_deltas {
            let key = (delta.account_id, delta.currency.clone());
            let current = proposed_balances
                .get(&key)
                .cloned()
                .or_else(|| state.balances.get(&key).cloned())
                .unwrap_or_else(|| Balance::zero(delta.account_id, delta.currency.clone()));

            let available = current.available + delta.available_delta;
            let reserved = current.reserved + delta.reserved_delta;
            if available < Decimal::ZERO || reserved < Decimal::ZERO {
                return Err(StorageError::InvariantViolation(format!(
                    "balance for account {} currency {} would go negative (available={available}, reserved={reserved})",
                    delta.account_id, delta.currency
                )));
            }

            proposed_balances.insert(
                key,
                Balance {
                    account_id: delta.account_id,
                    currency: delta.currency.clone(),
                    available,
                    reserved,
                },
            );
        }

        for order in &write_set.upsert_orders {
            state.orders.insert(order.id, order.clone());
        }
        for trade in write_set.insert_trades {
            state.trades.insert(trade.id, trade);
        }
        for (key, balance) in proposed_balances {
            state.balances.insert(key, balance);
        }
        for position in write_set.position_upserts {
            state.positions.insert(
                (position.user_id, position.instrument_symbol.clone()),
                Position {
                    user_id: position.user_id,
                    instrument_symbol: position.instrument_symbol,
                    quantity: position.quantity,
                    average_price: position.average_price,
                    unrealized_pnl: position.unrealized_pnl,
                    realized_pnl: position.realized_pnl,
                },
            );
        }

        Ok(())
    }

    async fn get_order(&self, order_id: Uuid) -> StorageResult<Option<Order>> {
        Ok(self.state.read().orders.get(&order_id).cloned())
    }

    async fn list_orders_for_user(
        &self,
        user_id: Uuid,
        statuses: Option<&[OrderStatus]>,
    ) -> StorageResult<Vec<Order>> {
        let state = self.state.read();
        Ok(state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .filter(|o| statuses.is_none_or(|s| s.contains(&o.status)))
            .cloned()
            .collect())
    }

    async fn get_trades_for_order(&self, order_id: Uuid) -> StorageResult<Vec<TradeRecord>> {
        let state = self.state.read();
        Ok(state
            .trades
            .values()
            .filter(|t| t.buy_order_id == order_id || t.sell_order_id == order_id)
            .cloned()
            .collect())
    }

    async fn get_account(&self, account_id: Uuid) -> StorageResult<Option<Account>> {
        Ok(self.state.read().accounts.get(&account_id).cloned())
    }

    async fn get_balance(
        &self,
        account_id: Uuid,
        currency: &str,
    ) -> StorageResult<Option<Balance>> {
        Ok(self
            .state
            .read()
            .balances
            .get(&(account_id, currency.to_string()))
            .cloned())
    }

    async fn get_position(
        &self,
        user_id: Uuid,
        instrument_symbol: &str,
    ) -> StorageResult<Option<Position>> {
        Ok(self
            .state
            .read()
            .positions
            .get(&(user_id, instrument_symbol.to_string()))
            .cloned())
    }

    async fn create_account(&self, account: Account) -> StorageResult<()> {
        let mut state = self.state.write();
        if state.accounts.contains_key(&account.id) {
            return Err(StorageError::Duplicate(format!("account {}", account.id)));
        }
        state.accounts.insert(account.id, account);
        Ok(())
    }

    async fn credit_balance(
        &self,
        account_id: Uuid,
        currency: &str,
        amount: Decimal,
    ) -> StorageResult<Balance> {
        let mut state = self.state.write();
        let key = (account_id, currency.to_string());
        let balance = state
            .balances
            .entry(key)
            .or_insert_with(|| Balance::zero(account_id, currency));
        balance.available += amount;
        Ok(balance.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BalanceDelta;

    fn account_id() -> Uuid {
        Uuid::from_u128(1)
    }

    #[tokio::test]
    async fn credit_then_commit_reserves_within_available() {
        let store = InMemoryPersistence::new();
        store.credit_balance(account_id(), "USD", Decimal::from(100)).await.unwrap();

        let write_set = OrderWriteSet {
            balance_deltas: vec![BalanceDelta {
                account_id: account_id(),
                currency: "USD".to_string(),
                available_delta: -Decimal::from(40),
                reserved_delta: Decimal::from(40),
            }],
            ..Default::default()
        };
        store.commit(write_set).await.unwrap();

        let balance = store.get_balance(account_id(), "USD").await.unwrap().unwrap();
        assert_eq!(balance.available, Decimal::from(60));
        assert_eq!(balance.reserved, Decimal::from(40));
    }

    #[tokio::test]
    async fn commit_rejects_and_does_not_mutate_when_balance_would_go_negative() {
        let store = InMemoryPersistence::new();
        store.credit_balance(account_id(), "USD", Decimal::from(10)).await.unwrap();

        let write_set = OrderWriteSet {
            balance_deltas: vec![BalanceDelta {
                account_id: account_id(),
                currency: "USD".to_string(),
                available_delta: -Decimal::from(50),
                reserved_delta: Decimal::ZERO,
            }],
            ..Default::default()
        };
        let result = store.commit(write_set).await;
        assert!(matches!(result, Err(StorageError::InvariantViolation(_))));

        let balance = store.get_balance(account_id(), "USD").await.unwrap().unwrap();
        assert_eq!(balance.available, Decimal::from(10));
    }

    #[tokio::test]
    async fn duplicate_trade_id_is_rejected() {
        let store = InMemoryPersistence::new();
        let trade = TradeRecord {
            id: Uuid::from_u128(42),
            instrument_symbol: "BTC-USD".to_string(),
            buy_order_id: Uuid::new_v4(),
            sell_order_id: Uuid::new_v4(),
            buyer_user_id: Uuid::new_v4(),
            seller_user_id: Uuid::new_v4(),
            quantity: Decimal::from(1),
            price: Decimal::from(100),
            executed_at: chrono::Utc::now(),
        };
        store
            .commit(OrderWriteSet {
                insert_trades: vec![trade.clone()],
                ..Default::default()
            })
            .await
            .unwrap();

        let result = store
            .commit(OrderWriteSet {
                insert_trades: vec![trade],
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(StorageError::Duplicate(_))));
    }
}
