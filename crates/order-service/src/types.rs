//! Wire-shaped request/response types for the order service (spec.md §6).
//! These carry `serde` derives so a transport crate can hang a codec off
//! them without the core depending on one.

use common::{Decimal, OrderType, Side, TimeInForce};
use matching_engine::Trade;
use serde::{Deserialize, Serialize};
use storage::Order;
use uuid::Uuid;

/// A new-order placement request (spec.md §6 "Placement request").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub account_id: Uuid,
    pub instrument_symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    #[serde(default)]
    pub time_in_force: TimeInForce,
    pub quantity: Decimal,
    /// Required for Limit, absent for Market.
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderResponse {
    pub order: Order,
    pub trades: Vec<Trade>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub order_id: Uuid,
    pub status: common::OrderStatus,
}

/// `{ orderId, newQuantity?, newPrice? }` (spec.md §6). At least one of
/// `new_quantity`/`new_price` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyOrderRequest {
    pub order_id: Uuid,
    pub new_quantity: Option<Decimal>,
    pub new_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyOrderResponse {
    pub order: Order,
    pub trades: Vec<Trade>,
}

/// Filters accepted by `listOrders` (spec.md §4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    pub statuses: Option<Vec<common::OrderStatus>>,
}
