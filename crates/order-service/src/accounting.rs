//! Balance and position arithmetic for order placement and fills
//! (spec.md §4.3 "Balance reservation & atomic commit").
//!
//! These are pure functions: given the current resident state and an
//! event (reservation, fill, release), compute the deltas to commit.
//! Keeping them pure makes the atomic-commit boundary in `service.rs` the
//! only place that touches `storage`.

use common::{Decimal, Side};
use storage::{Balance, BalanceDelta, Position};
use uuid::Uuid;

/// The base-asset balance key for an instrument symbol like `"BTC-USDT"` is
/// its first hyphen-delimited segment. Instruments carry an explicit
/// `quote_currency`; the base asset is derived the same way order books are
/// named throughout the pack.
pub fn base_asset(instrument_symbol: &str) -> &str {
    instrument_symbol.split('-').next().unwrap_or(instrument_symbol)
}

/// The reservation a new order must place before it can be accepted.
/// Returns `(currency, amount)`.
pub fn required_reservation(
    side: Side,
    instrument_symbol: &str,
    quote_currency: &str,
    quantity: Decimal,
    reservation_price: Decimal,
) -> (String, Decimal) {
    match side {
        Side::Buy => (quote_currency.to_string(), quantity * reservation_price),
        Side::Sell => (base_asset(instrument_symbol).to_string(), quantity),
    }
}

/// Does `balance.available` cover the reservation amount?
pub fn has_sufficient_available(balance: Option<&Balance>, amount: Decimal) -> bool {
    balance.map(|b| b.available).unwrap_or(Decimal::ZERO) >= amount
}

/// Move `amount` of `currency` from available to reserved at order
/// acceptance time.
pub fn reserve_delta(account_id: Uuid, currency: &str, amount: Decimal) -> BalanceDelta {
    BalanceDelta {
        account_id,
        currency: currency.to_string(),
        available_delta: -amount,
        reserved_delta: amount,
    }
}

/// Return `amount` of `currency` from reserved back to available — used
/// when an order's unfilled residual is discarded (cancel, IOC/FOK).
pub fn release_delta(account_id: Uuid, currency: &str, amount: Decimal) -> BalanceDelta {
    BalanceDelta {
        account_id,
        currency: currency.to_string(),
        available_delta: amount,
        reserved_delta: -amount,
    }
}

/// The two balance deltas produced by one trade: the buyer consumes
/// `quantity * price` of quote-currency reservation and receives
/// `quantity` of base asset; the seller consumes `quantity` of base-asset
/// reservation and receives `quantity * price` of quote currency.
pub fn trade_balance_deltas(
    instrument_symbol: &str,
    quote_currency: &str,
    buyer_account_id: Uuid,
    seller_account_id: Uuid,
    quantity: Decimal,
    price: Decimal,
) -> [BalanceDelta; 4] {
    let base = base_asset(instrument_symbol);
    let notional = quantity * price;
    [
        BalanceDelta {
            account_id: buyer_account_id,
            currency: quote_currency.to_string(),
            available_delta: Decimal::ZERO,
            reserved_delta: -notional,
        },
        BalanceDelta {
            account_id: buyer_account_id,
            currency: base.to_string(),
            available_delta: quantity,
            reserved_delta: Decimal::ZERO,
        },
        BalanceDelta {
            account_id: seller_account_id,
            currency: base.to_string(),
            available_delta: Decimal::ZERO,
            reserved_delta: -quantity,
        },
        BalanceDelta {
            account_id: seller_account_id,
            currency: quote_currency.to_string(),
            available_delta: notional,
            reserved_delta: Decimal::ZERO,
        },
    ]
}

/// Applies one fill to a resident position, returning the new position
/// state. A fill that reduces or flips an existing position realizes P&L
/// on the reduced portion; the remainder (if any, on a flip) opens a new
/// position at the fill price.
pub fn apply_fill_to_position(
    existing: Option<&Position>,
    user_id: Uuid,
    instrument_symbol: &str,
    side: Side,
    quantity: Decimal,
    price: Decimal,
) -> Position {
    let signed_fill = match side {
        Side::Buy => quantity,
        Side::Sell => -quantity,
    };

    let Some(existing) = existing else {
        return Position {
            user_id,
            instrument_symbol: instrument_symbol.to_string(),
            quantity: signed_fill,
            average_price: price,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
        };
    };

    let same_direction = existing.quantity == Decimal::ZERO
        || (existing.quantity > Decimal::ZERO) == (signed_fill > Decimal::ZERO);

    if same_direction {
        let new_quantity = existing.quantity + signed_fill;
        let weighted = existing.quantity.abs() * existing.average_price + quantity * price;
        let new_average = if new_quantity.is_zero() {
            Decimal::ZERO
        } else {
            weighted / new_quantity.abs()
        };
        return Position {
            user_id,
            instrument_symbol: instrument_symbol.to_string(),
            quantity: new_quantity,
            average_price: new_average,
            unrealized_pnl: existing.unrealized_pnl,
            realized_pnl: existing.realized_pnl,
        };
    }

    // Opposite direction: reduces, closes, or flips the position.
    let closing_quantity = quantity.min(existing.quantity.abs());
    let realized = match existing.quantity > Decimal::ZERO {
        true => (price - existing.average_price) * closing_quantity,
        false => (existing.average_price - price) * closing_quantity,
    };
    let new_quantity = existing.quantity + signed_fill;

    let new_average_price = if new_quantity == Decimal::ZERO {
        Decimal::ZERO
    } else if (new_quantity > Decimal::ZERO) == (existing.quantity > Decimal::ZERO) {
        // Still reducing the same side, average price is unchanged.
        existing.average_price
    } else {
        // Flipped through zero; the excess opens a fresh position at the fill price.
        price
    };

    Position {
        user_id,
        instrument_symbol: instrument_symbol.to_string(),
        quantity: new_quantity,
        average_price: new_average_price,
        unrealized_pnl: existing.unrealized_pnl,
        realized_pnl: existing.realized_pnl + realized,
    }
}
