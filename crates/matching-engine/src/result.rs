//! Result types for matching operations

use serde::{Deserialize, Serialize};

use super::domain::{BookChange, BookOrder, Trade};

/// Why an order produced no trades and was not rested (spec.md §4.2/§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectedReason {
    /// FOK could not be filled in full at submission time.
    FokUnfillable,
    /// Market order had no crossable liquidity on the opposite side.
    NoLiquidity,
}

/// Result of `processOrder` (spec.md §4.2).
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Trades generated from this matching operation, in match order.
    pub trades: Vec<Trade>,
    /// The taker's residual, if any quantity remains unfilled.
    pub residual: Option<BookOrder>,
    /// Whether `residual` was inserted into the book (GTC) or discarded
    /// (IOC/FOK/Market-with-no-more-liquidity).
    pub residual_rests_in_book: bool,
    /// Set only when no trades were produced and nothing rests.
    pub rejected_reason: Option<RejectedReason>,
    /// Structural book changes produced by this operation, in order; feeds
    /// the market-data projection (spec.md §4.4/§4.5).
    pub book_changes: Vec<BookChange>,
}

impl MatchResult {
    pub fn fully_matched(trades: Vec<Trade>, book_changes: Vec<BookChange>) -> Self {
        Self {
            trades,
            residual: None,
            residual_rests_in_book: false,
            rejected_reason: None,
            book_changes,
        }
    }

    pub fn partial_match(
        trades: Vec<Trade>,
        residual: BookOrder,
        residual_rests_in_book: bool,
        book_changes: Vec<BookChange>,
    ) -> Self {
        Self {
            trades,
            residual: Some(residual),
            residual_rests_in_book,
            rejected_reason: None,
            book_changes,
        }
    }

    pub fn rejected(order: BookOrder, reason: RejectedReason) -> Self {
        Self {
            trades: vec![],
            residual: Some(order),
            residual_rests_in_book: false,
            rejected_reason: Some(reason),
            book_changes: vec![],
        }
    }

    pub fn has_trades(&self) -> bool {
        !self.trades.is_empty()
    }

    pub fn filled_quantity(&self) -> common::Decimal {
        self.trades.iter().map(|t| t.quantity).sum()
    }
}

/// Result of `cancelOrder` (spec.md §4.2). Cancellation is idempotent
/// externally: cancelling an already-terminal/absent order is not an
/// error, the caller distinguishes via `cancelled`.
#[derive(Debug, Clone)]
pub struct CancelResult {
    pub cancelled: bool,
    pub order: Option<BookOrder>,
    pub book_changes: Vec<BookChange>,
}

impl CancelResult {
    pub fn removed(order: BookOrder, book_changes: Vec<BookChange>) -> Self {
        Self {
            cancelled: true,
            order: Some(order),
            book_changes,
        }
    }

    pub fn not_found() -> Self {
        Self {
            cancelled: false,
            order: None,
            book_changes: vec![],
        }
    }
}
