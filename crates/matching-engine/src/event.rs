//! Event types for the matching engine's deterministic event log.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Trade;

/// An event appended to the event log to ensure determinism and enable
/// crash recovery / replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchingEvent {
    /// An order was accepted into the book (rested, fully or partially).
    OrderAccepted {
        order_id: Uuid,
        instrument_symbol: String,
        sequence: u64,
    },

    /// An order was removed from the book (cancel, or fully filled).
    OrderRemoved {
        order_id: Uuid,
        instrument_symbol: String,
        sequence: u64,
    },

    /// A trade was executed.
    TradeExecuted { trade: Trade, sequence: u64 },

    /// Sequence was reset (for testing/recovery).
    SequenceReset { sequence: u64 },
}

impl MatchingEvent {
    pub fn sequence(&self) -> u64 {
        match self {
            MatchingEvent::OrderAccepted { sequence, .. }
            | MatchingEvent::OrderRemoved { sequence, .. }
            | MatchingEvent::TradeExecuted { sequence, .. }
            | MatchingEvent::SequenceReset { sequence } => *sequence,
        }
    }
}
