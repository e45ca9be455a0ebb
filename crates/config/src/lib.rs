//! Configuration for the exchange core: store backend selection, the
//! Market Buy reservation policy, persistence commit timeout, and the
//! logging/metrics defaults every binary starts from.

use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod parser;
pub mod validator;

pub use parser::{generate_default_config, load_config, save_config};
pub use validator::{validate, ValidationError, ValidationReport};

/// Which persistence implementation the exchange core commits order
/// write-sets against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Snapshot-and-swap in-memory store (default; durable across process
    /// lifetime only).
    InMemory,
}

/// How a Market Buy order's quote-currency reservation is computed, since
/// a Market order carries no price to multiply against (spec open question,
/// resolved in DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketBuyPolicy {
    /// Reserve `quantity * instrument.max_price` (the default).
    MaxPrice,
    /// Reject Market Buy orders outright.
    Reject,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeCoreConfig {
    pub exchange_name: String,

    #[serde(default = "defaults::default_store_backend")]
    pub store_backend: StoreBackend,

    #[serde(default = "defaults::default_market_buy_policy")]
    pub market_buy_policy: MarketBuyPolicy,

    #[serde(default = "defaults::default_commit_timeout_ms")]
    pub commit_timeout_ms: u64,

    #[serde(default = "defaults::default_log_format")]
    pub log_format: String,

    #[serde(default = "defaults::default_log_level")]
    pub log_level: String,

    #[serde(default = "defaults::default_metrics_port")]
    pub metrics_port: u16,
}
