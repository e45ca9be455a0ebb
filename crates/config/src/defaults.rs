//! Default values for optional configuration fields.

pub fn default_store_backend() -> super::StoreBackend {
    super::StoreBackend::InMemory
}

pub fn default_market_buy_policy() -> super::MarketBuyPolicy {
    super::MarketBuyPolicy::MaxPrice
}

pub fn default_commit_timeout_ms() -> u64 {
    5_000
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_metrics_port() -> u16 {
    9090
}
