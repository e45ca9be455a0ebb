//! Load and default-construct `ExchangeCoreConfig`.

use crate::{ExchangeCoreConfig, MarketBuyPolicy, StoreBackend};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExchangeCoreConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {:?}", path))?;

    debug!("config file content length: {} bytes", content.len());

    let config: ExchangeCoreConfig =
        serde_yaml::from_str(&content).with_context(|| "failed to parse YAML configuration")?;

    info!("configuration loaded successfully");
    Ok(config)
}

/// The configuration a fresh, un-configured deployment starts from.
pub fn generate_default_config() -> ExchangeCoreConfig {
    ExchangeCoreConfig {
        exchange_name: "Exchange Core".to_string(),
        store_backend: StoreBackend::InMemory,
        market_buy_policy: MarketBuyPolicy::MaxPrice,
        commit_timeout_ms: crate::defaults::default_commit_timeout_ms(),
        log_format: crate::defaults::default_log_format(),
        log_level: crate::defaults::default_log_level(),
        metrics_port: crate::defaults::default_metrics_port(),
    }
}

/// Writes `config` as YAML to `path`, creating parent directories first.
#[instrument(skip(config, path))]
pub fn save_config<P: AsRef<Path>>(config: &ExchangeCoreConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {:?}", parent))?;
        }
    }

    let yaml = serde_yaml::to_string(config).with_context(|| "failed to serialize configuration")?;
    fs::write(path, yaml).with_context(|| format!("failed to write config file: {:?}", path))?;

    info!("configuration written to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_parses_yaml() {
        let dir = std::env::temp_dir();
        let path = dir.join("exchange-core-config-test.yaml");
        std::fs::write(
            &path,
            r#"
exchange_name: Test Exchange
store_backend: in_memory
market_buy_policy: max_price
commit_timeout_ms: 2000
log_format: json
log_level: debug
metrics_port: 9100
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.exchange_name, "Test Exchange");
        assert_eq!(config.commit_timeout_ms, 2000);
        assert_eq!(config.metrics_port, 9100);

        std::fs::remove_file(&path).unwrap();
    }
}
