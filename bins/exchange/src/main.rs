//! Exchange core CLI binary.
//!
//! Transport-free by design (spec.md non-goal: no HTTP/gRPC/WS server).
//! `replay` wires up the in-memory core and drives a scripted order stream
//! through it so the matching/order-service/market-data pipeline can be
//! exercised end to end from the command line.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use common::{Decimal, OrderType, Side, TimeInForce};
use config::{generate_default_config, load_config, save_config, validate, ExchangeCoreConfig};
use instrument::{InMemoryInstrumentStore, Instrument, InstrumentStore};
use observability::{init_logging, LogFormat};
use order_service::{OrderService, PlaceOrderRequest};
use storage::{Account, InMemoryPersistence, PersistencePort};
use tracing::{error, info};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Replay { config } => {
            let config = load_config(&config)?;
            let format = LogFormat::parse(&config.log_format).unwrap_or_default();
            init_logging("exchange", format)?;
            replay(&config).await
        }
        Commands::Validate { config } => validate_command(config),
        Commands::Init { output } => init_command(output),
    }
}

fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = load_config(&config_path).with_context(|| "failed to load configuration")?;
    let report = validate(&config);

    if !report.is_valid() {
        println!("Configuration is invalid:");
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        anyhow::bail!("configuration validation failed");
    }

    println!("Configuration is valid.");
    println!("exchange_name: {}", config.exchange_name);
    println!("store_backend: {:?}", config.store_backend);
    println!("market_buy_policy: {:?}", config.market_buy_policy);
    Ok(())
}

fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let config = generate_default_config();
    save_config(&config, &output_path)?;
    println!("Wrote default configuration to {:?}", output_path.as_ref());
    Ok(())
}

fn btc_usd() -> Instrument {
    use std::str::FromStr;
    Instrument {
        symbol: "BTC-USD".to_string(),
        quote_currency: "USD".to_string(),
        min_price: Decimal::from_str("0.01").unwrap(),
        max_price: Decimal::from_str("10000000").unwrap(),
        tick_size: Decimal::from_str("0.01").unwrap(),
        lot_size: Decimal::from_str("0.0001").unwrap(),
        min_quantity: Decimal::from_str("0.0001").unwrap(),
        max_quantity: Decimal::from_str("10000").unwrap(),
        is_active: true,
        expiration_date: None,
    }
}

/// Onboards an account with a starting USD/BTC balance for the demo.
async fn onboard(persistence: &InMemoryPersistence, usd: &str, btc: &str) -> Result<(Uuid, Uuid)> {
    use std::str::FromStr;
    let user_id = Uuid::new_v4();
    let account_id = Uuid::new_v4();
    persistence
        .create_account(Account {
            id: account_id,
            user_id,
            is_active: true,
        })
        .await?;
    persistence
        .credit_balance(account_id, "USD", Decimal::from_str(usd)?)
        .await?;
    persistence
        .credit_balance(account_id, "BTC", Decimal::from_str(btc)?)
        .await?;
    Ok((user_id, account_id))
}

async fn replay(config: &ExchangeCoreConfig) -> Result<()> {
    use std::str::FromStr;

    let instruments = Arc::new(InMemoryInstrumentStore::new());
    instruments.insert(btc_usd()).await?;
    let persistence = Arc::new(InMemoryPersistence::new());
    let service = OrderService::new(
        instruments,
        persistence.clone(),
        Duration::from_millis(config.commit_timeout_ms),
        config.market_buy_policy,
    );

    let (seller, seller_account) = onboard(&persistence, "1000000", "10").await?;
    let (buyer, buyer_account) = onboard(&persistence, "100000000", "10").await?;

    info!("placing resting sell orders");
    for (quantity, price) in [("1.0", "50000.00"), ("2.0", "50500.00")] {
        let resp = service
            .place_order(
                seller,
                PlaceOrderRequest {
                    account_id: seller_account,
                    instrument_symbol: "BTC-USD".to_string(),
                    side: Side::Sell,
                    order_type: OrderType::Limit,
                    time_in_force: TimeInForce::Gtc,
                    quantity: Decimal::from_str(quantity)?,
                    price: Some(Decimal::from_str(price)?),
                },
            )
            .await?;
        println!(
            "resting sell {} @ {}: order {}",
            quantity, price, resp.order.id
        );
    }

    info!("placing a market buy that walks both levels");
    let buy = service
        .place_order(
            buyer,
            PlaceOrderRequest {
                account_id: buyer_account,
                instrument_symbol: "BTC-USD".to_string(),
                side: Side::Buy,
                order_type: OrderType::Market,
                time_in_force: TimeInForce::Ioc,
                quantity: Decimal::from_str("2.5")?,
                price: None,
            },
        )
        .await?;

    println!("\nmarket buy filled {} trade(s):", buy.trades.len());
    for trade in &buy.trades {
        println!("  {} @ {}", trade.quantity, trade.price);
    }
    println!("order status: {:?}", buy.order.status);

    match service.market_data_snapshot("BTC-USD") {
        Some(snapshot) => {
            println!("\nbook snapshot (sequence {}):", snapshot.sequence);
            println!("  bids: {:?}", snapshot.bids);
            println!("  asks: {:?}", snapshot.asks);
        }
        None => error!("no book for BTC-USD after replay"),
    }

    Ok(())
}
