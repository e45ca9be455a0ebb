//! Prometheus metrics infrastructure
//!
//! This module starts the process-wide Prometheus exporter. Each service
//! crate (e.g. `matching-engine`) registers its own metrics against the
//! global `metrics` recorder installed here.

use std::net::SocketAddr;

/// Initialize the Prometheus metrics exporter.
///
/// Starts an HTTP listener on the given port exposing metrics at `/metrics`.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}
