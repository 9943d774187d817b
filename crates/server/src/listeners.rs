use anyhow::{Context, Result};
use crest_core::config::AppConfig;
use tokio::net::TcpListener;
use tracing::info;

/// Sockets bound before any server future is built.
pub struct Listeners {
    pub proxy: TcpListener,
    pub metrics: Option<TcpListener>,
}

/// Binds the proxy listener and, when enabled, the metrics listener.
///
/// # Errors
///
/// Returns an error if either address is invalid or cannot be bound.
pub async fn bind_listeners(config: &AppConfig) -> Result<Listeners> {
    let addr = config.socket_addr()?;
    let proxy = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind proxy listener on {addr}"))?;
    info!(address = %addr, upstreams = config.upstreams.endpoints.len(), "Proxy listening");

    let metrics = if config.metrics.enabled {
        let metrics_addr = config.metrics_socket_addr()?;
        let listener = TcpListener::bind(metrics_addr)
            .await
            .with_context(|| format!("failed to bind metrics listener on {metrics_addr}"))?;
        info!(address = %metrics_addr, "Metrics listening");
        Some(listener)
    } else {
        None
    };

    Ok(Listeners { proxy, metrics })
}
