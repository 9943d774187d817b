use anyhow::Result;
use axum::serve;
use clap::Parser;
use crest_core::{config::AppConfig, runtime::CrestRuntime};
use server::{args::Args, bind_listeners, create_app, create_metrics_app, AppState};
use std::future::IntoFuture;
use tokio::{signal, sync::broadcast};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(config: &AppConfig) {
    let level = config.logging.level.as_str();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,crest_core={level},server={level}")));

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args
        .load_config()
        .and_then(|config| config.validate().map(|()| config))
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting crest");
    debug!(
        upstreams = ?config.upstreams.endpoints,
        primary = ?config.health.primary_upstream,
        poll_interval_ms = config.poller.interval_ms,
        "Configuration loaded"
    );

    let listeners = bind_listeners(&config).await?;
    let runtime = CrestRuntime::builder().with_config(config.clone()).enable_poller().build()?;

    // Fans the OS signal out to every listener and the grace timer.
    let (signal_tx, _) = broadcast::channel::<()>(1);
    let notify = signal_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = notify.send(());
    });

    let proxy_server = serve(listeners.proxy, create_app(AppState::from_runtime(&runtime)))
        .with_graceful_shutdown(wait_for(signal_tx.subscribe()))
        .into_future();

    let servers = async {
        if let Some(metrics_listener) = listeners.metrics {
            let metrics_server =
                serve(metrics_listener, create_metrics_app(runtime.metrics_collector().clone()))
                    .with_graceful_shutdown(wait_for(signal_tx.subscribe()))
                    .into_future();

            let (proxy_result, metrics_result) = tokio::join!(proxy_server, metrics_server);
            proxy_result?;
            metrics_result?;
        } else {
            proxy_server.await?;
        }
        anyhow::Ok(())
    };

    let grace = config.shutdown_grace();
    let mut grace_rx = signal_tx.subscribe();
    let outcome = tokio::select! {
        result = servers => {
            if let Err(e) = &result {
                error!(error = %e, "Server error occurred");
            }
            result
        }
        () = async {
            let _ = grace_rx.recv().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(grace = ?grace, "Grace period elapsed, dropping open connections");
            Ok(())
        }
    };

    runtime.shutdown().await;
    info!("Server shutdown complete");

    outcome
}

async fn wait_for(mut rx: broadcast::Receiver<()>) {
    let _ = rx.recv().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
