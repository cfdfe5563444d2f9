//! Storefront entry point.

use std::net::SocketAddr;

use app::{AppError, Config, Storefront};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn install_metrics(addr: &str) -> Result<(), AppError> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| AppError::Metrics(format!("invalid METRICS_ADDR {addr}: {e}")))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| AppError::Metrics(e.to_string()))?;
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Configuration and tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Prometheus exporter
    install_metrics(&config.metrics_addr)?;

    // 3. Audit store and services
    let storefront = Storefront::init(&config).await?;

    // 4. Demo data
    if config.seed_demo_data {
        let summary = app::seed_demo_data(&storefront).await?;
        tracing::info!(
            products = summary.products.len(),
            customers = summary.customers.len(),
            orders = summary.orders.len(),
            "demo data seeded"
        );
    }

    // 5. Run until told to stop
    tracing::info!("storefront ready");
    shutdown_signal().await;
    storefront.shutdown().await;

    tracing::info!("shut down gracefully");
    Ok(())
}
