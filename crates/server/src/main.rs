mod api;
mod bootstrap;
mod health;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use quotedesk_core::config::{AppConfig, LoadOptions, LogFormat};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = app.config.listen_address();
    let listener =
        TcpListener::bind(&address).await.with_context(|| format!("failed to bind {address}"))?;

    let router = api::router(app.desk.clone()).merge(health::router(app.db_pool.clone()));

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        listen_address = %address,
        admin_id = app.desk.admin_id(),
        "quotedesk server listening"
    );

    let stopping = Arc::new(Notify::new());
    let signal = stopping.clone();
    let shutdown_signal = async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(
                event_name = "system.server.signal_failed",
                error = %error,
                "failed to listen for shutdown signal"
            );
            std::future::pending::<()>().await;
        }
        signal.notify_one();
    };
    let server =
        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal).into_future();

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let drain_deadline = async {
        stopping.notified().await;
        tracing::info!(
            event_name = "system.server.stopping",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "draining in-flight requests"
        );
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        served = server => served.context("server terminated unexpectedly")?,
        () = drain_deadline => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                "in-flight requests did not finish within the grace period"
            );
        }
    }

    app.db_pool.close().await;
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "quotedesk server stopped"
    );

    Ok(())
}
