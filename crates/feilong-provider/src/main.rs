//! Feilong provider entry point.
//!
//! Connects to the z/VM cloud connector, then serves resource operations
//! over stdio until the host closes stdin or a shutdown signal arrives.

use anyhow::Context;
use feilong_provider::{serve, Handler, ProviderConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr, stdout carries responses
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("feilong_provider=info".parse()?)
                .add_directive("feilong_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Feilong provider");

    let config = ProviderConfig::from_env();
    tracing::info!(?config, "Configuration loaded");
    config.validate().context("invalid configuration")?;

    let gateway = feilong_core::connect(config.client_config())
        .await
        .with_context(|| format!("failed to connect to {}", config.connector))?;

    let shutdown = CancellationToken::new();
    let handler = Arc::new(Handler::new(
        Arc::new(gateway),
        config.context(),
        shutdown.clone(),
    ));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal");
            signal_token.cancel();
        }
    });

    tracing::info!("Provider ready");
    serve(handler, tokio::io::stdin(), tokio::io::stdout(), shutdown).await?;

    tracing::info!("Provider shutdown complete");
    Ok(())
}
