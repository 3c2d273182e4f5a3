//! loadlab-memory binary — memory-intensive data processor.
//!
//! Flags read from the environment as well (`BATCH_SIZE`,
//! `PROCESSING_INTERVAL`, `ENABLED`, `KEEP_IN_MEMORY`, `PORT`).

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use loadlab_memory::{AppState, Config, build_router, processor};

#[derive(Parser)]
#[command(name = "loadlab-memory", about = "Memory-intensive data processor")]
struct Cli {
    /// Records per batch.
    #[arg(long, env = "BATCH_SIZE", default_value_t = 10_000)]
    batch_size: usize,

    /// Seconds between background batches.
    #[arg(long, env = "PROCESSING_INTERVAL", default_value_t = 30)]
    processing_interval: u64,

    /// Whether processing is allowed at all.
    #[arg(long, env = "ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    enabled: bool,

    /// Whether processed batches are retained in memory.
    #[arg(long, env = "KEEP_IN_MEMORY", default_value_t = true, action = clap::ArgAction::Set)]
    keep_in_memory: bool,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    info!(
        batch_size = cli.batch_size,
        interval = cli.processing_interval,
        keep_in_memory = cli.keep_in_memory,
        enabled = cli.enabled,
        "data processor starting"
    );

    let state = AppState::new(Config {
        batch_size: cli.batch_size,
        processing_interval: cli.processing_interval,
        enabled: cli.enabled,
        keep_in_memory: cli.keep_in_memory,
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let processor_handle = tokio::spawn(processor::run(
        state.clone(),
        Duration::from_secs(cli.processing_interval),
        shutdown_rx,
    ));

    let router = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = processor_handle.await;
    info!("data processor stopped");
    Ok(())
}
