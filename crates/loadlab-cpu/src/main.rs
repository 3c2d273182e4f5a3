//! loadlab-cpu binary — CPU-intensive prime calculator.
//!
//! Flags read from the environment as well (`INTENSITY`, `WORKERS`,
//! `ENABLED`, `PORT`).

use std::net::SocketAddr;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use loadlab_cpu::{AppState, Config, Intensity, build_router, worker};

#[derive(Parser)]
#[command(name = "loadlab-cpu", about = "CPU-intensive prime calculator")]
struct Cli {
    /// Workload intensity: low, medium, high.
    #[arg(long, env = "INTENSITY", default_value = "medium")]
    intensity: Intensity,

    /// Number of background workers.
    #[arg(long, env = "WORKERS", default_value_t = 4)]
    workers: u32,

    /// Whether background workers run.
    #[arg(long, env = "ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    enabled: bool,

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
        intensity = %cli.intensity,
        workers = cli.workers,
        enabled = cli.enabled,
        "prime calculator starting"
    );

    let state = AppState::new(Config {
        intensity: cli.intensity,
        workers: cli.workers,
        enabled: cli.enabled,
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handles = if cli.enabled {
        let handles = worker::spawn_workers(&state, &shutdown_rx);
        info!(count = handles.len(), "workers started");
        handles
    } else {
        info!("workers disabled");
        Vec::new()
    };

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

    for handle in worker_handles {
        let _ = handle.await;
    }
    info!("prime calculator stopped");
    Ok(())
}
