//! loadlab-idle binary — idle webhook listener.
//!
//! Flags read from the environment as well (`SIMULATE_LOAD`, `PORT`).

use std::net::SocketAddr;

use clap::Parser;
use tracing::info;

use loadlab_idle::{AppState, Config, build_router};

#[derive(Parser)]
#[command(name = "loadlab-idle", about = "Idle webhook listener")]
struct Cli {
    /// Add ~10ms of simulated processing per webhook.
    #[arg(long, env = "SIMULATE_LOAD", default_value_t = false, action = clap::ArgAction::Set)]
    simulate_load: bool,

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
    info!(simulate_load = cli.simulate_load, "webhook listener starting");

    let state = AppState::new(Config {
        simulate_load: cli.simulate_load,
    });

    let router = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
        })
        .await?;

    info!("webhook listener stopped");
    Ok(())
}
