//! loadlab-variable binary — variable-load traffic simulator.
//!
//! ```text
//! loadlab-variable --pattern-mode wave --base-load 10 --max-load 50
//! ```
//!
//! Every flag also reads from the environment (`PATTERN_MODE`,
//! `BASE_LOAD`, `MAX_LOAD`, `CYCLE_DURATION`, `ENABLED`, `PORT`).

use std::net::SocketAddr;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use loadlab_variable::controller::{Controller, TICK};
use loadlab_variable::pattern::LoadPattern;
use loadlab_variable::{AppState, RuntimeConfig, build_router};

#[derive(Parser)]
#[command(name = "loadlab-variable", about = "Variable-load traffic simulator")]
struct Cli {
    /// Load pattern: wave, spike, random, manual.
    #[arg(long, env = "PATTERN_MODE", default_value = "wave")]
    pattern_mode: LoadPattern,

    /// Base number of concurrent workers.
    #[arg(long, env = "BASE_LOAD", default_value_t = 10)]
    base_load: u32,

    /// Maximum number of workers.
    #[arg(long, env = "MAX_LOAD", default_value_t = 50)]
    max_load: u32,

    /// Seconds for one complete cycle.
    #[arg(long, env = "CYCLE_DURATION", default_value_t = 120)]
    cycle_duration: u64,

    /// Whether the load controller runs.
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
        pattern = %cli.pattern_mode,
        base = cli.base_load,
        max = cli.max_load,
        cycle = cli.cycle_duration,
        enabled = cli.enabled,
        "variable-load simulator starting"
    );

    let state = AppState::new(RuntimeConfig {
        pattern_mode: cli.pattern_mode,
        base_load: cli.base_load,
        max_load: cli.max_load,
        cycle_duration: cli.cycle_duration,
        manual_workers: cli.base_load,
        enabled: cli.enabled,
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let controller = Controller::new(state.clone(), TICK);
    let controller_handle = tokio::spawn(controller.run(shutdown_rx));

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

    let _ = controller_handle.await;
    info!("variable-load simulator stopped");
    Ok(())
}
