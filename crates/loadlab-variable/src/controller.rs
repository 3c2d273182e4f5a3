//! Load pattern controller — the periodic reconcile loop.
//!
//! Every tick: compute the target worker count for the configured
//! pattern, reconcile the pool toward it, and publish load and resource
//! gauges. Nothing here is fatal; tick errors are logged and the next
//! tick proceeds as normal.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{info, warn};

use crate::AppState;
use crate::worker::WorkerPool;

pub const TICK: Duration = Duration::from_secs(5);

pub struct Controller {
    state: AppState,
    tick: Duration,
    pool: WorkerPool,
    started: Instant,
}

impl Controller {
    pub fn new(state: AppState, tick: Duration) -> Self {
        Self {
            state,
            tick,
            pool: WorkerPool::new(),
            started: Instant::now(),
        }
    }

    /// Run until the stop token flips, then drain the pool.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(tick_secs = self.tick.as_secs(), "load controller started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.tick) => {
                    self.tick_once(&shutdown).await;
                }
                _ = shutdown.changed() => {
                    info!("load controller shutting down");
                    break;
                }
            }
        }

        self.pool.join_all().await;
        info!("all workers stopped");
    }

    async fn tick_once(&mut self, stop: &watch::Receiver<bool>) {
        let config = self.state.config.read().await.clone();

        if config.enabled {
            let elapsed = self.started.elapsed().as_secs_f64();
            let target = config.pattern_mode.target(
                elapsed,
                config.cycle_duration,
                config.base_load,
                config.max_load,
                config.manual_workers,
                &mut rand::thread_rng(),
            );

            self.pool.reconcile(target.workers, &self.state.metrics, stop);

            if let Some(level) = target.load_level {
                self.state.metrics.load_level.set(level as f64);
            }
            self.state
                .metrics
                .active_workers
                .set(self.pool.alive() as f64);
        }

        // Resource gauges are refreshed even while disabled.
        match loadlab_core::rss_bytes() {
            Ok(bytes) => self.state.metrics.memory_usage_bytes.set(bytes as f64),
            Err(e) => warn!(error = %e, "rss sample failed"),
        }
        match self.state.cpu.lock().await.sample() {
            Ok(cores) => self.state.metrics.cpu_usage_estimate.set(cores),
            Err(e) => warn!(error = %e, "cpu sample failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuntimeConfig;
    use crate::pattern::LoadPattern;

    fn test_state(pattern: LoadPattern, enabled: bool) -> AppState {
        AppState::new(RuntimeConfig {
            pattern_mode: pattern,
            base_load: 2,
            max_load: 4,
            cycle_duration: 120,
            manual_workers: 3,
            enabled,
        })
    }

    #[tokio::test]
    async fn tick_reconciles_toward_manual_target() {
        let state = test_state(LoadPattern::Manual, true);
        let (tx, rx) = watch::channel(false);
        let mut controller = Controller::new(state.clone(), TICK);

        controller.tick_once(&rx).await;

        assert_eq!(controller.pool.alive(), 3);
        assert_eq!(state.metrics.active_workers.get(), 3.0);
        assert_eq!(state.metrics.workers_created.get(), 3);
        // Manual leaves the load level gauge untouched.
        assert_eq!(state.metrics.load_level.get(), 0.0);

        let _ = tx.send(true);
        controller.pool.join_all().await;
    }

    #[tokio::test]
    async fn disabled_controller_spawns_nothing() {
        let state = test_state(LoadPattern::Wave, false);
        let (_tx, rx) = watch::channel(false);
        let mut controller = Controller::new(state.clone(), TICK);

        controller.tick_once(&rx).await;

        assert_eq!(controller.pool.total_created(), 0);
        // Resource gauges still refresh while disabled.
        assert!(state.metrics.memory_usage_bytes.get() > 0.0);
    }

    #[tokio::test]
    async fn tick_publishes_load_level() {
        let state = test_state(LoadPattern::Spike, true);
        let (tx, rx) = watch::channel(false);
        let mut controller = Controller::new(state.clone(), TICK);

        controller.tick_once(&rx).await;

        // Right after start the spike pattern is on its first plateau.
        assert_eq!(state.metrics.load_level.get(), 100.0);
        assert_eq!(controller.pool.alive(), 4);

        let _ = tx.send(true);
        controller.pool.join_all().await;
    }

    #[tokio::test]
    async fn run_drains_workers_on_shutdown() {
        let state = test_state(LoadPattern::Manual, true);
        let (tx, rx) = watch::channel(false);
        let controller = Controller::new(state.clone(), Duration::from_millis(10));

        let handle = tokio::spawn(controller.run(rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = tx.send(true);
        handle.await.unwrap();

        assert_eq!(state.metrics.workers_created.get(), 3);
    }
}
