//! Background batch processor.
//!
//! Runs one batch per interval while enabled and activated. Batch
//! generation happens on the blocking pool; the memory gauge refreshes
//! every interval regardless of activation.

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::{AppState, records};

/// Backoff after a failed batch task.
const ERROR_BACKOFF: Duration = Duration::from_secs(10);

pub async fn run(state: AppState, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    info!(
        interval_secs = interval.as_secs(),
        "background processor started"
    );

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                tick(&state).await;
            }
            _ = shutdown.changed() => {
                info!("background processor shutting down");
                break;
            }
        }
    }
}

async fn tick(state: &AppState) {
    if state.config.enabled && state.active.load(Ordering::Relaxed) {
        let task_state = state.clone();
        let batch_size = state.config.batch_size;
        let result =
            tokio::task::spawn_blocking(move || records::process_batch(&task_state, batch_size))
                .await;

        match result {
            Ok(result) => info!(
                batch_size = result.batch_size,
                total_stored = result.total_stored,
                "background batch complete"
            ),
            Err(e) => {
                error!(error = %e, "background batch failed");
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }

    match loadlab_core::rss_bytes() {
        Ok(bytes) => state.metrics.memory_usage_bytes.set(bytes as f64),
        Err(e) => warn!(error = %e, "rss sample failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn test_state(enabled: bool) -> AppState {
        AppState::new(Config {
            batch_size: 10,
            processing_interval: 1,
            enabled,
            keep_in_memory: true,
        })
    }

    #[tokio::test]
    async fn inactive_processor_only_refreshes_gauges() {
        let state = test_state(true);
        tick(&state).await;

        assert_eq!(state.metrics.batches_processed.get(), 0);
        assert!(state.metrics.memory_usage_bytes.get() > 0.0);
    }

    #[tokio::test]
    async fn active_processor_runs_batches() {
        let state = test_state(true);
        state.active.store(true, Ordering::Relaxed);

        tick(&state).await;
        tick(&state).await;

        assert_eq!(state.metrics.batches_processed.get(), 2);
        assert_eq!(state.store.read().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn disabled_processor_never_runs_batches() {
        let state = test_state(false);
        state.active.store(true, Ordering::Relaxed);

        tick(&state).await;
        assert_eq!(state.metrics.batches_processed.get(), 0);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let state = test_state(true);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(run(state, Duration::from_millis(10), rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        let _ = tx.send(true);
        handle.await.unwrap();
    }
}
