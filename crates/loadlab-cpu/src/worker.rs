//! Background prime-search workers.
//!
//! Each worker walks consecutive ranges of `range_size` numbers,
//! collects the primes, and sleeps per intensity. Workers exit when the
//! stop token flips.

use std::sync::atomic::Ordering;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{AppState, primes};

/// Spawn the configured number of workers. Returns their handles so the
/// caller can await them on shutdown.
pub fn spawn_workers(state: &AppState, stop: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(state.config.workers as usize);
    for id in 0..state.config.workers {
        let state = state.clone();
        let stop = stop.clone();
        handles.push(tokio::task::spawn_blocking(move || cpu_worker(id, state, stop)));
    }

    state
        .spawned
        .store(state.config.workers as u64, Ordering::Relaxed);
    state
        .metrics
        .active_workers
        .set(state.config.workers as f64);
    state
        .metrics
        .cpu_intensity
        .set(state.config.intensity.level() as f64);

    handles
}

fn cpu_worker(id: u32, state: AppState, stop: watch::Receiver<bool>) {
    let intensity = state.config.intensity;
    info!(worker = id, intensity = %intensity, "worker started");

    let range_size = intensity.range_size();
    let sleep = intensity.sleep();
    let mut counter: u64 = 0;

    while !*stop.borrow() {
        let start = counter * range_size;
        let end = start + range_size;

        let t0 = Instant::now();
        let primes = primes::primes_in_range(start, end);
        let duration = t0.elapsed();

        state
            .metrics
            .calculation_duration
            .observe(duration.as_secs_f64());
        state.metrics.primes_calculated.add(primes.len() as u64);

        debug!(
            worker = id,
            start,
            end,
            found = primes.len(),
            secs = duration.as_secs_f64(),
            "range complete"
        );

        counter += 1;
        std::thread::sleep(sleep);
    }

    info!(worker = id, "worker stopped");
}
