//! Worker pool — fixed-shape busy-work tasks spawned by the controller.
//!
//! The pool is append-only: scale-up spawns new workers, scale-down is
//! logged but never terminates a running worker. Workers only exit when
//! the process-wide stop token flips.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, trace};

use crate::AppMetrics;

/// A spawned worker and its identifier.
struct WorkerHandle {
    id: usize,
    handle: JoinHandle<()>,
}

/// Append-only collection of worker handles.
#[derive(Default)]
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of workers whose task has not finished.
    pub fn alive(&self) -> u32 {
        self.workers
            .iter()
            .filter(|w| !w.handle.is_finished())
            .count() as u32
    }

    /// Total workers ever spawned.
    pub fn total_created(&self) -> usize {
        self.workers.len()
    }

    /// Adjust the live worker count toward `target`.
    ///
    /// Scale-up spawns `target - alive` workers fire-and-forget; ids
    /// continue from the pool length. Scale-down only logs the intended
    /// reduction.
    pub fn reconcile(
        &mut self,
        target: u32,
        metrics: &Arc<AppMetrics>,
        stop: &watch::Receiver<bool>,
    ) {
        let current = self.alive();

        if target > current {
            for _ in 0..(target - current) {
                self.spawn(metrics.clone(), stop.clone());
            }
            info!(from = current, to = target, "scaled up workers");
        } else if target < current {
            // Advisory only: no worker is signalled or terminated.
            info!(
                from = current,
                to = target,
                excess = current - target,
                "scale-down requested; workers left running"
            );
        }
    }

    fn spawn(&mut self, metrics: Arc<AppMetrics>, stop: watch::Receiver<bool>) {
        let id = self.workers.len();
        metrics.workers_created.inc();
        let handle = tokio::task::spawn_blocking(move || worker_loop(id, metrics, stop));
        self.workers.push(WorkerHandle { id, handle });
    }

    /// Await every worker. Called after the stop token flips; workers
    /// exit at their next iteration boundary.
    pub async fn join_all(self) {
        for worker in self.workers {
            if let Err(e) = worker.handle.await {
                tracing::warn!(worker = worker.id, error = %e, "worker task failed");
            }
        }
    }
}

/// One worker iteration: burn CPU for 50-150ms, churn a short-lived
/// allocation, record the unit, sleep 100-300ms.
fn worker_loop(id: usize, metrics: Arc<AppMetrics>, stop: watch::Receiver<bool>) {
    info!(worker = id, "worker started");
    let mut rng = rand::thread_rng();

    while !*stop.borrow() {
        let started = Instant::now();

        let budget = Duration::from_secs_f64(rng.gen_range(0.05..0.15));
        let checksum = compute_work(budget);

        // Transient memory churn, dropped at the end of the iteration.
        let churn: Vec<f64> = (0..rng.gen_range(1000..=5000))
            .map(|_| rng.gen_range(0.0..1.0))
            .collect();
        trace!(worker = id, checksum, churn = churn.len(), "work unit done");

        metrics.processing_time.observe(started.elapsed().as_secs_f64());
        metrics.work_completed.inc();

        std::thread::sleep(Duration::from_secs_f64(rng.gen_range(0.1..0.3)));
    }

    info!(worker = id, "worker stopped");
}

/// Sum of squares over a fixed range, repeated until the budget is
/// spent. The checksum escapes through the caller's trace log so the
/// loop cannot be optimized away.
pub fn compute_work(budget: Duration) -> u64 {
    let started = Instant::now();
    let mut acc: u64 = 0;
    while started.elapsed() < budget {
        for i in 0..1000u64 {
            acc = acc.wrapping_add(i * i);
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_metrics() -> Arc<AppMetrics> {
        Arc::new(AppMetrics::new())
    }

    #[tokio::test]
    async fn reconcile_spawns_up_to_target() {
        let metrics = test_metrics();
        let (tx, rx) = watch::channel(false);
        let mut pool = WorkerPool::new();

        pool.reconcile(3, &metrics, &rx);
        assert_eq!(pool.alive(), 3);
        assert_eq!(pool.total_created(), 3);

        let _ = tx.send(true);
        pool.join_all().await;
    }

    #[tokio::test]
    async fn reconcile_never_shrinks_the_pool() {
        let metrics = test_metrics();
        let (tx, rx) = watch::channel(false);
        let mut pool = WorkerPool::new();

        pool.reconcile(4, &metrics, &rx);
        let before = pool.alive();

        // Scale-down is advisory: nothing is terminated.
        pool.reconcile(1, &metrics, &rx);
        assert_eq!(pool.alive(), before);
        assert_eq!(pool.total_created(), 4);

        // Scale back up only adds the difference over what is alive.
        pool.reconcile(6, &metrics, &rx);
        assert_eq!(pool.alive(), 6);
        assert_eq!(pool.total_created(), 6);

        let _ = tx.send(true);
        pool.join_all().await;
    }

    #[tokio::test]
    async fn reconcile_equal_target_is_a_no_op() {
        let metrics = test_metrics();
        let (tx, rx) = watch::channel(false);
        let mut pool = WorkerPool::new();

        pool.reconcile(2, &metrics, &rx);
        pool.reconcile(2, &metrics, &rx);
        assert_eq!(pool.total_created(), 2);

        let _ = tx.send(true);
        pool.join_all().await;
    }

    #[tokio::test]
    async fn workers_record_completed_units() {
        let metrics = test_metrics();
        let (tx, rx) = watch::channel(false);
        let mut pool = WorkerPool::new();

        pool.reconcile(2, &metrics, &rx);
        // One iteration takes at most ~450ms.
        tokio::time::sleep(Duration::from_millis(600)).await;
        let _ = tx.send(true);
        pool.join_all().await;

        assert!(metrics.work_completed.get() >= 2);
        assert!(metrics.processing_time.count() >= 2);
    }

    #[test]
    fn compute_work_respects_budget() {
        let budget = Duration::from_millis(20);
        let started = Instant::now();
        compute_work(budget);
        let elapsed = started.elapsed();
        assert!(elapsed >= budget);
        assert!(elapsed < budget * 10, "ran for {elapsed:?}");
    }
}
