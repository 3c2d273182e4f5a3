//! loadlab-cpu — CPU-intensive prime calculator.
//!
//! Demonstrates a CPU-bound load shape: a fixed set of background
//! workers continuously searches consecutive ranges for primes using a
//! deliberately naive trial-division test. Intensity selects the range
//! size and inter-range sleep.
//!
//! # HTTP surface
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Endpoint index |
//! | GET | `/health` | Health check |
//! | GET | `/ready` | Readiness (all workers spawned) |
//! | GET | `/status` | Config + derived metrics |
//! | GET | `/calculate` | On-demand primes up to 10000 |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;
pub mod primes;
pub mod worker;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use thiserror::Error;

use loadlab_core::{Counter, Gauge, Histogram, LabeledCounter};

/// Workload intensity, selecting range size and inter-range sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Error)]
#[error("invalid intensity {0:?}; must be one of: low, medium, high")]
pub struct UnknownIntensity(pub String);

impl FromStr for Intensity {
    type Err = UnknownIntensity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(UnknownIntensity(other.to_string())),
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(name)
    }
}

impl Intensity {
    /// Numbers examined per worker iteration.
    pub fn range_size(self) -> u64 {
        match self {
            Self::Low => 1_000,
            Self::Medium => 5_000,
            Self::High => 10_000,
        }
    }

    /// Sleep between ranges.
    pub fn sleep(self) -> Duration {
        match self {
            Self::Low => Duration::from_millis(500),
            Self::Medium => Duration::from_millis(100),
            Self::High => Duration::from_millis(10),
        }
    }

    /// Numeric level for the intensity gauge.
    pub fn level(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

/// Startup configuration; immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    pub intensity: Intensity,
    pub workers: u32,
    pub enabled: bool,
}

pub struct AppMetrics {
    pub requests_total: LabeledCounter,
    pub primes_calculated: Counter,
    pub cpu_intensity: Gauge,
    pub calculation_duration: Histogram,
    pub active_workers: Gauge,
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AppMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: LabeledCounter::new(&["endpoint", "method"]),
            primes_calculated: Counter::new(),
            cpu_intensity: Gauge::new(),
            calculation_duration: Histogram::with_default_buckets(),
            active_workers: Gauge::new(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.requests_total
            .render_into(&mut out, "app_requests_total", "Total requests");
        self.primes_calculated.render_into(
            &mut out,
            "app_primes_calculated_total",
            "Total prime numbers calculated",
        );
        self.cpu_intensity.render_into(
            &mut out,
            "app_cpu_intensity",
            "Current CPU intensity level (0-3)",
        );
        self.calculation_duration.render_into(
            &mut out,
            "app_calculation_duration_seconds",
            "Time spent calculating primes",
        );
        self.active_workers.render_into(
            &mut out,
            "app_active_workers",
            "Number of active worker tasks",
        );
        out
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub metrics: Arc<AppMetrics>,
    /// Workers spawned so far; `/ready` compares against `config.workers`.
    pub spawned: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            metrics: Arc::new(AppMetrics::new()),
            spawned: Arc::new(AtomicU64::new(0)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/status", get(handlers::status))
        .route("/calculate", get(handlers::calculate))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_parse_and_display() {
        assert_eq!("low".parse::<Intensity>().unwrap(), Intensity::Low);
        assert_eq!("high".parse::<Intensity>().unwrap().to_string(), "high");
        assert!("extreme".parse::<Intensity>().is_err());
    }

    #[test]
    fn intensity_mapping() {
        assert_eq!(Intensity::Low.range_size(), 1_000);
        assert_eq!(Intensity::Medium.level(), 2);
        assert_eq!(Intensity::High.sleep(), Duration::from_millis(10));
    }
}
