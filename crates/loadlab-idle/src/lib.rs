//! loadlab-idle — idle webhook listener.
//!
//! Demonstrates a deliberately over-provisioned workload: the app does
//! nothing except echo webhooks, and its resource gauges are preset to
//! idle values (roughly 10m CPU, 30Mi memory) rather than measured.
//!
//! # HTTP surface
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Endpoint index |
//! | GET | `/health` | Health check |
//! | GET | `/ready` | Readiness (always ready) |
//! | GET | `/status` | Config + advertised idle metrics |
//! | POST | `/webhook` | Webhook receiver |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

use loadlab_core::{Gauge, Histogram, LabeledCounter};

/// Advertised idle CPU: 1% of one core.
pub const IDLE_CPU_CORES: f64 = 0.01;
/// Advertised idle memory: 30Mi.
pub const IDLE_MEMORY_BYTES: f64 = 30.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone)]
pub struct Config {
    /// Adds ~10ms of simulated processing per webhook.
    pub simulate_load: bool,
}

pub struct AppMetrics {
    pub requests_total: LabeledCounter,
    pub webhooks_received: LabeledCounter,
    /// Observed for `/webhook` only.
    pub request_duration: Histogram,
    pub active_connections: Gauge,
    pub cpu_usage_estimate: Gauge,
    pub memory_usage_bytes: Gauge,
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AppMetrics {
    pub fn new() -> Self {
        let metrics = Self {
            requests_total: LabeledCounter::new(&["endpoint", "method", "status"]),
            webhooks_received: LabeledCounter::new(&["event_type"]),
            request_duration: Histogram::with_default_buckets(),
            active_connections: Gauge::new(),
            cpu_usage_estimate: Gauge::new(),
            memory_usage_bytes: Gauge::new(),
        };
        metrics.cpu_usage_estimate.set(IDLE_CPU_CORES);
        metrics.memory_usage_bytes.set(IDLE_MEMORY_BYTES);
        metrics
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.requests_total
            .render_into(&mut out, "app_requests_total", "Total requests");
        self.webhooks_received.render_into(
            &mut out,
            "app_webhooks_received_total",
            "Total webhooks received",
        );
        self.request_duration.render_into(
            &mut out,
            "app_request_duration_seconds",
            "Request duration",
        );
        self.active_connections.render_into(
            &mut out,
            "app_active_connections",
            "Number of active connections",
        );
        self.cpu_usage_estimate
            .render_into(&mut out, "app_cpu_usage_estimate", "Estimated CPU usage");
        self.memory_usage_bytes.render_into(
            &mut out,
            "app_memory_usage_bytes",
            "Estimated memory usage in bytes",
        );
        out
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub metrics: Arc<AppMetrics>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            metrics: Arc::new(AppMetrics::new()),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/status", get(handlers::status))
        .route("/webhook", post(handlers::webhook))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::track_connections,
        ))
        .with_state(state)
}
