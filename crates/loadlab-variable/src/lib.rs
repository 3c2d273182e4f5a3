//! loadlab-variable — variable-load traffic simulator.
//!
//! Demonstrates a fluctuating resource-usage shape for rightsizing
//! harnesses: a periodic controller computes a target worker count from
//! a selectable waveform ([`pattern::LoadPattern`]) and reconciles an
//! append-only worker pool toward it. Workers burn CPU and churn short
//! allocations; everything observable is published on `/metrics`.
//!
//! # HTTP surface
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/health` | Health check |
//! | GET | `/status` | Config + derived metrics snapshot |
//! | POST | `/config` | Partial runtime config update |
//! | POST | `/pattern/{name}` | Switch load pattern |
//! | GET | `/metrics` | Prometheus exposition |

pub mod controller;
pub mod handlers;
pub mod pattern;
pub mod worker;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use loadlab_core::{Counter, CpuSampler, Gauge, Histogram, LabeledCounter};

use crate::pattern::LoadPattern;

/// Mutable runtime configuration, shared between the controller and the
/// administrative handlers. No validation beyond type coercion.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeConfig {
    pub pattern_mode: LoadPattern,
    pub base_load: u32,
    pub max_load: u32,
    pub cycle_duration: u64,
    pub manual_workers: u32,
    pub enabled: bool,
}

/// All metrics exposed by this app.
pub struct AppMetrics {
    /// HTTP requests by method/endpoint/status.
    pub requests_total: LabeledCounter,
    pub memory_usage_bytes: Gauge,
    pub cpu_usage_estimate: Gauge,
    pub active_workers: Gauge,
    pub load_level: Gauge,
    pub work_completed: Counter,
    pub processing_time: Histogram,
    /// Lifetime worker spawns; surfaced in `/status` only.
    pub workers_created: Counter,
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AppMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: LabeledCounter::new(&["method", "endpoint", "status"]),
            memory_usage_bytes: Gauge::new(),
            cpu_usage_estimate: Gauge::new(),
            active_workers: Gauge::new(),
            load_level: Gauge::new(),
            work_completed: Counter::new(),
            processing_time: Histogram::with_default_buckets(),
            workers_created: Counter::new(),
        }
    }

    /// Render the Prometheus exposition body.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.requests_total
            .render_into(&mut out, "app_requests_total", "Total HTTP requests");
        self.memory_usage_bytes.render_into(
            &mut out,
            "app_memory_usage_bytes",
            "Current memory usage in bytes",
        );
        self.cpu_usage_estimate.render_into(
            &mut out,
            "app_cpu_usage_estimate",
            "Estimated CPU cores in use",
        );
        self.active_workers.render_into(
            &mut out,
            "app_active_workers",
            "Number of active worker tasks",
        );
        self.load_level
            .render_into(&mut out, "app_load_level", "Current load level (0-100)");
        self.work_completed.render_into(
            &mut out,
            "app_work_completed_total",
            "Total work units completed",
        );
        self.processing_time.render_into(
            &mut out,
            "app_processing_time_seconds",
            "Time to complete a work unit",
        );
        out
    }
}

/// Shared state for handlers and the controller.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<RuntimeConfig>>,
    pub metrics: Arc<AppMetrics>,
    pub cpu: Arc<Mutex<CpuSampler>>,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(AppMetrics::new()),
            cpu: Arc::new(Mutex::new(CpuSampler::new())),
        }
    }
}

/// Build the app router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/config", post(handlers::update_config))
        .route("/pattern/{name}", post(handlers::set_pattern))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}
