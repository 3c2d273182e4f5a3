//! loadlab-memory — memory-intensive data processor.
//!
//! Demonstrates a memory-growth load shape: batches of padded synthetic
//! records are generated on an interval and (optionally) retained in
//! memory, producing a steady RSS ramp toward an OOM scenario. The
//! background processor starts inactive and is toggled over HTTP.
//!
//! # HTTP surface
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/health` | Health check |
//! | GET | `/status` | Config + derived metrics |
//! | POST | `/process` | Process one batch now |
//! | POST | `/clear` | Drop all retained records |
//! | POST | `/start` | Activate background processing |
//! | POST | `/stop` | Deactivate background processing |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;
pub mod processor;
pub mod records;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

use axum::Router;
use axum::routing::{get, post};

use loadlab_core::{Counter, Gauge, Histogram, LabeledCounter};

use crate::records::Record;

/// Startup configuration; immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    /// Records per batch.
    pub batch_size: usize,
    /// Seconds between background batches.
    pub processing_interval: u64,
    pub enabled: bool,
    /// Whether processed batches are retained in memory.
    pub keep_in_memory: bool,
}

pub struct AppMetrics {
    pub requests_total: LabeledCounter,
    pub memory_usage_bytes: Gauge,
    pub processing_time: Histogram,
    pub batches_processed: Counter,
    pub records_processed: Counter,
    pub active_batch_size: Gauge,
    pub stored_records: Gauge,
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
            processing_time: Histogram::new(&[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            batches_processed: Counter::new(),
            records_processed: Counter::new(),
            active_batch_size: Gauge::new(),
            stored_records: Gauge::new(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.requests_total
            .render_into(&mut out, "app_requests_total", "Total HTTP requests");
        self.memory_usage_bytes.render_into(
            &mut out,
            "app_memory_usage_bytes",
            "Current memory usage in bytes",
        );
        self.processing_time.render_into(
            &mut out,
            "app_processing_time_seconds",
            "Time to process a batch",
        );
        self.batches_processed.render_into(
            &mut out,
            "app_batches_processed_total",
            "Total batches processed",
        );
        self.records_processed.render_into(
            &mut out,
            "app_records_processed_total",
            "Total records processed",
        );
        self.active_batch_size
            .render_into(&mut out, "app_active_batch_size", "Current batch size");
        self.stored_records.render_into(
            &mut out,
            "app_stored_records_count",
            "Number of records stored in memory",
        );
        out
    }
}

/// Shared state for handlers and the background processor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub metrics: Arc<AppMetrics>,
    /// Retained records; grows while `keep_in_memory` and cleared via
    /// `/clear`.
    pub store: Arc<RwLock<Vec<Record>>>,
    /// Background processing toggle (`/start`, `/stop`); off at boot.
    pub active: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            metrics: Arc::new(AppMetrics::new()),
            store: Arc::new(RwLock::new(Vec::new())),
            active: Arc::new(AtomicBool::new(false)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/process", post(handlers::process))
        .route("/clear", post(handlers::clear))
        .route("/start", post(handlers::start))
        .route("/stop", post(handlers::stop))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}
