//! HTTP handlers for the data processor.

use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use loadlab_core::{TEXT_FORMAT, epoch_secs};

use crate::{AppState, records};

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.requests_total.inc(&["GET", "/health", "200"]);
    Json(json!({
        "status": "healthy",
        "timestamp": epoch_secs(),
    }))
}

/// GET /status
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let rss = loadlab_core::rss_bytes().unwrap_or(0);
    let memory_mb = (rss as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0;
    let memory_percent = loadlab_core::meminfo_total_bytes()
        .map(|total| (rss as f64 / total as f64 * 10_000.0).round() / 100.0)
        .unwrap_or(0.0);

    let stored = state.store.read().unwrap_or_else(|e| e.into_inner()).len();

    state.metrics.requests_total.inc(&["GET", "/status", "200"]);
    Json(json!({
        "application": "memory-intensive-processor",
        "version": env!("CARGO_PKG_VERSION"),
        "enabled": state.config.enabled,
        "processing_active": state.active.load(Ordering::Relaxed),
        "config": {
            "batch_size": state.config.batch_size,
            "processing_interval": state.config.processing_interval,
            "keep_in_memory": state.config.keep_in_memory,
        },
        "metrics": {
            "memory_usage_mb": memory_mb,
            "memory_percent": memory_percent,
            "records_in_memory": stored,
            "batches_processed": state.metrics.batches_processed.get(),
            "total_records_processed": state.metrics.records_processed.get(),
        },
        "timestamp": epoch_secs(),
    }))
}

/// POST /process — run one batch now. Optional body `{"batch_size": n}`
/// overrides the configured size.
pub async fn process(
    State(state): State<AppState>,
    body: Option<Json<serde_json::Value>>,
) -> impl IntoResponse {
    if !state.config.enabled {
        state.metrics.requests_total.inc(&["POST", "/process", "503"]);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Processing is disabled" })),
        )
            .into_response();
    }

    let batch_size = body
        .as_ref()
        .and_then(|Json(v)| v.get("batch_size"))
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(state.config.batch_size);

    let task_state = state.clone();
    match tokio::task::spawn_blocking(move || records::process_batch(&task_state, batch_size)).await
    {
        Ok(result) => {
            state.metrics.requests_total.inc(&["POST", "/process", "200"]);
            Json(json!({
                "status": "success",
                "result": result,
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "manual batch failed");
            state.metrics.requests_total.inc(&["POST", "/process", "500"]);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// POST /clear — drop all retained records.
pub async fn clear(State(state): State<AppState>) -> impl IntoResponse {
    let cleared = {
        let mut store = state.store.write().unwrap_or_else(|e| e.into_inner());
        let count = store.len();
        store.clear();
        store.shrink_to_fit();
        count
    };
    state.metrics.stored_records.set(0.0);

    tracing::info!(cleared, "cleared retained records");
    state.metrics.requests_total.inc(&["POST", "/clear", "200"]);
    Json(json!({
        "status": "success",
        "cleared_records": cleared,
    }))
}

/// POST /start — activate background processing.
pub async fn start(State(state): State<AppState>) -> impl IntoResponse {
    state.active.store(true, Ordering::Relaxed);
    tracing::info!("background processing started");
    state.metrics.requests_total.inc(&["POST", "/start", "200"]);
    Json(json!({
        "status": "success",
        "message": "Background processing started",
    }))
}

/// POST /stop — deactivate background processing.
pub async fn stop(State(state): State<AppState>) -> impl IntoResponse {
    state.active.store(false, Ordering::Relaxed);
    tracing::info!("background processing stopped");
    state.metrics.requests_total.inc(&["POST", "/stop", "200"]);
    Json(json!({
        "status": "success",
        "message": "Background processing stopped",
    }))
}

/// GET /metrics — Prometheus exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", TEXT_FORMAT)],
        state.metrics.render(),
    )
}
