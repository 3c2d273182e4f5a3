//! HTTP handlers for the variable-load simulator.
//!
//! Administrative input errors return 400 with a JSON `error` body;
//! everything else is a best-effort JSON snapshot.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use loadlab_core::{TEXT_FORMAT, epoch_secs};

use crate::AppState;
use crate::pattern::LoadPattern;

fn error_response(msg: &str) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg })))
}

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
    let config = state.config.read().await.clone();

    let memory_mb = loadlab_core::rss_bytes()
        .map(|b| (b as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0)
        .unwrap_or(0.0);
    let cpu = state.cpu.lock().await.sample().unwrap_or(0.0);

    state.metrics.requests_total.inc(&["GET", "/status", "200"]);
    Json(json!({
        "application": "variable-load-simulator",
        "version": env!("CARGO_PKG_VERSION"),
        "enabled": config.enabled,
        "config": {
            "pattern_mode": config.pattern_mode.to_string(),
            "base_load": config.base_load,
            "max_load": config.max_load,
            "cycle_duration": config.cycle_duration,
        },
        "metrics": {
            "memory_usage_mb": memory_mb,
            "cpu_usage_estimate": cpu,
            "active_workers": state.metrics.active_workers.get() as u64,
            "total_workers_created": state.metrics.workers_created.get(),
            "load_level_percent": state.metrics.load_level.get() as u64,
            "work_completed": state.metrics.work_completed.get(),
        },
        "timestamp": epoch_secs(),
    }))
}

/// Partial update body for POST /config. Unspecified fields are left
/// unchanged.
#[derive(Debug, serde::Deserialize)]
pub struct ConfigUpdate {
    pub pattern_mode: Option<LoadPattern>,
    pub base_load: Option<u32>,
    pub max_load: Option<u32>,
    pub cycle_duration: Option<u64>,
    /// Sets `manual_workers`, picked up by the manual pattern.
    pub workers: Option<u32>,
}

/// POST /config
pub async fn update_config(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    let update: ConfigUpdate = match serde_json::from_value(body) {
        Ok(update) => update,
        Err(e) => {
            state.metrics.requests_total.inc(&["POST", "/config", "400"]);
            return error_response(&e.to_string()).into_response();
        }
    };

    let mut config = state.config.write().await;
    if let Some(pattern) = update.pattern_mode {
        config.pattern_mode = pattern;
        tracing::info!(pattern = %pattern, "pattern mode changed");
    }
    if let Some(base) = update.base_load {
        config.base_load = base;
        tracing::info!(base_load = base, "base load changed");
    }
    if let Some(max) = update.max_load {
        config.max_load = max;
        tracing::info!(max_load = max, "max load changed");
    }
    if let Some(cycle) = update.cycle_duration {
        config.cycle_duration = cycle;
        tracing::info!(cycle_duration = cycle, "cycle duration changed");
    }
    if let Some(workers) = update.workers {
        config.manual_workers = workers;
        tracing::info!(workers, "manual workers set");
    }

    state.metrics.requests_total.inc(&["POST", "/config", "200"]);
    Json(json!({
        "status": "success",
        "config": &*config,
    }))
    .into_response()
}

/// POST /pattern/{name}
pub async fn set_pattern(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match name.parse::<LoadPattern>() {
        Ok(pattern) => {
            state.config.write().await.pattern_mode = pattern;
            tracing::info!(pattern = %pattern, "pattern changed");
            state.metrics.requests_total.inc(&["POST", "/pattern", "200"]);
            Json(json!({
                "status": "success",
                "pattern": pattern.to_string(),
            }))
            .into_response()
        }
        Err(e) => {
            state.metrics.requests_total.inc(&["POST", "/pattern", "400"]);
            error_response(&e.to_string()).into_response()
        }
    }
}

/// GET /metrics — Prometheus exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", TEXT_FORMAT)],
        state.metrics.render(),
    )
}
