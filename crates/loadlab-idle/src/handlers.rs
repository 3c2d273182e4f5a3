//! HTTP handlers for the idle webhook listener.

use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use loadlab_core::{TEXT_FORMAT, epoch_secs};

use crate::{AppState, IDLE_CPU_CORES, IDLE_MEMORY_BYTES};

/// Middleware tracking in-flight requests.
pub async fn track_connections(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    state.metrics.active_connections.add(1.0);
    let response = next.run(req).await;
    state.metrics.active_connections.add(-1.0);
    response
}

/// GET /
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.requests_total.inc(&["/", "GET", "200"]);
    Json(json!({
        "name": "Idle Webhook Listener",
        "description": "Demonstrates over-provisioned workload for auto-rightsizing",
        "endpoints": {
            "/health": "Health check",
            "/ready": "Readiness check",
            "/metrics": "Prometheus metrics",
            "/status": "Detailed status",
            "/webhook": "POST - Webhook receiver",
        },
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.requests_total.inc(&["/health", "GET", "200"]);
    Json(json!({
        "status": "healthy",
        "timestamp": epoch_secs(),
        "simulate_load": state.config.simulate_load,
    }))
}

/// GET /ready — always ready; there is nothing to wait for.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.requests_total.inc(&["/ready", "GET", "200"]);
    Json(json!({
        "ready": true,
        "timestamp": epoch_secs(),
    }))
}

/// GET /status
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.requests_total.inc(&["/status", "GET", "200"]);
    Json(json!({
        "application": "idle-webhook-listener",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": epoch_secs(),
        "config": {
            "simulate_load": state.config.simulate_load,
        },
        "metrics": {
            "cpu_usage_estimate_cores": IDLE_CPU_CORES,
            "memory_usage_mb": IDLE_MEMORY_BYTES / 1024.0 / 1024.0,
        },
    }))
}

/// POST /webhook — accepts arbitrary JSON and echoes the event type.
pub async fn webhook(
    State(state): State<AppState>,
    body: Option<Json<serde_json::Value>>,
) -> impl IntoResponse {
    let started = Instant::now();

    let data = body.map(|Json(v)| v).unwrap_or_else(|| json!({}));
    let event_type = data
        .get("event_type")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    state.metrics.webhooks_received.inc(&[&event_type]);
    tracing::info!(
        event_type = %event_type,
        data_size = data.to_string().len(),
        "webhook received"
    );

    if state.config.simulate_load {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    state.metrics.requests_total.inc(&["/webhook", "POST", "200"]);
    let duration = started.elapsed();
    state.metrics.request_duration.observe(duration.as_secs_f64());

    Json(json!({
        "status": "received",
        "event_type": event_type,
        "timestamp": epoch_secs(),
        "processing_time_ms": (duration.as_secs_f64() * 100_000.0).round() / 100.0,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn test_state() -> AppState {
        AppState::new(Config {
            simulate_load: false,
        })
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let resp = health(State(test_state())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_is_always_ready() {
        let resp = ready(State(test_state())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn webhook_counts_event_types() {
        let state = test_state();
        let body = Json(json!({ "event_type": "deploy" }));
        let resp = webhook(State(state.clone()), Some(body)).await.into_response();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.metrics.webhooks_received.get(&["deploy"]), 1);
        assert_eq!(state.metrics.request_duration.count(), 1);
    }

    #[tokio::test]
    async fn webhook_without_event_type_is_unknown() {
        let state = test_state();
        let resp = webhook(State(state.clone()), Some(Json(json!({ "x": 1 }))))
            .await
            .into_response();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.metrics.webhooks_received.get(&["unknown"]), 1);
    }

    #[tokio::test]
    async fn webhook_without_body_is_unknown() {
        let state = test_state();
        let resp = webhook(State(state.clone()), None).await.into_response();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.metrics.webhooks_received.get(&["unknown"]), 1);
    }

    #[tokio::test]
    async fn idle_gauges_are_preset() {
        let state = test_state();
        assert_eq!(state.metrics.cpu_usage_estimate.get(), 0.01);
        assert_eq!(state.metrics.memory_usage_bytes.get(), 30.0 * 1024.0 * 1024.0);
    }

    #[tokio::test]
    async fn metrics_exposition() {
        let state = test_state();
        let resp = metrics(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.contains("text/plain"));
    }
}
