//! HTTP handlers for the prime calculator.

use std::sync::atomic::Ordering;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use loadlab_core::{TEXT_FORMAT, epoch_secs};

use crate::{AppState, primes};

/// GET /
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.requests_total.inc(&["/", "GET"]);
    Json(json!({
        "name": "CPU-Intensive Prime Calculator",
        "description": "Demonstrates CPU-bound workload for auto-rightsizing",
        "endpoints": {
            "/health": "Health check",
            "/ready": "Readiness check",
            "/metrics": "Prometheus metrics",
            "/status": "Detailed status",
            "/calculate": "Calculate primes in range",
        },
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.requests_total.inc(&["/health", "GET"]);
    Json(json!({
        "status": "healthy",
        "timestamp": epoch_secs(),
        "intensity": state.config.intensity.to_string(),
        "workers": state.config.workers,
        "enabled": state.config.enabled,
    }))
}

/// GET /ready — 503 until every configured worker has been spawned.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.requests_total.inc(&["/ready", "GET"]);

    let spawned = state.spawned.load(Ordering::Relaxed);
    let expected = state.config.workers as u64;
    let is_ready = !state.config.enabled || spawned == expected;
    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "ready": is_ready,
            "active_workers": spawned,
            "expected_workers": expected,
        })),
    )
}

/// GET /status
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.requests_total.inc(&["/status", "GET"]);
    Json(json!({
        "application": "cpu-intensive-prime-calculator",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": epoch_secs(),
        "config": {
            "intensity": state.config.intensity.to_string(),
            "workers": state.config.workers,
            "enabled": state.config.enabled,
        },
        "metrics": {
            "active_workers": state.spawned.load(Ordering::Relaxed),
            "cpu_intensity_level": state.config.intensity.level(),
            "primes_calculated": state.metrics.primes_calculated.get(),
        },
    }))
}

/// GET /calculate — on-demand prime search up to 10000.
pub async fn calculate(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.requests_total.inc(&["/calculate", "GET"]);

    let t0 = Instant::now();
    let result = tokio::task::spawn_blocking(|| primes::primes_in_range(2, 10_000)).await;
    let duration = t0.elapsed();

    match result {
        Ok(primes) => {
            state
                .metrics
                .calculation_duration
                .observe(duration.as_secs_f64());
            state.metrics.primes_calculated.add(primes.len() as u64);

            let sample: Vec<u64> = primes.iter().take(10).copied().collect();
            Json(json!({
                "count": primes.len(),
                "duration_seconds": (duration.as_secs_f64() * 1000.0).round() / 1000.0,
                "sample": sample,
            }))
            .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, Intensity};

    fn test_state() -> AppState {
        AppState::new(Config {
            intensity: Intensity::Medium,
            workers: 4,
            enabled: true,
        })
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let resp = health(State(test_state())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_is_unavailable_before_workers_spawn() {
        let state = test_state();
        let resp = ready(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ready_after_workers_spawn() {
        let state = test_state();
        state.spawned.store(4, Ordering::Relaxed);
        let resp = ready(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_when_disabled() {
        let state = AppState::new(Config {
            intensity: Intensity::Medium,
            workers: 4,
            enabled: false,
        });
        let resp = ready(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn calculate_counts_primes() {
        let state = test_state();
        let resp = calculate(State(state.clone())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        // 1229 primes below 10000.
        assert_eq!(state.metrics.primes_calculated.get(), 1229);
        assert_eq!(state.metrics.calculation_duration.count(), 1);
    }

    #[tokio::test]
    async fn metrics_exposition() {
        let state = test_state();
        state.metrics.primes_calculated.add(5);
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
