//! Health check and metrics endpoints.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::metrics::encode_metrics;
use crate::state::AppState;
use crate::types::HealthResponse;

/// Health check endpoint
///
/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let plan = state.manager().device_plan();
    Json(HealthResponse {
        status: "ok".to_string(),
        device: plan.device.to_string(),
        dtype: plan.dtype.to_string(),
        models_loaded: state.manager().loaded_models(),
        uptime_sec: state.uptime_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Metrics endpoint with dispatch and cache statistics
///
/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let manager = state.manager();
    let dispatch = manager.config();
    let cache = match state.cache() {
        Some(cache) => json!({ "enabled": true, "stats": cache.stats().await }),
        None => json!({ "enabled": false }),
    };

    Json(json!({
        "dispatch": {
            "config": {
                "mode": format!("{:?}", dispatch.mode).to_lowercase(),
                "max_queue_size": dispatch.max_queue_size,
                "workers_per_model": dispatch.workers_per_model,
                "preload_models": dispatch.preload_models
            },
            "models": manager.status()
        },
        "cache": cache,
        "uptime_sec": state.uptime_secs()
    }))
}

/// Prometheus metrics endpoint
///
/// GET /metrics/prometheus
pub async fn metrics_prometheus() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

/// Ready check (for Kubernetes)
///
/// Ready once preloading, when configured, has loaded every model.
///
/// GET /ready
pub async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let manager = state.manager();
    if !manager.config().preload_models
        || manager.loaded_models().len() == manager.registry().len()
    {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Live check (for Kubernetes)
///
/// GET /live
pub async fn live() -> impl IntoResponse {
    StatusCode::OK
}
