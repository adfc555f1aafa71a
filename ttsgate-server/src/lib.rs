//! ttsgate Server Library
//!
//! HTTP front for a slow, single-instance speech-synthesis backend.
//!
//! Every request passes through [`admission::Admission`]: an optional LRU
//! result cache, then the [`dispatcher::ModelManager`], which builds each
//! model once on first use and feeds it through a bounded per-model queue.
//! Overload turns into an immediate `429` instead of unbounded waiting.
//!
//! The library is used by the `ttsgate-server` binary and by the `ttsgate`
//! operator CLI.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use ttsgate_core::{DevicePlan, EngineLoader};

pub mod admission;
pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod remote;
pub mod routes;
pub mod state;
pub mod storage;
pub mod types;

pub use config::{OutputMode, ServiceConfig};
pub use remote::SidecarLoader;
pub use state::AppState;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `log_level` applies to this
/// workspace's crates and `tower_http`. Safe to call more than once.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ttsgate={l},ttsgate_server={l},ttsgate_core={l},tower_http={l}",
            l = log_level
        ))
    });

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();
}

/// Initialize Prometheus metrics registry.
/// Should be called once before starting the server.
pub fn init_metrics() {
    if let Err(e) = metrics::register_metrics() {
        warn!("Failed to register Prometheus metrics: {}", e);
    }
}

/// Build the application router over shared state
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(routes::health))
        .route("/ready", get(routes::ready))
        .route("/live", get(routes::live))
        .route("/metrics", get(routes::metrics))
        .route("/metrics/prometheus", get(routes::metrics_prometheus))
        // Synthesis endpoints
        .route("/v1/tts", post(routes::synthesize))
        .route("/v1/voices", get(routes::list_voices))
        .route("/v1/audio/:file_name", get(routes::get_audio))
        // Middleware
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the ttsgate server.
///
/// Resolves the device plan, preloads models when configured (failures are
/// logged, the server still starts), then serves until shut down.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use ttsgate_server::{run_server, ServiceConfig, SidecarLoader};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServiceConfig::from_env();
///     let loader = Arc::new(SidecarLoader::from_config(&config));
///     run_server(config, loader).await
/// }
/// ```
pub async fn run_server(config: ServiceConfig, loader: Arc<dyn EngineLoader>) -> anyhow::Result<()> {
    init_metrics();

    info!(
        addr = %config.bind_addr(),
        engine_url = %config.engine_url,
        "Starting ttsgate server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let (device, dtype) = (config.dispatch.device, config.dispatch.dtype);
    let plan = tokio::task::spawn_blocking(move || DevicePlan::resolve(device, dtype)).await?;

    let state = Arc::new(AppState::new(config.clone(), loader, plan));

    if let Some(storage) = &state.storage {
        tokio::fs::create_dir_all(storage.root()).await?;
        info!(dir = %storage.root().display(), "File output enabled");
    }

    if config.dispatch.preload_models {
        for (model, e) in state.manager().preload_all().await {
            warn!(model = %model, error = %e, "Preload failed; model will load on first request");
        }
    }

    let app = build_router(state.clone());
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("ttsgate listening on http://{}", addr);
    info!("Synthesis: http://{}/v1/tts", addr);
    info!("Health:    http://{}/health", addr);

    print_banner(&config, &state);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Print the startup banner
fn print_banner(config: &ServiceConfig, state: &Arc<AppState>) {
    let plan = state.manager().device_plan();
    let dispatch = &config.dispatch;

    println!();
    println!("==================================================");
    println!("  ttsgate v{}", env!("CARGO_PKG_VERSION"));
    println!("==================================================");
    println!("  Listening on: http://{}", config.bind_addr());
    println!("  Engine sidecar: {}", config.engine_url);
    println!("  Device: {} ({}, {})", plan.device, plan.dtype, plan.reason);
    println!();
    println!("  Dispatch configuration:");
    println!("    Mode: {:?}", dispatch.mode);
    println!(
        "    Queue per model: {} (workers: {})",
        dispatch.max_queue_size, dispatch.workers_per_model
    );
    println!(
        "    Result cache: {}",
        if config.cache.enabled {
            format!("{} entries", config.cache.max_entries)
        } else {
            "disabled".to_string()
        }
    );
    println!("    Output: {:?}", config.output_mode);
    println!();
    println!("  Endpoints:");
    println!("    POST /v1/tts");
    println!("    GET  /v1/voices, /v1/audio/:file_name");
    println!("    GET  /health, /ready, /live, /metrics, /metrics/prometheus");
    println!("==================================================");
    println!();
}
