//! Fake engines and request helpers shared by the API tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tower::ServiceExt; // for oneshot
use ttsgate_core::{
    DevicePlan, EngineLoader, ModelSpec, SpeechEngine, SynthesisError, SynthesisOutput,
    SynthesisParams,
};
use ttsgate_server::{build_router, AppState, ServiceConfig};

/// Returns a short tone; counts every call
pub struct ToneEngine {
    pub calls: Arc<AtomicUsize>,
}

impl SpeechEngine for ToneEngine {
    fn synthesize(&self, params: &SynthesisParams) -> Result<SynthesisOutput, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let samples = (0..params.sample_rate / 10)
            .map(|i| (i as f32 * 0.05).sin() * 0.5)
            .collect();
        Ok(SynthesisOutput::new(samples, params.sample_rate))
    }
}

/// Blocks every call until the test releases it
pub struct GatedEngine {
    entered: UnboundedSender<()>,
    release: Mutex<std_mpsc::Receiver<()>>,
}

impl SpeechEngine for GatedEngine {
    fn synthesize(&self, params: &SynthesisParams) -> Result<SynthesisOutput, SynthesisError> {
        let _ = self.entered.send(());
        match self.release.lock().unwrap().recv() {
            Ok(()) => Ok(SynthesisOutput::new(vec![0.1; 240], params.sample_rate)),
            Err(_) => Err(SynthesisError::backend("gate dropped")),
        }
    }
}

/// Hands out a single pre-built engine for every model
pub struct FixedLoader {
    engine: Arc<dyn SpeechEngine>,
    pub loads: AtomicUsize,
}

impl FixedLoader {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            loads: AtomicUsize::new(0),
        })
    }
}

impl EngineLoader for FixedLoader {
    fn load(
        &self,
        _spec: &ModelSpec,
        _plan: &DevicePlan,
    ) -> Result<Arc<dyn SpeechEngine>, SynthesisError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.engine.clone())
    }
}

pub fn tone_app(config: ServiceConfig) -> (Router, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let loader = FixedLoader::new(Arc::new(ToneEngine {
        calls: calls.clone(),
    }));
    let state = Arc::new(AppState::new(config, loader, DevicePlan::cpu()));
    (build_router(state), calls)
}

pub fn gated_app(config: ServiceConfig) -> (Router, UnboundedReceiver<()>, std_mpsc::Sender<()>) {
    let (entered_tx, entered_rx) = unbounded_channel();
    let (release_tx, release_rx) = std_mpsc::channel();
    let engine = Arc::new(GatedEngine {
        entered: entered_tx,
        release: Mutex::new(release_rx),
    });
    let state = Arc::new(AppState::new(
        config,
        FixedLoader::new(engine),
        DevicePlan::cpu(),
    ));
    (build_router(state), entered_rx, release_tx)
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Send a request and return status, headers and raw body
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, bytes.to_vec())
}

/// Send a request and parse the body as JSON
pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}
