//! Lazily-built model entries and the dispatch entry point.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};
use ttsgate_core::voices::{augment_with_aliases, canonicalize_voice_list};
use ttsgate_core::{
    DevicePlan, EngineLoader, ModelRegistry, ModelSpec, SpeechEngine, SynthesisError,
    SynthesisOutput, SynthesisParams,
};

use super::config::{DispatchConfig, DispatchMode};
use super::error::DispatchError;
use super::metrics::{DispatchMetrics, DispatchSnapshot};
use super::worker::{run_blocking, ModelWorker};
use crate::metrics::prometheus as prom;

/// A loaded model: its engine, its queue (bounded mode) and cached voices
pub struct ModelEntry {
    spec: ModelSpec,
    engine: Arc<dyn SpeechEngine>,
    worker: Option<ModelWorker>,
    voices: Mutex<Option<Vec<String>>>,
    loaded_at: Instant,
}

impl ModelEntry {
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn engine(&self) -> &Arc<dyn SpeechEngine> {
        &self.engine
    }

    pub fn worker(&self) -> Option<&ModelWorker> {
        self.worker.as_ref()
    }

    pub fn loaded_secs(&self) -> f64 {
        self.loaded_at.elapsed().as_secs_f64()
    }

    /// Canonical voice names, probed from the engine once and then cached
    async fn voices(&self, refresh: bool) -> Vec<String> {
        let mut cached = self.voices.lock().await;
        if !refresh {
            if let Some(voices) = cached.as_ref() {
                return voices.clone();
            }
        }

        let engine = self.engine.clone();
        let reported = match tokio::task::spawn_blocking(move || engine.voices()).await {
            Ok(Ok(voices)) => canonicalize_voice_list(&voices),
            Ok(Err(e)) => {
                warn!(model = %self.spec.name, error = %e, "Voice probe failed");
                Vec::new()
            }
            Err(e) => {
                warn!(model = %self.spec.name, error = %e, "Voice probe panicked");
                Vec::new()
            }
        };

        let base = if reported.is_empty() {
            canonicalize_voice_list(&self.spec.default_voices)
        } else {
            reported
        };
        let voices = augment_with_aliases(base);
        *cached = Some(voices.clone());
        voices
    }
}

impl fmt::Debug for ModelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelEntry")
            .field("model", &self.spec.name)
            .field("repo_id", &self.spec.repo_id)
            .field("bounded", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}

/// Per-model status for the JSON metrics endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub model: String,
    pub loaded: bool,
    pub workers_started: bool,
    pub outstanding: usize,
    pub capacity: Option<usize>,
    pub dispatch: DispatchSnapshot,
}

/// Owns the model registry and every model entry built from it.
///
/// Entries are created on first use, at most once per identifier. The fast
/// path is a lock-free read of an initialized slot; construction runs under
/// one process-wide lock and re-checks the slot before loading.
pub struct ModelManager {
    registry: ModelRegistry,
    loader: Arc<dyn EngineLoader>,
    plan: DevicePlan,
    config: DispatchConfig,
    entries: HashMap<String, OnceCell<Arc<ModelEntry>>>,
    metrics: HashMap<String, Arc<DispatchMetrics>>,
    load_lock: Mutex<()>,
}

impl ModelManager {
    pub fn new(
        registry: ModelRegistry,
        loader: Arc<dyn EngineLoader>,
        plan: DevicePlan,
        config: DispatchConfig,
    ) -> Self {
        let entries = registry
            .names()
            .map(|name| (name.to_string(), OnceCell::new()))
            .collect();
        let metrics = registry
            .names()
            .map(|name| (name.to_string(), Arc::new(DispatchMetrics::new())))
            .collect();

        Self {
            registry,
            loader,
            plan,
            config,
            entries,
            metrics,
            load_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn device_plan(&self) -> &DevicePlan {
        &self.plan
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Return the entry for `model`, building it on first use
    pub async fn resolve_or_create(&self, model: &str) -> Result<Arc<ModelEntry>, DispatchError> {
        let slot = self
            .entries
            .get(model)
            .ok_or_else(|| DispatchError::UnknownModel(model.to_string()))?;

        if let Some(entry) = slot.get() {
            return Ok(entry.clone());
        }

        let _guard = self.load_lock.lock().await;
        if let Some(entry) = slot.get() {
            return Ok(entry.clone());
        }

        let spec = self
            .registry
            .get(model)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownModel(model.to_string()))?;
        let entry = Arc::new(self.build_entry(spec).await?);

        // Only ever set while holding load_lock, after the re-check above.
        let _ = slot.set(entry.clone());
        Ok(entry)
    }

    async fn build_entry(&self, spec: ModelSpec) -> Result<ModelEntry, DispatchError> {
        info!(
            model = %spec.name,
            repo = %spec.repo_id,
            device = %self.plan.device,
            dtype = %self.plan.dtype,
            "Loading model"
        );

        let started = Instant::now();
        let loader = self.loader.clone();
        let plan = self.plan.clone();
        let load_spec = spec.clone();
        let loaded = match tokio::task::spawn_blocking(move || loader.load(&load_spec, &plan)).await
        {
            Ok(result) => result,
            Err(e) => Err(SynthesisError::Panicked(e.to_string())),
        };
        let elapsed = started.elapsed().as_secs_f64();

        let engine = match loaded {
            Ok(engine) => engine,
            Err(e) => {
                prom::record_model_load(&spec.name, false, elapsed);
                warn!(model = %spec.name, error = %e, "Model load failed");
                return Err(e.into());
            }
        };
        prom::record_model_load(&spec.name, true, elapsed);
        info!(model = %spec.name, load_secs = elapsed, "Model loaded");

        let worker = match self.config.mode {
            DispatchMode::Bounded => Some(ModelWorker::new(
                spec.name.clone(),
                engine.clone(),
                self.config.max_queue_size,
                self.config.workers_per_model,
                self.metrics_for(&spec.name),
            )),
            DispatchMode::Direct => None,
        };

        Ok(ModelEntry {
            spec,
            engine,
            worker,
            voices: Mutex::new(None),
            loaded_at: Instant::now(),
        })
    }

    /// Run one synthesis on `model`, through its queue in bounded mode
    pub async fn dispatch(
        &self,
        model: &str,
        params: SynthesisParams,
    ) -> Result<SynthesisOutput, DispatchError> {
        let entry = self.resolve_or_create(model).await?;

        match entry.worker() {
            Some(worker) => {
                worker.ensure_started();
                worker.submit(params).await
            }
            None => {
                let metrics = self.metrics_for(model);
                metrics.record_direct();
                let started = Instant::now();
                let result = run_blocking(entry.engine.clone(), params).await;
                metrics.record_finished(started.elapsed(), result.is_ok());
                result.map_err(DispatchError::from)
            }
        }
    }

    /// Load the given models now. Stops at the first failure.
    pub async fn preload<I, S>(&self, models: I) -> Result<(), DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for model in models {
            self.resolve_or_create(model.as_ref()).await?;
        }
        self.start_workers();
        Ok(())
    }

    /// Load every registry model, returning the ones that failed
    pub async fn preload_all(&self) -> Vec<(String, DispatchError)> {
        let mut failures = Vec::new();
        for name in self.registry.names() {
            if let Err(e) = self.resolve_or_create(name).await {
                failures.push((name.to_string(), e));
            }
        }
        self.start_workers();
        failures
    }

    /// Start worker loops for every loaded model
    pub fn start_workers(&self) {
        for slot in self.entries.values() {
            if let Some(worker) = slot.get().and_then(|entry| entry.worker()) {
                worker.ensure_started();
            }
        }
    }

    pub fn is_loaded(&self, model: &str) -> bool {
        self.entries
            .get(model)
            .is_some_and(|slot| slot.initialized())
    }

    /// Loaded models, in registry order
    pub fn loaded_models(&self) -> Vec<String> {
        self.registry
            .names()
            .filter(|name| self.is_loaded(name))
            .map(str::to_string)
            .collect()
    }

    /// Voices for `model`, loading it if needed.
    ///
    /// Falls back to the registry defaults when the model cannot be loaded;
    /// unknown identifiers yield an empty list.
    pub async fn available_voices(&self, model: &str, refresh: bool) -> Vec<String> {
        let Some(spec) = self.registry.get(model) else {
            warn!(model, "Voice listing requested for unknown model");
            return Vec::new();
        };

        match self.resolve_or_create(model).await {
            Ok(entry) => entry.voices(refresh).await,
            Err(e) => {
                warn!(model, error = %e, "Falling back to default voices");
                augment_with_aliases(canonicalize_voice_list(&spec.default_voices))
            }
        }
    }

    pub fn metrics_for(&self, model: &str) -> Arc<DispatchMetrics> {
        self.metrics
            .get(model)
            .cloned()
            .unwrap_or_else(|| Arc::new(DispatchMetrics::new()))
    }

    /// Status of every registry model, in registry order
    pub fn status(&self) -> Vec<ModelStatus> {
        self.registry
            .names()
            .map(|name| {
                let worker = self
                    .entries
                    .get(name)
                    .and_then(|slot| slot.get())
                    .and_then(|entry| entry.worker());
                ModelStatus {
                    model: name.to_string(),
                    loaded: self.is_loaded(name),
                    workers_started: worker.is_some_and(|w| w.is_started()),
                    outstanding: worker.map_or(0, |w| w.outstanding()),
                    capacity: worker.map(|w| w.capacity()),
                    dispatch: self.metrics_for(name).snapshot(),
                }
            })
            .collect()
    }
}
