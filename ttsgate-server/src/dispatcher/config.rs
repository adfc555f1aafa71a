//! Configuration for model dispatch.

use ttsgate_core::{DTypePreference, DevicePreference};
use tracing::warn;

use crate::config::parse_bool;

/// How admitted work reaches a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Per-model bounded queue drained by a fixed set of workers
    Bounded,
    /// Call the engine straight away on a blocking thread, no queue
    Direct,
}

/// Configuration for the dispatcher
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub mode: DispatchMode,

    /// Outstanding tasks (waiting or running) allowed per model
    pub max_queue_size: usize,

    /// Worker loops per model. Values above 1 require a reentrant engine.
    pub workers_per_model: usize,

    /// Load every registry model at startup
    pub preload_models: bool,

    pub device: DevicePreference,
    pub dtype: DTypePreference,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Bounded,
            max_queue_size: 32,
            workers_per_model: 1,
            preload_models: false,
            device: DevicePreference::Auto,
            dtype: DTypePreference::Auto,
        }
    }
}

impl DispatchConfig {
    /// Bounded mode with explicit limits (both clamped to at least 1)
    pub fn bounded(max_queue_size: usize, workers_per_model: usize) -> Self {
        Self {
            mode: DispatchMode::Bounded,
            max_queue_size: max_queue_size.max(1),
            workers_per_model: workers_per_model.max(1),
            ..Default::default()
        }
    }

    /// Unbounded pass-through mode
    pub fn direct() -> Self {
        Self {
            mode: DispatchMode::Direct,
            ..Default::default()
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("TTS_SCALABLE_MODE") {
            config.mode = if parse_bool(&val) {
                DispatchMode::Bounded
            } else {
                DispatchMode::Direct
            };
        }

        if let Some(val) = lookup("TTS_MAX_QUEUE_SIZE") {
            if let Ok(n) = val.trim().parse::<usize>() {
                config.max_queue_size = n.max(1);
            }
        }

        if let Some(val) = lookup("TTS_MAX_CONCURRENCY_PER_MODEL") {
            if let Ok(n) = val.trim().parse::<usize>() {
                config.workers_per_model = n.max(1);
            }
        }

        if let Some(val) = lookup("TTS_PRELOAD_MODELS") {
            config.preload_models = parse_bool(&val);
        }

        if let Some(val) = lookup("TTS_DEVICE") {
            match val.parse() {
                Ok(pref) => config.device = pref,
                Err(e) => warn!("Ignoring TTS_DEVICE: {}", e),
            }
        }

        if let Some(val) = lookup("TTS_DTYPE") {
            match val.parse() {
                Ok(pref) => config.dtype = pref,
                Err(e) => warn!("Ignoring TTS_DTYPE: {}", e),
            }
        }

        config
    }
}
