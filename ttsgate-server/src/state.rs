//! Application state for the ttsgate server.

use std::sync::Arc;
use std::time::Instant;

use ttsgate_core::{DevicePlan, EngineLoader, ModelRegistry};

use crate::admission::Admission;
use crate::cache::AudioCache;
use crate::config::{OutputMode, ServiceConfig};
use crate::dispatcher::ModelManager;
use crate::storage::AudioStorage;

/// Application state shared across all handlers
pub struct AppState {
    /// Configuration
    pub config: ServiceConfig,

    /// Cache + dispatch front door
    pub admission: Admission,

    /// Present in file output mode only
    pub storage: Option<AudioStorage>,

    pub started_at: Instant,
}

impl AppState {
    /// Build state for the default model registry
    pub fn new(config: ServiceConfig, loader: Arc<dyn EngineLoader>, plan: DevicePlan) -> Self {
        Self::with_registry(config, ModelRegistry::default(), loader, plan)
    }

    pub fn with_registry(
        config: ServiceConfig,
        registry: ModelRegistry,
        loader: Arc<dyn EngineLoader>,
        plan: DevicePlan,
    ) -> Self {
        let manager = Arc::new(ModelManager::new(
            registry,
            loader,
            plan,
            config.dispatch.clone(),
        ));
        let cache = AudioCache::from_config(&config.cache).map(Arc::new);
        let storage = match config.output_mode {
            OutputMode::File => Some(AudioStorage::new(&config.output_dir)),
            OutputMode::Base64 => None,
        };

        Self {
            admission: Admission::new(manager, cache),
            storage,
            started_at: Instant::now(),
            config,
        }
    }

    pub fn manager(&self) -> &Arc<ModelManager> {
        self.admission.manager()
    }

    pub fn cache(&self) -> Option<&Arc<AudioCache>> {
        self.admission.cache()
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
