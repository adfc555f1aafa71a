//! Fixed registry of servable models.

use serde::Serialize;

use crate::voices::SUPPORTED_SPEAKERS;

/// Static description of one servable model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSpec {
    /// Short identifier clients use (e.g. `qwen3-tts-0.6b`)
    pub name: String,
    /// Upstream checkpoint the loader resolves
    pub repo_id: String,
    /// Voices to advertise when the model reports none
    pub default_voices: Vec<String>,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>, repo_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo_id: repo_id.into(),
            default_voices: SUPPORTED_SPEAKERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Directory name the Hugging Face hub cache uses for this checkpoint
    pub fn hub_cache_slug(&self) -> String {
        format!("models--{}", self.repo_id.replace('/', "--"))
    }
}

/// The set of identifiers the service accepts, resolved at startup
#[derive(Debug, Clone, Serialize)]
pub struct ModelRegistry {
    models: Vec<ModelSpec>,
    default_model: String,
}

impl ModelRegistry {
    pub const SMALL: &'static str = "qwen3-tts-0.6b";
    pub const LARGE: &'static str = "qwen3-tts-1.7b";

    /// Build a registry; the first spec is the default model
    pub fn new(models: Vec<ModelSpec>) -> Self {
        let default_model = models.first().map(|m| m.name.clone()).unwrap_or_default();
        Self {
            models,
            default_model,
        }
    }

    /// The Qwen3-TTS custom-voice checkpoints
    pub fn qwen3() -> Self {
        Self::new(vec![
            ModelSpec::new(Self::SMALL, "Qwen/Qwen3-TTS-12Hz-0.6B-CustomVoice"),
            ModelSpec::new(Self::LARGE, "Qwen/Qwen3-TTS-12Hz-1.7B-CustomVoice"),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.iter()
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::qwen3()
    }
}
