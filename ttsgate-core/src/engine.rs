//! Contracts for the inference capability.
//!
//! A [`SpeechEngine`] is a loaded model: expensive to build, blocking to
//! invoke. An [`EngineLoader`] builds one per model identifier. Both are
//! synchronous on purpose; callers run them on a blocking thread.

use std::sync::Arc;

use serde::Serialize;

use crate::device::DevicePlan;
use crate::error::SynthesisError;
use crate::models::ModelSpec;
use crate::types::Language;

/// Structured parameters for one synthesis call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisParams {
    pub text: String,
    pub voice: Option<String>,
    pub language: Language,
    pub tone: Option<String>,
    pub speed: f32,
    pub seed: Option<u32>,
    pub sample_rate: u32,
}

impl SynthesisParams {
    /// Parameters with service defaults for everything but the text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            language: Language::Auto,
            tone: None,
            speed: 1.0,
            seed: None,
            sample_rate: 24_000,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Raw waveform produced by an engine
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOutput {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SynthesisOutput {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Length in seconds
    pub fn duration_secs(&self) -> f64 {
        crate::audio::waveform_duration(self.samples.len(), self.sample_rate)
    }
}

/// A loaded speech model
pub trait SpeechEngine: Send + Sync {
    /// Run one synthesis. Blocks the calling thread until the waveform is ready.
    fn synthesize(&self, params: &SynthesisParams) -> Result<SynthesisOutput, SynthesisError>;

    /// Speakers the model reports about itself. Empty when it reports nothing.
    fn voices(&self) -> Result<Vec<String>, SynthesisError> {
        Ok(Vec::new())
    }
}

/// Builds engines. Called at most once per model identifier per process.
pub trait EngineLoader: Send + Sync {
    fn load(&self, spec: &ModelSpec, plan: &DevicePlan)
        -> Result<Arc<dyn SpeechEngine>, SynthesisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silence;

    impl SpeechEngine for Silence {
        fn synthesize(&self, params: &SynthesisParams) -> Result<SynthesisOutput, SynthesisError> {
            Ok(SynthesisOutput::new(vec![0.0; params.sample_rate as usize], params.sample_rate))
        }
    }

    #[test]
    fn test_params_builder() {
        let params = SynthesisParams::new("hello")
            .with_voice("ryan")
            .with_language(Language::En)
            .with_seed(7);
        assert_eq!(params.voice.as_deref(), Some("ryan"));
        assert_eq!(params.language, Language::En);
        assert_eq!(params.seed, Some(7));
        assert_eq!(params.sample_rate, 24_000);
    }

    #[test]
    fn test_default_voices_is_empty() {
        let engine = Silence;
        assert!(engine.voices().unwrap().is_empty());
        let out = engine.synthesize(&SynthesisParams::new("x")).unwrap();
        assert!((out.duration_secs() - 1.0).abs() < f64::EPSILON);
    }
}
