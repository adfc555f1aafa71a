//! Speech engine backed by an out-of-process inference sidecar.
//!
//! The sidecar owns the model weights and the accelerator. This side keeps
//! the blocking contract of [`SpeechEngine`]: every call here runs on a
//! blocking thread and uses a blocking HTTP client.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ttsgate_core::audio::{decode_wav, normalize_waveform};
use ttsgate_core::voices::resolve_speaker;
use ttsgate_core::{
    DevicePlan, EngineLoader, ModelSpec, SpeechEngine, SynthesisError, SynthesisOutput,
    SynthesisParams,
};

use crate::config::ServiceConfig;

#[derive(Debug, Serialize)]
struct LoadBody<'a> {
    model_id: &'a str,
    device: &'a str,
    dtype: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mirror: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SynthesizeBody<'a> {
    model_id: &'a str,
    text: &'a str,
    speaker: String,
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instruct: Option<&'a str>,
    speed: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    sample_rate: u32,
}

#[derive(Debug, Deserialize)]
struct VoicesBody {
    #[serde(default)]
    voices: Vec<String>,
}

/// Loads models by asking the sidecar to bring them into memory
#[derive(Debug, Clone)]
pub struct SidecarLoader {
    base_url: String,
    timeout: Duration,
    hf_home: Option<PathBuf>,
    hf_endpoint: Option<String>,
}

impl SidecarLoader {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            hf_home: None,
            hf_endpoint: None,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            hf_home: config.hf_home.clone(),
            hf_endpoint: config.hf_endpoint.clone(),
            ..Self::new(&config.engine_url, config.engine_timeout)
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl EngineLoader for SidecarLoader {
    fn load(
        &self,
        spec: &ModelSpec,
        plan: &DevicePlan,
    ) -> Result<Arc<dyn SpeechEngine>, SynthesisError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| SynthesisError::load(&spec.name, e.to_string()))?;

        let url = format!("{}/v1/load", self.base_url);
        info!(url = %url, model = %spec.name, repo = %spec.repo_id, "Requesting model load");

        let body = LoadBody {
            model_id: &spec.repo_id,
            device: plan.device.as_str(),
            dtype: plan.dtype.as_str(),
            cache_dir: self
                .hf_home
                .as_ref()
                .map(|p| p.join("hub").display().to_string()),
            mirror: self.hf_endpoint.as_deref(),
        };
        let response = client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| SynthesisError::load(&spec.name, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(SynthesisError::load(
                &spec.name,
                format!("sidecar returned {}: {}", status, detail),
            ));
        }

        Ok(Arc::new(SidecarEngine {
            client,
            base_url: self.base_url.clone(),
            model_id: spec.repo_id.clone(),
            fallback_voices: spec.default_voices.clone(),
            known_voices: OnceLock::new(),
        }))
    }
}

/// A model resident in the sidecar
pub struct SidecarEngine {
    client: Client,
    base_url: String,
    model_id: String,
    fallback_voices: Vec<String>,
    known_voices: OnceLock<Vec<String>>,
}

impl SpeechEngine for SidecarEngine {
    fn synthesize(&self, params: &SynthesisParams) -> Result<SynthesisOutput, SynthesisError> {
        let known = self.known_voices.get().map(Vec::as_slice).unwrap_or(&[]);
        let body = SynthesizeBody {
            model_id: &self.model_id,
            text: &params.text,
            speaker: resolve_speaker(params.voice.as_deref(), known, &self.fallback_voices),
            language: params.language.display_name(),
            instruct: params.tone.as_deref(),
            speed: params.speed,
            seed: params.seed,
            sample_rate: params.sample_rate,
        };
        debug!(model = %self.model_id, speaker = %body.speaker, "Sending synthesis request");

        let response = self
            .client
            .post(format!("{}/v1/synthesize", self.base_url))
            .json(&body)
            .send()
            .map_err(|e| SynthesisError::backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(SynthesisError::backend(format!(
                "sidecar returned {}: {}",
                status, detail
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| SynthesisError::backend(e.to_string()))?;
        let (samples, sample_rate) =
            decode_wav(&bytes).map_err(|e| SynthesisError::invalid_output(e.to_string()))?;
        if samples.is_empty() {
            return Err(SynthesisError::invalid_output("empty waveform"));
        }

        Ok(SynthesisOutput::new(normalize_waveform(samples), sample_rate))
    }

    fn voices(&self) -> Result<Vec<String>, SynthesisError> {
        let response = self
            .client
            .get(format!("{}/v1/voices", self.base_url))
            .query(&[("model_id", self.model_id.as_str())])
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| SynthesisError::backend(e.to_string()))?;

        let body: VoicesBody = response
            .json()
            .map_err(|e| SynthesisError::invalid_output(e.to_string()))?;
        if !body.voices.is_empty() {
            let _ = self.known_voices.set(body.voices.clone());
        }
        Ok(body.voices)
    }
}
