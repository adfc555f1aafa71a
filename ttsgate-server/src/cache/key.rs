//! Cache keys and cached payloads.

use std::sync::Arc;

use ttsgate_core::{AudioFormat, Language, SynthesisParams};
use xxhash_rust::xxh3::xxh3_64;

/// Every request field that changes the produced audio, in a fixed order.
///
/// Request ids are deliberately absent: two requests that differ only in id
/// share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub model: String,
    pub text: String,
    pub voice: Option<String>,
    pub language: Language,
    pub tone: Option<String>,
    /// `f32::to_bits` of the speed, so the key stays `Eq + Hash`
    pub speed_bits: u32,
    pub seed: Option<u32>,
    pub sample_rate: u32,
    pub format: AudioFormat,
}

impl CacheKey {
    pub fn new(model: &str, params: &SynthesisParams, format: AudioFormat) -> Self {
        Self {
            model: model.to_string(),
            text: params.text.clone(),
            voice: params.voice.clone(),
            language: params.language,
            tone: params.tone.clone(),
            speed_bits: params.speed.to_bits(),
            seed: params.seed,
            sample_rate: params.sample_rate,
            format,
        }
    }

    pub fn speed(&self) -> f32 {
        f32::from_bits(self.speed_bits)
    }

    /// Short stable digest, for logs
    pub fn fingerprint(&self) -> u64 {
        let canonical = format!(
            "{}\0{}\0{:?}\0{}\0{:?}\0{}\0{:?}\0{}\0{}",
            self.model,
            self.text,
            self.voice,
            self.language,
            self.tone,
            self.speed_bits,
            self.seed,
            self.sample_rate,
            self.format
        );
        xxh3_64(canonical.as_bytes())
    }
}

/// Encoded audio as stored in the cache and returned to callers
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAudio {
    /// Container bytes; shared so cache hits do not copy the payload
    pub audio: Arc<Vec<u8>>,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub duration_sec: f64,
}

impl CachedAudio {
    pub fn new(audio: Vec<u8>, format: AudioFormat, sample_rate: u32, duration_sec: f64) -> Self {
        Self {
            audio: Arc::new(audio),
            format,
            sample_rate,
            duration_sec,
        }
    }
}
