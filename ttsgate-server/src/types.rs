//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};
use ttsgate_core::{audio, voices::canonical_voice_name, AudioFormat, Language, SynthesisParams};
use uuid::Uuid;

use crate::admission::AdmissionRequest;
use crate::config::ServiceConfig;
use crate::error::ApiError;

/// Slowest and fastest accepted speaking rate; the lower bound is exclusive
pub const MIN_SPEED: f32 = 0.1;
pub const MAX_SPEED: f32 = 4.0;

/// Body of `POST /v1/tts`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub language: Language,
    /// Free-form delivery instruction ("calm", "excited", ...)
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub format: AudioFormat,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

impl TtsRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Check field constraints and build the admission request
    pub fn into_admission(self, config: &ServiceConfig, default_model: &str) -> Result<AdmissionRequest, ApiError> {
        if self.stream {
            return Err(ApiError::BadRequest("streaming not implemented yet".to_string()));
        }

        audio::ensure_encodable(self.format)?;

        let text = self.text.trim();
        if text.is_empty() {
            return Err(ApiError::Validation("text must not be empty".to_string()));
        }
        let chars = text.chars().count();
        if chars > config.max_text_length {
            return Err(ApiError::Validation(format!(
                "text is {} characters, limit is {}",
                chars, config.max_text_length
            )));
        }

        let speed = self.speed.unwrap_or(1.0);
        if !speed.is_finite() || speed <= MIN_SPEED || speed > MAX_SPEED {
            return Err(ApiError::Validation(format!(
                "speed must be in ({}, {}], got {}",
                MIN_SPEED, MAX_SPEED, speed
            )));
        }

        let sample_rate = self.sample_rate.unwrap_or(config.default_sample_rate);
        if sample_rate == 0 {
            return Err(ApiError::Validation("sample_rate must be positive".to_string()));
        }

        let seed = match self.seed {
            None => None,
            Some(seed) => Some(u32::try_from(seed).map_err(|_| {
                ApiError::Validation(format!("seed must be in [0, {}], got {}", u32::MAX, seed))
            })?),
        };

        let request_id = self
            .request_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let model = self
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_model.to_string());

        let params = SynthesisParams {
            text: text.to_string(),
            voice: canonical_voice_name(self.voice.as_deref()),
            language: self.language,
            tone: self.tone.filter(|t| !t.trim().is_empty()),
            speed,
            seed,
            sample_rate,
        };

        Ok(AdmissionRequest {
            request_id,
            model,
            params,
            format: self.format,
        })
    }
}

/// Body returned by `POST /v1/tts`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsResponse {
    pub request_id: String,
    pub audio_format: AudioFormat,
    pub sample_rate: u32,
    pub duration_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// Query of `GET /v1/voices`
#[derive(Debug, Clone, Deserialize)]
pub struct VoicesQuery {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicesResponse {
    pub model: String,
    pub voices: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub device: String,
    pub dtype: String,
    pub models_loaded: Vec<String>,
    pub uptime_sec: f64,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServiceConfig {
        ServiceConfig::default()
    }

    #[test]
    fn test_defaults_applied() {
        let req: TtsRequest = serde_json::from_str(r#"{"text": "  hello  "}"#).unwrap();
        let admitted = req.into_admission(&config(), "qwen3-tts-0.6b").unwrap();

        assert_eq!(admitted.model, "qwen3-tts-0.6b");
        assert_eq!(admitted.params.text, "hello");
        assert_eq!(admitted.params.sample_rate, 24_000);
        assert_eq!(admitted.params.speed, 1.0);
        assert_eq!(admitted.format, AudioFormat::Wav);
        assert_eq!(admitted.request_id.len(), 32);
    }

    #[test]
    fn test_fields_carried() {
        let req: TtsRequest = serde_json::from_str(
            r#"{"text":"hi","model":"qwen3-tts-1.7b","voice":"Narrator","language":"ja",
                "seed":42,"speed":1.5,"sample_rate":16000,"request_id":"r-1","tone":"calm"}"#,
        )
        .unwrap();
        let admitted = req.into_admission(&config(), "qwen3-tts-0.6b").unwrap();

        assert_eq!(admitted.request_id, "r-1");
        assert_eq!(admitted.model, "qwen3-tts-1.7b");
        assert_eq!(admitted.params.voice.as_deref(), Some("serena"));
        assert_eq!(admitted.params.language, Language::Ja);
        assert_eq!(admitted.params.seed, Some(42));
        assert_eq!(admitted.params.tone.as_deref(), Some("calm"));
        assert_eq!(admitted.params.sample_rate, 16_000);
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            TtsRequest::new("   "),
            TtsRequest::new("x".repeat(601)),
            TtsRequest {
                speed: Some(0.1),
                ..TtsRequest::new("hi")
            },
            TtsRequest {
                speed: Some(4.5),
                ..TtsRequest::new("hi")
            },
            TtsRequest {
                sample_rate: Some(0),
                ..TtsRequest::new("hi")
            },
            TtsRequest {
                seed: Some(-1),
                ..TtsRequest::new("hi")
            },
        ];
        for req in cases {
            let err = req.clone().into_admission(&config(), "m").unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "{:?}", req);
        }
    }

    #[test]
    fn test_stream_rejected() {
        let req = TtsRequest {
            stream: true,
            ..TtsRequest::new("hi")
        };
        let err = req.into_admission(&config(), "m").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "streaming not implemented yet"));
    }

    #[test]
    fn test_unencodable_format_rejected() {
        let req = TtsRequest {
            format: AudioFormat::Mp3,
            ..TtsRequest::new("hi")
        };
        let err = req.into_admission(&config(), "m").unwrap_err();
        assert!(matches!(
            err,
            ApiError::Audio(ttsgate_core::AudioError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_response_skips_missing_fields() {
        let response = TtsResponse {
            request_id: "r".to_string(),
            audio_format: AudioFormat::Wav,
            sample_rate: 24_000,
            duration_sec: 1.0,
            audio_base64: Some("UklGRg==".to_string()),
            audio_url: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["audio_format"], "wav");
        assert!(json.get("audio_url").is_none());
    }
}
