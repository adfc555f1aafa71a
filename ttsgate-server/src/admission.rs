//! Request admission: cache lookup, dispatch, encoding, cache fill.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use ttsgate_core::{audio, AudioError, AudioFormat, SynthesisParams};

use crate::cache::{AudioCache, CacheKey, CachedAudio};
use crate::dispatcher::{DispatchError, ModelManager};
use crate::metrics::RequestTimer;

/// Why admission did not produce audio
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// A validated synthesis request
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub request_id: String,
    pub model: String,
    pub params: SynthesisParams,
    pub format: AudioFormat,
}

/// Encoded audio plus where it came from
#[derive(Debug, Clone)]
pub struct Admitted {
    pub audio: CachedAudio,
    pub cache_hit: bool,
}

/// Front door for synthesis: consults the cache, otherwise dispatches
#[derive(Clone)]
pub struct Admission {
    manager: Arc<ModelManager>,
    cache: Option<Arc<AudioCache>>,
}

impl Admission {
    pub fn new(manager: Arc<ModelManager>, cache: Option<Arc<AudioCache>>) -> Self {
        Self { manager, cache }
    }

    pub fn manager(&self) -> &Arc<ModelManager> {
        &self.manager
    }

    pub fn cache(&self) -> Option<&Arc<AudioCache>> {
        self.cache.as_ref()
    }

    /// Produce encoded audio for `request`.
    ///
    /// Containers this build cannot encode are refused before any queue slot
    /// is taken. Only successful results are cached. Concurrent identical
    /// misses each dispatch; the later `put` replaces the earlier one.
    pub async fn admit(&self, request: &AdmissionRequest) -> Result<Admitted, AdmissionError> {
        info!(
            request_id = %request.request_id,
            model = %request.model,
            voice = request.params.voice.as_deref().unwrap_or("default"),
            language = request.params.language.code(),
            format = %request.format,
            "Synthesis request received"
        );

        let timer = RequestTimer::new(&request.model);
        if let Err(e) = audio::ensure_encodable(request.format) {
            timer.finish("error");
            return Err(e.into());
        }

        let key = self
            .cache
            .as_ref()
            .map(|_| CacheKey::new(&request.model, &request.params, request.format));

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(audio) = cache.get(key).await {
                let stats = cache.stats().await;
                info!(
                    request_id = %request.request_id,
                    model = %request.model,
                    hits = stats.hits,
                    misses = stats.misses,
                    "Cache hit"
                );
                timer.finish("cache_hit");
                return Ok(Admitted {
                    audio,
                    cache_hit: true,
                });
            }
        }

        let output = match self
            .manager
            .dispatch(&request.model, request.params.clone())
            .await
        {
            Ok(output) => output,
            Err(e) => {
                if e.is_retryable() {
                    warn!(request_id = %request.request_id, model = %request.model, "Rejected: {}", e);
                    timer.finish("rejected");
                } else {
                    timer.finish("error");
                }
                return Err(e.into());
            }
        };

        let bytes = audio::encode(&output.samples, output.sample_rate, request.format)?;
        let audio = CachedAudio::new(
            bytes,
            request.format,
            output.sample_rate,
            output.duration_secs(),
        );

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.put(key, audio.clone()).await;
            let cache_size = cache.len().await;
            info!(
                request_id = %request.request_id,
                model = %request.model,
                cache_size,
                "Cache store"
            );
        }

        info!(
            request_id = %request.request_id,
            model = %request.model,
            duration_sec = audio.duration_sec,
            bytes = audio.audio.len(),
            elapsed_ms = timer.elapsed_ms(),
            "Synthesis complete"
        );
        timer.finish("success");

        Ok(Admitted {
            audio,
            cache_hit: false,
        })
    }
}
