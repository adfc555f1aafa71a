//! Synthesis, voice listing and stored-audio endpoints.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::StorageError;
use crate::types::{TtsRequest, TtsResponse, VoicesQuery, VoicesResponse};

/// Synthesize speech
///
/// POST /v1/tts
pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TtsRequest>,
) -> Result<Json<TtsResponse>, ApiError> {
    let manager = state.manager();
    let request = request.into_admission(&state.config, manager.registry().default_model())?;
    let admitted = state.admission.admit(&request).await?;
    let audio = admitted.audio;

    let (audio_base64, audio_url) = match &state.storage {
        Some(storage) => {
            let file_name = storage
                .save(&audio.audio, audio.format)
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            (None, Some(format!("/v1/audio/{}", file_name)))
        }
        None => (Some(STANDARD.encode(audio.audio.as_slice())), None),
    };

    Ok(Json(TtsResponse {
        request_id: request.request_id,
        audio_format: audio.format,
        sample_rate: audio.sample_rate,
        duration_sec: audio.duration_sec,
        audio_base64,
        audio_url,
    }))
}

/// List voices for a model
///
/// GET /v1/voices?model=&refresh=
pub async fn list_voices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VoicesQuery>,
) -> Result<Json<VoicesResponse>, ApiError> {
    let manager = state.manager();
    let model = query
        .model
        .unwrap_or_else(|| manager.registry().default_model().to_string());
    if !manager.registry().contains(&model) {
        return Err(ApiError::UnknownModel(model));
    }

    let voices = manager.available_voices(&model, query.refresh).await;
    Ok(Json(VoicesResponse { model, voices }))
}

/// Serve a stored audio file (file output mode)
///
/// GET /v1/audio/:file_name
pub async fn get_audio(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let storage = state
        .storage
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("file output is disabled".to_string()))?;

    match storage.load(&file_name).await {
        Ok((bytes, format)) => Ok(([(header::CONTENT_TYPE, format.mime_type())], bytes)),
        Err(StorageError::InvalidName(name)) => {
            warn!(file_name = %name, "Rejected audio file name");
            Err(ApiError::NotFound(name))
        }
        Err(StorageError::NotFound(name)) => Err(ApiError::NotFound(name)),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}
