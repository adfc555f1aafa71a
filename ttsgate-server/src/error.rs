//! Error types for the ttsgate server.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use ttsgate_core::{AudioError, SynthesisError};

use crate::admission::AdmissionError;
use crate::dispatcher::DispatchError;

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request is well-formed JSON but violates a field constraint
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Request asks for something the service does not do
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    /// The model's queue is at capacity
    #[error("Server busy: {0}")]
    Busy(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Audio encoding failed: {0}")]
    Audio(#[from] AudioError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) | ApiError::UnknownModel(_) => StatusCode::BAD_REQUEST,
            ApiError::Busy(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Audio(AudioError::UnsupportedFormat(_)) => StatusCode::BAD_REQUEST,
            ApiError::Synthesis(_) | ApiError::Audio(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "Validation",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::UnknownModel(_) => "UnknownModel",
            ApiError::Busy(_) => "Busy",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Synthesis(_) => "Synthesis",
            ApiError::Audio(_) => "Audio",
            ApiError::Internal(_) => "Internal",
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::UnknownModel(model) => ApiError::UnknownModel(model),
            DispatchError::QueueFull { .. } => ApiError::Busy(err.to_string()),
            DispatchError::WorkerStopped(_) => ApiError::Internal(err.to_string()),
            DispatchError::Synthesis(e) => ApiError::Synthesis(e),
        }
    }
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::Dispatch(e) => e.into(),
            AdmissionError::Audio(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": self.kind(),
            }
        }));

        if status == StatusCode::TOO_MANY_REQUESTS {
            return (status, [(header::RETRY_AFTER, "1")], body).into_response();
        }
        (status, body).into_response()
    }
}
