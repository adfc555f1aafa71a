use thiserror::Error;
use ttsgate_core::SynthesisError;

/// Why a dispatch did not produce a waveform
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// Identifier is not in the registry
    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    /// The model already has `capacity` outstanding tasks
    #[error("Queue for model '{model}' is full (max: {capacity})")]
    QueueFull { model: String, capacity: usize },

    /// The worker loops went away before answering
    #[error("Workers for model '{0}' stopped")]
    WorkerStopped(String),

    /// Loading or invoking the engine failed
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

impl DispatchError {
    /// True when retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QueueFull { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = DispatchError::QueueFull {
            model: "qwen3-tts-0.6b".to_string(),
            capacity: 2,
        };
        assert_eq!(err.to_string(), "Queue for model 'qwen3-tts-0.6b' is full (max: 2)");
        assert!(err.is_retryable());

        let err: DispatchError = SynthesisError::backend("boom").into();
        assert_eq!(err.to_string(), "Synthesis backend error: boom");
        assert!(!err.is_retryable());
    }
}
