//! Error types for the ttsgate core library
//!
//! # Error Hierarchy
//!
//! ```text
//! SynthesisError  - anything the inference capability raises (load or invoke)
//! AudioError      - container encoding/decoding failures
//! ```
//!
//! Both are cloneable so a single failure can be handed to a waiting caller
//! and still be logged by the consumer loop that produced it.

use thiserror::Error;

/// Errors raised by a speech engine or its loader
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// Model construction failed
    #[error("Failed to load model '{model}': {message}")]
    Load { model: String, message: String },

    /// The backend rejected or failed the synthesis call
    #[error("Synthesis backend error: {0}")]
    Backend(String),

    /// The backend answered with something that is not usable audio
    #[error("Invalid synthesis output: {0}")]
    InvalidOutput(String),

    /// The blocking synthesis call panicked
    #[error("Synthesis task panicked: {0}")]
    Panicked(String),
}

impl SynthesisError {
    /// Create a load error
    pub fn load(model: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Load {
            model: model.into(),
            message: msg.into(),
        }
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create an invalid output error
    pub fn invalid_output(msg: impl Into<String>) -> Self {
        Self::InvalidOutput(msg.into())
    }
}

/// Errors raised while encoding or decoding audio containers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No encoder is available for the requested container
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// WAV encoding failed
    #[error("WAV encoding failed: {0}")]
    Encode(String),

    /// WAV decoding failed
    #[error("WAV decoding failed: {0}")]
    Decode(String),
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        AudioError::Encode(err.to_string())
    }
}
