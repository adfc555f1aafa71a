//! HTTP route handlers for the ttsgate server.
//!
//! This module organizes all route handlers:
//! - `health`: Health check and metrics endpoints
//! - `tts`: Synthesis, voices and stored audio

pub mod health;
pub mod tts;

// Re-export handlers for convenience
pub use health::{health, live, metrics, metrics_prometheus, ready};
pub use tts::{get_audio, list_voices, synthesize};
