//! Shared request vocabulary: languages and output containers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages accepted by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Auto,
    En,
    Ja,
    Zh,
    Fr,
    Es,
    De,
    Ko,
}

impl Language {
    /// Wire code, as clients send it
    pub fn code(&self) -> &'static str {
        match self {
            Language::Auto => "auto",
            Language::En => "en",
            Language::Ja => "ja",
            Language::Zh => "zh",
            Language::Fr => "fr",
            Language::Es => "es",
            Language::De => "de",
            Language::Ko => "ko",
        }
    }

    /// Name the synthesis backend expects
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Auto => "Auto",
            Language::En => "English",
            Language::Ja => "Japanese",
            Language::Zh => "Chinese",
            Language::Fr => "French",
            Language::Es => "Spanish",
            Language::De => "German",
            Language::Ko => "Korean",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Output container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
        }
    }

    /// Infer the container from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "wav" => Some(AudioFormat::Wav),
            "mp3" => Some(AudioFormat::Mp3),
            _ => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
