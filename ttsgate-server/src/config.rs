//! Service configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::dispatcher::DispatchConfig;

/// Parse the boolean spellings operators use: `1`, `true`, `yes`, `on`
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// How generated audio is handed back to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Inline base64 in the JSON response
    Base64,
    /// Written under the output directory, served from `/v1/audio/{file}`
    File,
}

impl OutputMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "base64" => Some(Self::Base64),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// Top-level service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,

    pub output_mode: OutputMode,
    pub output_dir: PathBuf,

    /// Longest accepted request text, in characters
    pub max_text_length: usize,
    /// Sample rate used when a request does not specify one
    pub default_sample_rate: u32,

    /// Base URL of the inference sidecar
    pub engine_url: String,
    pub engine_timeout: Duration,

    /// Hugging Face cache root and mirror, forwarded to the sidecar
    pub hf_home: Option<PathBuf>,
    pub hf_endpoint: Option<String>,

    pub log_level: String,

    pub cache: CacheConfig,
    pub dispatch: DispatchConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            output_mode: OutputMode::Base64,
            output_dir: PathBuf::from("generated_audio"),
            max_text_length: 600,
            default_sample_rate: 24_000,
            engine_url: "http://127.0.0.1:9000".to_string(),
            engine_timeout: Duration::from_secs(300),
            hf_home: None,
            hf_endpoint: None,
            log_level: "info".to_string(),
            cache: CacheConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = non_empty("TTS_HOST") {
            config.host = host;
        }
        if let Some(port) = non_empty("TTS_PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
            config.port = port;
        }
        if let Some(mode) = non_empty("TTS_OUTPUT_MODE").and_then(|v| OutputMode::parse(&v)) {
            config.output_mode = mode;
        }
        if let Some(dir) = non_empty("TTS_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(n) = non_empty("TTS_MAX_TEXT_LENGTH").and_then(|v| v.trim().parse::<usize>().ok()) {
            config.max_text_length = n;
        }
        if let Some(sr) = non_empty("TTS_DEFAULT_SAMPLE_RATE").and_then(|v| v.trim().parse::<u32>().ok())
        {
            config.default_sample_rate = sr;
        }
        if let Some(url) = non_empty("TTS_ENGINE_URL") {
            config.engine_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = non_empty("TTS_ENGINE_TIMEOUT_SECS").and_then(|v| v.trim().parse::<u64>().ok())
        {
            config.engine_timeout = Duration::from_secs(secs);
        }
        config.hf_home = non_empty("HF_HOME").map(PathBuf::from);
        config.hf_endpoint = non_empty("HF_ENDPOINT");
        if let Some(level) = non_empty("TTS_LOG_LEVEL") {
            config.log_level = level.trim().to_lowercase();
        }

        config.cache = CacheConfig::from_lookup(&lookup);
        config.dispatch = DispatchConfig::from_lookup(&lookup);
        config
    }

    /// `host:port` for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
