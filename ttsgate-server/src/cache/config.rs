//! Configuration for the result cache.

use crate::config::parse_bool;

/// Configuration for the result cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether admission consults the cache at all
    pub enabled: bool,

    /// Maximum number of resident entries
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 32,
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("TTS_ENABLE_CACHE") {
            config.enabled = parse_bool(&val);
        }

        if let Some(val) = lookup("TTS_CACHE_SIZE") {
            if let Ok(n) = val.trim().parse::<usize>() {
                config.max_entries = n.max(1);
            }
        }

        config
    }
}
