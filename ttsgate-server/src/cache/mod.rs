//! Result cache for synthesized audio.
//!
//! Identical requests (same model, text, voice, language, tone, speed, seed,
//! sample rate and output format) are served from a bounded LRU store
//! instead of re-running synthesis.
//!
//! ```text
//! admit(request)
//!        │
//!        ▼
//! ┌───────────────┐  hit
//! │  AudioCache   │ ──────► encoded audio
//! │ (LRU, 1 lock) │
//! └──────┬────────┘
//!        │ miss
//!        ▼
//!    dispatch ──► encode ──► put
//! ```
//!
//! Lookup, promotion, insertion, eviction and the hit/miss counters all
//! happen under one lock, so counters never disagree with residency.

mod config;
mod key;
mod metrics;
mod store;

pub use config::CacheConfig;
pub use key::{CacheKey, CachedAudio};
pub use metrics::CacheStats;
pub use store::{LruStore, PutOutcome};

use tokio::sync::Mutex;
use tracing::debug;

use crate::metrics::prometheus as prom;

/// Shared, lock-protected result cache
pub struct AudioCache {
    store: Mutex<LruStore>,
}

impl AudioCache {
    /// Create a cache bounded at `max_entries` (minimum 1)
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: Mutex::new(LruStore::new(max_entries)),
        }
    }

    /// Build from config; `None` when caching is disabled
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config.enabled.then(|| Self::new(config.max_entries))
    }

    /// Look up a key, promoting it on hit
    pub async fn get(&self, key: &CacheKey) -> Option<CachedAudio> {
        let found = self.store.lock().await.get(key);
        prom::record_cache_lookup(found.is_some());
        debug!(
            fingerprint = %format!("{:016x}", key.fingerprint()),
            hit = found.is_some(),
            "cache lookup"
        );
        found
    }

    /// Insert or replace, evicting the least-recently-used entry when full
    pub async fn put(&self, key: CacheKey, value: CachedAudio) -> PutOutcome {
        let (outcome, size) = {
            let mut store = self.store.lock().await;
            let outcome = store.put(key, value);
            (outcome, store.len())
        };
        if outcome == PutOutcome::Evicted {
            prom::record_cache_eviction();
        }
        prom::set_cache_size(size);
        outcome
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.store.lock().await.clear();
        prom::set_cache_size(0);
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.lock().await.stats()
    }
}
