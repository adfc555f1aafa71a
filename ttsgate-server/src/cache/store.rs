//! Bounded LRU store of encoded audio.

use std::num::NonZeroUsize;

use lru::LruCache;

use super::key::{CacheKey, CachedAudio};
use super::metrics::CacheStats;

/// Outcome of a `put`, for metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    Replaced,
    /// A new key went in and the least-recently-used entry fell out
    Evicted,
}

/// LRU map plus the counters that must move together with it.
///
/// Not synchronized; [`super::AudioCache`] wraps it in a single lock.
pub struct LruStore {
    entries: LruCache<CacheKey, CachedAudio>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl LruStore {
    /// Create a store holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Look up a key. A hit promotes the entry to most-recently-used.
    pub fn get(&mut self, key: &CacheKey) -> Option<CachedAudio> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits += 1;
                Some(entry.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert or replace, marking the key most-recently-used
    pub fn put(&mut self, key: CacheKey, value: CachedAudio) -> PutOutcome {
        let replacing = self.entries.contains(&key);
        match self.entries.push(key, value) {
            Some(_) if !replacing => {
                self.evictions += 1;
                PutOutcome::Evicted
            }
            Some(_) => PutOutcome::Replaced,
            None => PutOutcome::Inserted,
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.len(),
            self.capacity(),
            self.hits,
            self.misses,
            self.evictions,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttsgate_core::{AudioFormat, SynthesisParams};

    fn key(text: &str) -> CacheKey {
        CacheKey::new("qwen3-tts-0.6b", &SynthesisParams::new(text), AudioFormat::Wav)
    }

    fn audio(tag: u8) -> CachedAudio {
        CachedAudio::new(vec![tag; 4], AudioFormat::Wav, 24_000, 0.5)
    }

    #[test]
    fn test_get_after_put() {
        let mut store = LruStore::new(4);
        assert_eq!(store.put(key("a"), audio(1)), PutOutcome::Inserted);
        assert_eq!(store.get(&key("a")), Some(audio(1)));
        assert_eq!(store.get(&key("b")), None);

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_eviction_of_least_recent() {
        let mut store = LruStore::new(2);
        store.put(key("A"), audio(1));
        store.put(key("B"), audio(2));
        assert_eq!(store.put(key("C"), audio(3)), PutOutcome::Evicted);

        assert!(!store.contains(&key("A")));
        assert!(store.contains(&key("B")));
        assert!(store.contains(&key("C")));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_get_promotes_entry() {
        let mut store = LruStore::new(2);
        store.put(key("A"), audio(1));
        store.put(key("B"), audio(2));
        assert!(store.get(&key("A")).is_some());
        store.put(key("C"), audio(3));

        assert!(store.contains(&key("A")));
        assert!(!store.contains(&key("B")));
    }

    #[test]
    fn test_replace_does_not_evict() {
        let mut store = LruStore::new(1);
        store.put(key("A"), audio(1));
        assert_eq!(store.put(key("A"), audio(9)), PutOutcome::Replaced);
        assert_eq!(store.get(&key("A")), Some(audio(9)));
        assert_eq!(store.stats().evictions, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut store = LruStore::new(0);
        assert_eq!(store.capacity(), 1);
        store.put(key("A"), audio(1));
        assert_eq!(store.len(), 1);
    }
}
