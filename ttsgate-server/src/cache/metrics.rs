//! Snapshot statistics for the result cache.

use serde::Serialize;

/// Point-in-time view of cache counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Resident entries
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// hits / (hits + misses), 0.0 before the first lookup
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn new(size: usize, capacity: usize, hits: u64, misses: u64, evictions: u64) -> Self {
        let lookups = hits + misses;
        let hit_rate = if lookups > 0 {
            hits as f64 / lookups as f64
        } else {
            0.0
        };
        Self {
            size,
            capacity,
            hits,
            misses,
            evictions,
            hit_rate,
        }
    }
}
