/// Eviction modes for the overflow store when it is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictionMode {
    /// Purge expired entries first, then fall back to least-recently-used.
    TtlFirst,
    LruOnly,
    /// Only expired entries are evicted; inserts past capacity still displace the LRU entry.
    TtlOnly,
}

/// Configuration for the in-memory cursor store.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub capacity: usize,
    pub batch_size: usize,
    pub eviction_mode: EvictionMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 4096, batch_size: 16, eviction_mode: EvictionMode::TtlFirst }
    }
}
