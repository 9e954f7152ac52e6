use crate::cache::CursorStore;
use crate::cache::config::{CacheConfig, EvictionMode};
use crate::errors::PageError;
use crate::utils::num::usize_to_u64;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::RwLock;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A stored cursor payload with its expiry.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub payload: Value,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    #[must_use]
    pub fn new(payload: Value, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now().checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { payload, expires_at }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Point-in-time view of a store's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub deletes: u64,
    /// Entries dropped because their TTL ran out.
    pub expired: u64,
    /// Live entries displaced to stay within capacity.
    pub evicted: u64,
    /// Approximate payload bytes currently held.
    pub bytes: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    expired: AtomicU64,
    evicted: AtomicU64,
    bytes: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    fn release(&self, slot: &Slot) {
        self.bytes.fetch_sub(slot.bytes, Ordering::Relaxed);
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

struct Slot {
    entry: CacheEntry,
    bytes: u64,
}

impl Slot {
    fn new(key: &str, entry: CacheEntry) -> Self {
        let body = serde_json::to_vec(&entry.payload).map_or(0, |b| b.len());
        // key + body + expiry timestamp
        let bytes = usize_to_u64(key.len() + body + 12);
        Self { entry, bytes }
    }
}

type Slots = LruCache<String, Slot>;

/// A thread-safe, in-memory overflow store with TTL-first + LRU fallback eviction.
///
/// Expired entries are dropped lazily on access, when room is needed for a new key, or
/// through [`MemoryCursorStore::purge_expired_now`].
#[derive(Clone)]
pub struct MemoryCursorStore {
    slots: Arc<RwLock<Slots>>,
    config: Arc<RwLock<CacheConfig>>,
    counters: Arc<Counters>,
}

impl MemoryCursorStore {
    pub fn new(capacity: usize) -> Self {
        Self::new_with_config(CacheConfig { capacity, ..Default::default() })
    }

    pub fn new_with_config(config: CacheConfig) -> Self {
        let cap = NonZeroUsize::new(config.capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Arc::new(RwLock::new(LruCache::new(cap))),
            config: Arc::new(RwLock::new(config)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Inserts an entry. Overwriting an existing key never evicts another entry.
    pub fn insert(&self, key: String, entry: CacheEntry) {
        let slot = Slot::new(&key, entry);
        let bytes = slot.bytes;
        let mut slots = self.slots.write();
        if !slots.contains(&key) {
            self.make_room(&mut slots);
        }
        if let Some((displaced, old)) = slots.push(key.clone(), slot) {
            self.counters.release(&old);
            if displaced != key {
                Counters::bump(&self.counters.evicted, 1);
            }
        }
        Counters::bump(&self.counters.bytes, bytes);
        Counters::bump(&self.counters.writes, 1);
    }

    /// Returns the live entry for `key`, dropping it if it has expired.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut slots = self.slots.write();
        let live = slots.get(key).map(|s| (!s.entry.is_expired()).then(|| s.entry.clone()));
        match live {
            Some(Some(entry)) => {
                Counters::bump(&self.counters.hits, 1);
                Some(entry)
            }
            Some(None) => {
                if let Some(old) = slots.pop(key) {
                    self.counters.release(&old);
                }
                Counters::bump(&self.counters.expired, 1);
                Counters::bump(&self.counters.misses, 1);
                None
            }
            None => {
                Counters::bump(&self.counters.misses, 1);
                None
            }
        }
    }

    pub fn remove(&self, key: &str) -> Option<CacheEntry> {
        let slot = self.slots.write().pop(key)?;
        self.counters.release(&slot);
        Counters::bump(&self.counters.deletes, 1);
        Some(slot.entry)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    pub fn clear(&self) {
        self.slots.write().clear();
        self.counters.bytes.store(0, Ordering::Relaxed);
    }

    /// Force a TTL purge now. Returns number evicted.
    pub fn purge_expired_now(&self) -> usize {
        self.drop_expired(&mut self.slots.write())
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.counters.stats()
    }

    pub fn set_eviction_mode(&self, mode: EvictionMode) {
        self.config.write().eviction_mode = mode;
    }

    pub fn set_capacity(&self, capacity: usize) {
        let nz = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        self.config.write().capacity = nz.get();
        let mut slots = self.slots.write();
        while slots.len() > nz.get() {
            let Some((_, old)) = slots.pop_lru() else { break };
            self.counters.release(&old);
            Counters::bump(&self.counters.evicted, 1);
        }
        slots.resize(nz);
    }

    fn drop_expired(&self, slots: &mut Slots) -> usize {
        let stale: Vec<String> =
            slots.iter().filter(|(_, s)| s.entry.is_expired()).map(|(k, _)| k.clone()).collect();
        let mut freed = 0u64;
        for key in &stale {
            if let Some(old) = slots.pop(key) {
                self.counters.release(&old);
                freed = freed.saturating_add(old.bytes);
            }
        }
        if !stale.is_empty() {
            Counters::bump(&self.counters.expired, usize_to_u64(stale.len()));
            crate::dev6!(
                "{{\"bench\":\"cache\",\"op\":\"ttl_purge\",\"evicted\":{},\"freed_bytes\":{}}}",
                stale.len(),
                freed
            );
        }
        stale.len()
    }

    /// Frees one slot for a new key: expired entries first, then least-recently-used.
    fn make_room(&self, slots: &mut Slots) {
        let cap = slots.cap().get();
        if slots.len() < cap {
            return;
        }
        let (mode, batch) = {
            let cfg = self.config.read();
            (cfg.eviction_mode, cfg.batch_size.max(1))
        };
        let mut needed = slots.len() + 1 - cap;

        if mode != EvictionMode::LruOnly {
            needed = needed.saturating_sub(self.drop_expired(slots));
        }
        if mode == EvictionMode::TtlOnly {
            return;
        }

        let mut dropped = 0usize;
        while needed > 0 && dropped < batch {
            let Some((_, old)) = slots.pop_lru() else { break };
            self.counters.release(&old);
            needed -= 1;
            dropped += 1;
        }
        if dropped > 0 {
            Counters::bump(&self.counters.evicted, usize_to_u64(dropped));
            crate::dev6!("{{\"bench\":\"cache\",\"op\":\"lru_evict\",\"evicted\":{}}}", dropped);
        }
    }
}

impl CursorStore for MemoryCursorStore {
    fn write(&self, key: &str, payload: &Value, ttl: Duration) -> Result<(), PageError> {
        self.insert(key.to_string(), CacheEntry::new(payload.clone(), ttl));
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<Value>, PageError> {
        Ok(self.get(key).map(|e| e.payload))
    }

    fn delete(&self, key: &str) -> Result<(), PageError> {
        self.remove(key);
        Ok(())
    }
}
