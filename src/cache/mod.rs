//! Out-of-band storage for cursors too large to hand out inline.

mod config;
mod core;

use crate::errors::PageError;
use serde_json::Value;
use std::time::Duration;

pub use config::{CacheConfig, EvictionMode};
pub use core::{CacheEntry, MemoryCursorStore, StoreStats};

/// Key-value store with per-entry expiry, used for overflowed cursor payloads.
///
/// Implementations may front Redis, memcached or a database table; the in-process
/// [`MemoryCursorStore`] serves a single node and tests.
pub trait CursorStore: Send + Sync {
    fn write(&self, key: &str, payload: &Value, ttl: Duration) -> Result<(), PageError>;
    fn read(&self, key: &str) -> Result<Option<Value>, PageError>;
    fn delete(&self, key: &str) -> Result<(), PageError>;
}
