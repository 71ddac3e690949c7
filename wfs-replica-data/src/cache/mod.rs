//! Age-bounded document cache for service metadata.
//!
//! Capabilities, schemas and the primary-key registry are expensive to fetch
//! and change rarely. The client stores them as JSON documents keyed by name
//! and re-derives an entry once it is older than its time-to-live.

mod error;
mod fs;
mod memory;

use std::time::{Duration, SystemTime};

pub use error::CacheError;
pub use fs::{DISPOSABLE_CACHE_FILE, FsCacheStore};
pub use memory::MemoryCacheStore;

/// Source of the current time, injectable for staleness tests.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> SystemTime;
}

/// [`Clock`] reading the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Key to document mapping with modification times.
pub trait CacheStore {
    /// Stored document for `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `contents` under `key`, replacing any previous document.
    fn put(&self, key: &str, contents: &str) -> Result<(), CacheError>;

    /// Whether `key` is missing, empty, or older than `ttl`.
    fn is_stale(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;
}

/// Staleness rule shared by every store.
///
/// Documents stamped in the future count as fresh.
#[must_use]
pub fn is_expired(contents: &str, modified: SystemTime, now: SystemTime, ttl: Duration) -> bool {
    if contents.trim().is_empty() {
        return true;
    }
    now.duration_since(modified)
        .is_ok_and(|age| age >= ttl)
}
