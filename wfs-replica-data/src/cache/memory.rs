use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use super::{CacheError, CacheStore, Clock, SystemClock, is_expired};

/// In-process cache, useful for embedding and tests.
pub struct MemoryCacheStore {
    entries: Mutex<BTreeMap<String, (String, SystemTime)>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheStore")
            .field("entries", &self.entries)
            .field("clock", &"<dyn Clock>")
            .finish()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl MemoryCacheStore {
    /// Create an empty cache using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache with an explicit clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            clock,
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).map(|(contents, _)| contents.clone()))
    }

    fn put(&self, key: &str, contents: &str) -> Result<(), CacheError> {
        let now = self.clock.now();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), (contents.to_owned(), now));
        Ok(())
    }

    fn is_stale(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).is_none_or(|(contents, modified)| {
            is_expired(contents, *modified, self.clock.now(), ttl)
        }))
    }
}
