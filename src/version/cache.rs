//! In-memory cache of fetched version lists
//!
//! Bounded by capacity (oldest insertion evicted first) and by entry age.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tracing::debug;

use crate::config::{DEFAULT_FETCH_CACHE_CAPACITY, DEFAULT_FETCH_CACHE_TTL_MS};

struct CachedVersions {
    versions: Vec<String>,
    expires_at: Instant,
}

/// Artifact key -> sorted (descending) canonical version list
pub struct FetchCache {
    entries: Mutex<IndexMap<String, CachedVersions>>,
    capacity: usize,
    ttl: Duration,
}

impl FetchCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, IndexMap<String, CachedVersions>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the cached list, or `None` when absent or expired.
    ///
    /// An empty list is a valid hit: the registry had nothing for this key.
    pub fn get(&self, key: &str) -> Option<Vec<String>> {
        let mut entries = self.lock_entries();
        let now = Instant::now();

        match entries.get(key) {
            Some(cached) if cached.expires_at > now => {
                debug!("Returning cached versions for {}", key);
                Some(cached.versions.clone())
            }
            Some(_) => {
                debug!("Cached versions for {} expired", key);
                entries.shift_remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: &str, versions: Vec<String>) {
        let mut entries = self.lock_entries();
        let now = Instant::now();

        entries.retain(|_, cached| cached.expires_at > now);
        entries.shift_remove(key);

        while entries.len() >= self.capacity {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                debug!("Evicting cached versions for {}", evicted);
            }
        }

        entries.insert(
            key.to_string(),
            CachedVersions {
                versions,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new(
            DEFAULT_FETCH_CACHE_CAPACITY,
            Duration::from_millis(DEFAULT_FETCH_CACHE_TTL_MS),
        )
    }
}
