//! Persistent transform cache.
//!
//! [`PersistentCache`] is the on-disk [`TransformCache`] used when
//! `cache.type = "filesystem"`. Records are keyed by content (see
//! [`tote_graph::CacheKey`]), so there is no invalidation step: a changed
//! file simply produces a key that was never written. Storage failures are
//! logged and reported as misses; they never fail a build.

mod key;
mod storage;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tote_graph::{CacheKey, TransformCache, TransformOutput};

pub use key::build_fingerprint;
pub use storage::{CacheError, CacheStore, CachedRecord};

#[derive(Debug)]
pub struct PersistentCache {
    store: CacheStore,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PersistentCache {
    /// Open (or create) the cache in `dir`.
    pub fn open(dir: &Path) -> Result<Self, CacheError> {
        let store = CacheStore::open(dir)?;
        tracing::debug!(path = %store.path().display(), "opened persistent cache");
        Ok(Self {
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Lifetime `(hits, misses)`.
    pub fn counters(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

impl TransformCache for PersistentCache {
    fn get(&self, key: &CacheKey) -> Option<TransformOutput> {
        match self.store.get(key) {
            Ok(record) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(record.output)
            }
            Err(CacheError::CacheMiss) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "cache read failed");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn put(&self, key: &CacheKey, output: &TransformOutput) {
        if let Err(err) = self.store.put(key, &CachedRecord::new(output.clone())) {
            tracing::warn!(key = %key, error = %err, "cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn hits_after_reopen() {
        let dir = TempDir::new().unwrap();
        let key = CacheKey::from_hex("abc");
        let output = TransformOutput {
            code: "module.exports = 1;".into(),
            dependencies: Vec::new(),
        };

        {
            let cache = PersistentCache::open(dir.path()).unwrap();
            assert!(cache.get(&key).is_none());
            cache.put(&key, &output);
            assert_eq!(cache.counters(), (0, 1));
        }

        let cache = PersistentCache::open(dir.path()).unwrap();
        assert_eq!(cache.get(&key), Some(output));
        assert_eq!(cache.counters(), (1, 0));
    }
}
