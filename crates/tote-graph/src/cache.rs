//! Transform cache seam.
//!
//! The graph builder looks up every module under a key derived from its
//! content hash, so a record can only ever be returned for the exact bytes it
//! was computed from. Storage lives behind [`TransformCache`]; this crate
//! ships an in-memory and a no-op implementation, `tote-bundler` adds a
//! persistent one.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use blake3::Hasher;
use dashmap::DashMap;

use crate::transform::TransformOutput;

/// Current cache record format. Increment when `TransformOutput` changes shape.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Content-addressed cache key (BLAKE3 hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Key for a module's transform output.
    ///
    /// `namespace` is the build fingerprint: format and tool versions, build
    /// dependency contents and the rule configuration.
    pub fn transform(namespace: &str, path: &Path, content_hash: &str) -> Self {
        KeyHasher::new("transform")
            .field(namespace)
            .field(path.to_string_lossy().as_bytes())
            .field(content_hash)
            .finish()
    }

    /// Key for minified output of `code`, where `kind` is `js`, `css` or `html`.
    pub fn minified(namespace: &str, kind: &str, code: &str) -> Self {
        KeyHasher::new("minify")
            .field(namespace)
            .field(kind)
            .field(code)
            .finish()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds keys from `\0`-separated fields.
pub struct KeyHasher(Hasher);

impl KeyHasher {
    pub fn new(domain: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(&CACHE_FORMAT_VERSION.to_le_bytes());
        hasher.update(domain.as_bytes());
        hasher.update(b"\0");
        Self(hasher)
    }

    pub fn field(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.0.update(bytes.as_ref());
        self.0.update(b"\0");
        self
    }

    pub fn finish(self) -> CacheKey {
        CacheKey(self.0.finalize().to_hex().to_string())
    }
}

/// Storage for transform results.
///
/// Implementations must not fail the build: storage errors are logged and
/// reported as misses.
pub trait TransformCache: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &CacheKey) -> Option<TransformOutput>;

    fn put(&self, key: &CacheKey, output: &TransformOutput);
}

/// Process-local cache. `tote dev` keeps one across rebuilds.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<CacheKey, TransformOutput>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Lifetime `(hits, misses)`.
    pub fn counters(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

impl TransformCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<TransformOutput> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn put(&self, key: &CacheKey, output: &TransformOutput) {
        self.entries.insert(key.clone(), output.clone());
    }
}

/// Cache that stores nothing (`--no-cache`).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl TransformCache for NoopCache {
    fn get(&self, _key: &CacheKey) -> Option<TransformOutput> {
        None
    }

    fn put(&self, _key: &CacheKey, _output: &TransformOutput) {}
}
