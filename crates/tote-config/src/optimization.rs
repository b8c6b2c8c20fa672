//! Minification and chunk splitting options.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationConfig {
    /// Minify emitted scripts, styles and HTML. `None` follows the mode.
    #[serde(default)]
    pub minimize: Option<bool>,

    /// Minify on the rayon thread pool.
    #[serde(default = "default_true")]
    pub parallel: bool,

    #[serde(default)]
    pub split_chunks: SplitChunksConfig,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            minimize: None,
            parallel: true,
            split_chunks: SplitChunksConfig::default(),
        }
    }
}

/// Which chunks take part in splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunksFilter {
    All,
    Initial,
    #[default]
    Async,
}

impl ChunksFilter {
    pub fn includes(&self, initial: bool) -> bool {
        match self {
            ChunksFilter::All => true,
            ChunksFilter::Initial => initial,
            ChunksFilter::Async => !initial,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitChunksConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub chunks: ChunksFilter,

    /// Minimum total size in bytes of a new split chunk.
    #[serde(default = "default_min_size")]
    pub min_size: u64,

    /// Minimum number of chunks that must share a module.
    #[serde(default = "default_min_chunks")]
    pub min_chunks: usize,

    /// Maximum number of files loaded up front by one entry.
    #[serde(default = "default_max_requests")]
    pub max_initial_requests: usize,

    /// Maximum number of files loaded by one dynamic import.
    #[serde(default = "default_max_requests")]
    pub max_async_requests: usize,

    /// Above this size a group is split regardless of the other limits.
    #[serde(default = "default_enforce_size_threshold")]
    pub enforce_size_threshold: u64,

    #[serde(default = "default_cache_groups")]
    pub cache_groups: IndexMap<String, CacheGroupConfig>,
}

impl Default for SplitChunksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunks: ChunksFilter::default(),
            min_size: default_min_size(),
            min_chunks: default_min_chunks(),
            max_initial_requests: default_max_requests(),
            max_async_requests: default_max_requests(),
            enforce_size_threshold: default_enforce_size_threshold(),
            cache_groups: default_cache_groups(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheGroupConfig {
    /// Set to `false` to disable a default group.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Regex over the module path. Matches every module when absent.
    #[serde(default)]
    pub test: Option<String>,

    #[serde(default)]
    pub priority: i32,

    /// Overrides `split_chunks.min_chunks`.
    #[serde(default)]
    pub min_chunks: Option<usize>,

    /// Overrides `split_chunks.min_size`.
    #[serde(default)]
    pub min_size: Option<u64>,

    #[serde(default)]
    pub reuse_existing_chunk: bool,

    /// Split regardless of size and request limits.
    #[serde(default)]
    pub enforce: bool,

    /// Fixed name for the split chunk.
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for CacheGroupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            test: None,
            priority: 0,
            min_chunks: None,
            min_size: None,
            reuse_existing_chunk: false,
            enforce: false,
            name: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_size() -> u64 {
    20_000
}

fn default_min_chunks() -> usize {
    1
}

fn default_max_requests() -> usize {
    30
}

fn default_enforce_size_threshold() -> u64 {
    50_000
}

fn default_cache_groups() -> IndexMap<String, CacheGroupConfig> {
    let mut groups = IndexMap::new();
    groups.insert(
        "default_vendors".to_string(),
        CacheGroupConfig {
            test: Some(r"[\\/]node_modules[\\/]".to_string()),
            priority: -10,
            reuse_existing_chunk: true,
            ..CacheGroupConfig::default()
        },
    );
    groups.insert(
        "default".to_string(),
        CacheGroupConfig {
            min_chunks: Some(2),
            priority: -20,
            reuse_existing_chunk: true,
            ..CacheGroupConfig::default()
        },
    );
    groups
}
