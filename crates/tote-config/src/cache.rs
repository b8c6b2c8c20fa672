use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where transform results are kept between builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    /// In-process only. Survives rebuilds in `tote dev`.
    #[default]
    Memory,
    /// On-disk store under `cache_directory`.
    Filesystem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default, rename = "type")]
    pub cache_type: CacheType,

    #[serde(default = "default_cache_directory")]
    pub cache_directory: PathBuf,

    /// Files whose contents invalidate every cached record when they change,
    /// typically the config file itself.
    #[serde(default)]
    pub build_dependencies: Vec<PathBuf>,

    /// Free-form string folded into every cache key.
    #[serde(default)]
    pub version: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheType::default(),
            cache_directory: default_cache_directory(),
            build_dependencies: Vec::new(),
            version: None,
        }
    }
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from("node_modules/.cache/tote")
}
