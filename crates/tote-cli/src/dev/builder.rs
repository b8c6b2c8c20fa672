//! Rebuilds for the dev server.
//!
//! Builds stay in memory and share one transform cache, so a rebuild only
//! re-transforms the modules whose contents changed.

use std::sync::Arc;
use std::time::Instant;

use tote_bundler::{BuildOptions, BuildOutput, PersistentCache};
use tote_config::CacheType;
use tote_graph::{MemoryCache, TransformCache};

use crate::config::LoadedConfig;
use crate::dev::BundleCache;
use crate::error::Result;

/// Result of one dev build.
pub struct DevBuild {
    pub duration_ms: u64,
    pub output: BuildOutput,
    pub cache: BundleCache,
}

pub struct DevBuilder {
    loaded: LoadedConfig,
    transforms: Arc<dyn TransformCache>,
}

impl DevBuilder {
    pub fn new(loaded: LoadedConfig) -> Self {
        let transforms = open_transform_cache(&loaded);
        Self { loaded, transforms }
    }

    pub fn loaded(&self) -> &LoadedConfig {
        &self.loaded
    }

    /// Build into memory and index the files for serving.
    pub async fn build(&self) -> Result<DevBuild> {
        let start = Instant::now();
        let options = BuildOptions::new(&self.loaded.root, self.loaded.config.clone())
            .with_entries(self.loaded.entries.clone())
            .with_cache(self.transforms.clone());
        let output = tote_bundler::build(&options).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let cache = BundleCache::from_output(&output, &self.loaded.config.output.public_path);
        tracing::debug!(
            files = cache.len(),
            cache_hits = output.stats.cache_hits,
            cache_misses = output.stats.cache_misses,
            duration_ms,
            "dev build finished"
        );
        Ok(DevBuild {
            duration_ms,
            output,
            cache,
        })
    }
}

/// One cache for the whole session. The filesystem store is opened once
/// since it holds a lock on its database.
fn open_transform_cache(loaded: &LoadedConfig) -> Arc<dyn TransformCache> {
    let cache = &loaded.config.cache;
    if cache.cache_type == CacheType::Filesystem {
        let dir = loaded.root.join(&cache.cache_directory);
        match PersistentCache::open(&dir) {
            Ok(store) => return Arc::new(store),
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "persistent cache unavailable, using memory");
            }
        }
    }
    Arc::new(MemoryCache::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tote_config::{EntryConfig, ToteConfig};

    fn project(dir: &std::path::Path) -> LoadedConfig {
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("src/index.js"), "import { two } from './two';\nconsole.log(two);\n").unwrap();
        fs::write(dir.join("src/two.js"), "export const two = 2;\n").unwrap();
        LoadedConfig {
            root: dir.to_path_buf(),
            file: None,
            config: ToteConfig {
                entry: EntryConfig::Single("./src/index.js".into()),
                ..ToteConfig::default()
            },
            entries: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_rebuild_reuses_transform_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let builder = DevBuilder::new(project(tmp.path()));

        let first = builder.build().await.unwrap();
        assert_eq!(first.output.stats.cache_hits, 0);
        assert!(!first.cache.is_empty());

        fs::write(tmp.path().join("src/two.js"), "export const two = 22;\n").unwrap();
        let second = builder.build().await.unwrap();
        assert_eq!(second.output.stats.cache_hits, 1);
        assert_eq!(second.output.stats.cache_misses, 1);
    }
}
