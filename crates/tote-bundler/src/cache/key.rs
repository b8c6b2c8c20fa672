//! Build fingerprint folded into every cache key.

use std::path::Path;

use path_clean::PathClean;
use tote_config::ToteConfig;
use tote_graph::{KeyHasher, Runtime};

/// BLAKE3 hex over the tool version, `cache.version`, the mode and the
/// contents of every `cache.build_dependencies` file (sorted by path).
///
/// A missing build dependency contributes its path only, so creating the
/// file later still changes the fingerprint.
pub async fn build_fingerprint(config: &ToteConfig, root: &Path, runtime: &dyn Runtime) -> String {
    let mut hasher = KeyHasher::new("build")
        .field(env!("CARGO_PKG_VERSION"))
        .field(config.cache.version.as_deref().unwrap_or(""))
        .field(config.mode.as_str());

    let mut dependencies: Vec<_> = config
        .cache
        .build_dependencies
        .iter()
        .map(|p| root.join(p).clean())
        .collect();
    dependencies.sort();
    dependencies.dedup();

    for path in dependencies {
        hasher = hasher.field(path.to_string_lossy().as_bytes());
        match runtime.read_file(&path).await {
            Ok(bytes) => hasher = hasher.field(blake3::hash(&bytes).as_bytes()),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "build dependency not readable");
                hasher = hasher.field("missing");
            }
        }
    }

    hasher.finish().as_hex().to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tote_config::Mode;
    use tote_graph::MemoryRuntime;

    use super::*;

    fn config_with_dependency() -> ToteConfig {
        let mut config = ToteConfig::default();
        config.cache.build_dependencies = vec![PathBuf::from("tote.toml")];
        config
    }

    #[tokio::test]
    async fn follows_build_dependency_contents() {
        let root = Path::new("/app");
        let config = config_with_dependency();
        let runtime = MemoryRuntime::new(root).with_file("/app/tote.toml", "a = 1");

        let first = build_fingerprint(&config, root, &runtime).await;
        assert_eq!(first, build_fingerprint(&config, root, &runtime).await);

        runtime.insert("/app/tote.toml", "a = 2");
        assert_ne!(first, build_fingerprint(&config, root, &runtime).await);
    }

    #[tokio::test]
    async fn follows_version_and_mode() {
        let root = Path::new("/app");
        let runtime = MemoryRuntime::new(root);
        let config = ToteConfig::default();
        let base = build_fingerprint(&config, root, &runtime).await;

        let mut versioned = config.clone();
        versioned.cache.version = Some("2".into());
        assert_ne!(base, build_fingerprint(&versioned, root, &runtime).await);

        let mut development = config.clone();
        development.mode = Mode::Development;
        assert_ne!(base, build_fingerprint(&development, root, &runtime).await);
    }

    #[tokio::test]
    async fn missing_dependency_still_counts() {
        let root = Path::new("/app");
        let runtime = MemoryRuntime::new(root);
        let without = build_fingerprint(&ToteConfig::default(), root, &runtime).await;
        let with_missing = build_fingerprint(&config_with_dependency(), root, &runtime).await;
        assert_ne!(without, with_missing);
    }
}
