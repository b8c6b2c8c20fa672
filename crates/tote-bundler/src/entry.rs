//! Entry resolution: named requests to module ids.

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use rustc_hash::FxHashSet;
use serde::Serialize;
use tote_config::{ConfigError, EntryConfig, EntryRequest};
use tote_graph::{ModuleId, Resolver};

/// A resolved entry. Its chunk is named after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPoint {
    pub name: String,
    /// Modules in request order, without duplicates.
    pub modules: Vec<ModuleId>,
}

/// Resolve the configured entries against `cwd`.
pub async fn resolve_entries(
    entry: &EntryConfig,
    cwd: &Path,
    resolver: &Resolver,
) -> Result<Vec<EntryPoint>, ConfigError> {
    resolve_requests(&entry.requests(), cwd, resolver).await
}

/// Resolve already-named requests, e.g. from repeated `--entry` flags.
pub async fn resolve_requests(
    requests: &[EntryRequest],
    cwd: &Path,
    resolver: &Resolver,
) -> Result<Vec<EntryPoint>, ConfigError> {
    if requests.iter().all(|r| r.requests.iter().all(|s| s.trim().is_empty())) {
        return Err(ConfigError::NoEntries);
    }

    let mut names = FxHashSet::default();
    let mut entries = Vec::with_capacity(requests.len());

    for request in requests {
        if !names.insert(request.name.as_str()) {
            return Err(ConfigError::DuplicateEntryName {
                name: request.name.clone(),
            });
        }

        let mut modules: Vec<ModuleId> = Vec::with_capacity(request.requests.len());
        for specifier in &request.requests {
            let specifier = specifier.trim();
            if specifier.is_empty() {
                continue;
            }
            let id = resolve_one(specifier, cwd, resolver).await?;
            if !modules.contains(&id) {
                modules.push(id);
            }
        }
        if modules.is_empty() {
            return Err(ConfigError::NoEntries);
        }

        tracing::debug!(entry = %request.name, modules = modules.len(), "resolved entry");
        entries.push(EntryPoint {
            name: request.name.clone(),
            modules,
        });
    }

    Ok(entries)
}

/// `src/index.js` is read as a path first and as a package name second.
async fn resolve_one(specifier: &str, cwd: &Path, resolver: &Resolver) -> Result<ModuleId, ConfigError> {
    let looks_like_path = specifier.starts_with('.') || Path::new(specifier).is_absolute();
    if !looks_like_path {
        if let Ok(id) = resolver.resolve_in(&format!("./{specifier}"), cwd).await {
            return Ok(id);
        }
    }

    resolver
        .resolve_in(specifier, cwd)
        .await
        .map_err(|err| {
            tracing::debug!(%specifier, error = %err, "entry did not resolve");
            ConfigError::EntryNotFound {
                path: entry_path(specifier, cwd),
            }
        })
}

fn entry_path(specifier: &str, cwd: &Path) -> PathBuf {
    let path = Path::new(specifier);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path).clean()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use indexmap::IndexMap;
    use tote_config::{EntryValue, ResolveConfig};
    use tote_graph::MemoryRuntime;

    use super::*;

    fn resolver() -> Resolver {
        let runtime = MemoryRuntime::new("/app")
            .with_file("/app/src/index.js", "")
            .with_file("/app/src/admin.js", "")
            .with_file("/app/src/polyfills.js", "")
            .with_file("/app/node_modules/widget/index.js", "");
        Resolver::new(Arc::new(runtime), "/app", &ResolveConfig::default())
    }

    fn names(entries: &[EntryPoint]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[tokio::test]
    async fn string_entry_is_main() {
        let entries = resolve_entries(
            &EntryConfig::Single("./src/index.js".into()),
            Path::new("/app"),
            &resolver(),
        )
        .await
        .unwrap();
        assert_eq!(names(&entries), vec!["main"]);
        assert_eq!(entries[0].modules[0].as_path(), Path::new("/app/src/index.js"));
    }

    #[tokio::test]
    async fn array_entry_keeps_order_in_one_chunk() {
        let entries = resolve_entries(
            &EntryConfig::Multiple(vec!["./src/polyfills".into(), "./src/index".into()]),
            Path::new("/app"),
            &resolver(),
        )
        .await
        .unwrap();
        assert_eq!(names(&entries), vec!["main"]);
        let paths: Vec<_> = entries[0].modules.iter().map(|m| m.as_path().to_path_buf()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/app/src/polyfills.js"), PathBuf::from("/app/src/index.js")]
        );
    }

    #[tokio::test]
    async fn map_entry_names_follow_keys() {
        let mut map = IndexMap::new();
        map.insert("app".to_string(), EntryValue::Single("src/index.js".into()));
        map.insert("admin".to_string(), EntryValue::Multiple(vec!["./src/admin.js".into()]));
        let entries = resolve_entries(&EntryConfig::Named(map), Path::new("/app"), &resolver())
            .await
            .unwrap();
        assert_eq!(names(&entries), vec!["app", "admin"]);
    }

    #[tokio::test]
    async fn bare_request_falls_back_to_packages() {
        let entries = resolve_entries(&EntryConfig::Single("widget".into()), Path::new("/app"), &resolver())
            .await
            .unwrap();
        assert_eq!(
            entries[0].modules[0].as_path(),
            Path::new("/app/node_modules/widget/index.js")
        );
    }

    #[tokio::test]
    async fn errors() {
        let resolver = resolver();
        let cwd = Path::new("/app");

        let none = resolve_entries(&EntryConfig::default(), cwd, &resolver).await;
        assert!(matches!(none, Err(ConfigError::NoEntries)));

        let dup = resolve_requests(
            &[
                EntryRequest::new("main", vec!["./src/index.js".into()]),
                EntryRequest::new("main", vec!["./src/admin.js".into()]),
            ],
            cwd,
            &resolver,
        )
        .await;
        assert!(matches!(dup, Err(ConfigError::DuplicateEntryName { name }) if name == "main"));

        let missing = resolve_entries(&EntryConfig::Single("./src/nope.js".into()), cwd, &resolver).await;
        match missing {
            Err(ConfigError::EntryNotFound { path }) => assert_eq!(path, Path::new("/app/src/nope.js")),
            other => panic!("expected EntryNotFound, got {other:?}"),
        }
    }
}
