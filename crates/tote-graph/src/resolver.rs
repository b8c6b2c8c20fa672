//! Module request resolution.
//!
//! Order of attempts for a request made from `importer`:
//!
//! 1. aliases, longest prefix first;
//! 2. absolute paths and `./` / `../` requests against the importer's directory;
//! 3. bare specifiers in each `modules` directory, walking up from the importer.
//!
//! A candidate path resolves as a file (exact, then each extension appended),
//! then as a directory (`package.json` main fields, then `index` + extensions).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;
use serde_json::Value;
use thiserror::Error;
use tote_config::ResolveConfig;

use crate::module_id::{ModuleId, ModuleIdError};
use crate::runtime::{Runtime, RuntimeError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("module not found")]
    NotFound,

    #[error("invalid package.json at {}: {message}", path.display())]
    InvalidPackageJson { path: PathBuf, message: String },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    ModuleId(#[from] ModuleIdError),
}

#[derive(Debug)]
pub struct Resolver {
    runtime: Arc<dyn Runtime>,
    root: PathBuf,
    extensions: Vec<String>,
    /// Sorted by prefix length, longest first.
    aliases: Vec<(String, PathBuf)>,
    modules: Vec<PathBuf>,
    main_fields: Vec<String>,
}

impl Resolver {
    pub fn new(runtime: Arc<dyn Runtime>, root: impl Into<PathBuf>, config: &ResolveConfig) -> Self {
        let root: PathBuf = root.into();
        let mut aliases: Vec<(String, PathBuf)> = config
            .alias
            .iter()
            .map(|(prefix, target)| (prefix.clone(), root.join(target).clean()))
            .collect();
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Self {
            runtime,
            root,
            extensions: config.extensions.clone(),
            aliases,
            modules: config.modules.clone(),
            main_fields: config.main_fields.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `specifier` as written in `importer` (or from the project root
    /// when `importer` is `None`, as for entries).
    pub async fn resolve(
        &self,
        specifier: &str,
        importer: Option<&Path>,
    ) -> Result<ModuleId, ResolveError> {
        let base_dir = importer
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        self.resolve_in(specifier, &base_dir).await
    }

    /// Resolve `specifier` as if written in a module located in `base_dir`.
    pub async fn resolve_in(&self, specifier: &str, base_dir: &Path) -> Result<ModuleId, ResolveError> {
        let request = specifier.split(['?', '#']).next().unwrap_or(specifier);

        if let Some(aliased) = self.apply_alias(request) {
            return self.resolve_path(&aliased).await;
        }

        let as_path = Path::new(request);
        if as_path.is_absolute() {
            return self.resolve_path(as_path).await;
        }

        if is_relative(request) {
            return self.resolve_path(&base_dir.join(request).clean()).await;
        }

        self.resolve_bare(request, base_dir).await
    }

    fn apply_alias(&self, request: &str) -> Option<PathBuf> {
        self.aliases.iter().find_map(|(prefix, target)| {
            if request == prefix {
                Some(target.clone())
            } else {
                request
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_prefix('/'))
                    .map(|rest| target.join(rest).clean())
            }
        })
    }

    async fn resolve_bare(&self, request: &str, base_dir: &Path) -> Result<ModuleId, ResolveError> {
        for modules_dir in &self.modules {
            if modules_dir.is_absolute() {
                if let Some(found) = self.try_candidate(&modules_dir.join(request)).await? {
                    return Ok(found);
                }
                continue;
            }
            for ancestor in base_dir.ancestors() {
                let candidate = ancestor.join(modules_dir).join(request);
                if let Some(found) = self.try_candidate(&candidate).await? {
                    return Ok(found);
                }
            }
        }
        Err(ResolveError::NotFound)
    }

    async fn resolve_path(&self, path: &Path) -> Result<ModuleId, ResolveError> {
        self.try_candidate(path).await?.ok_or(ResolveError::NotFound)
    }

    async fn try_candidate(&self, path: &Path) -> Result<Option<ModuleId>, ResolveError> {
        if let Some(file) = self.try_file(path).await {
            return Ok(Some(ModuleId::new(file)?));
        }
        if self.runtime.is_dir(path).await {
            if let Some(file) = self.try_directory(path).await? {
                return Ok(Some(ModuleId::new(file)?));
            }
        }
        Ok(None)
    }

    async fn try_file(&self, path: &Path) -> Option<PathBuf> {
        if self.runtime.is_file(path).await {
            return Some(path.to_path_buf());
        }
        for ext in &self.extensions {
            let candidate = PathBuf::from(format!("{}{ext}", path.display()));
            if self.runtime.is_file(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    async fn try_directory(&self, dir: &Path) -> Result<Option<PathBuf>, ResolveError> {
        let manifest = dir.join("package.json");
        if self.runtime.is_file(&manifest).await {
            let text = self.runtime.read_to_string(&manifest).await?;
            let package: Value =
                serde_json::from_str(&text).map_err(|e| ResolveError::InvalidPackageJson {
                    path: manifest.clone(),
                    message: e.to_string(),
                })?;
            for field in &self.main_fields {
                let Some(main) = package.get(field).and_then(Value::as_str) else {
                    continue;
                };
                let target = dir.join(main).clean();
                if let Some(file) = self.try_file(&target).await {
                    return Ok(Some(file));
                }
                if let Some(file) = self.try_index(&target).await {
                    return Ok(Some(file));
                }
            }
        }
        Ok(self.try_index(dir).await)
    }

    async fn try_index(&self, dir: &Path) -> Option<PathBuf> {
        for ext in &self.extensions {
            let candidate = dir.join(format!("index{ext}"));
            if self.runtime.is_file(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }
}

fn is_relative(request: &str) -> bool {
    request == "."
        || request == ".."
        || request.starts_with("./")
        || request.starts_with("../")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::memory::MemoryRuntime;
    use indexmap::IndexMap;

    fn resolver(runtime: MemoryRuntime, config: ResolveConfig) -> Resolver {
        Resolver::new(Arc::new(runtime), "/project", &config)
    }

    fn project() -> MemoryRuntime {
        MemoryRuntime::new("/project")
            .with_file("src/index.js", "")
            .with_file("src/count.js", "")
            .with_file("src/data.json", "{}")
            .with_file("src/utils/index.js", "")
            .with_file("node_modules/lodash/package.json", r#"{ "main": "lodash.js" }"#)
            .with_file("node_modules/lodash/lodash.js", "")
            .with_file("node_modules/lodash/fp/map.js", "")
            .with_file("node_modules/esm-pkg/package.json", r#"{ "module": "dist/index.mjs", "main": "index.js" }"#)
            .with_file("node_modules/esm-pkg/dist/index.mjs", "")
            .with_file("node_modules/esm-pkg/index.js", "")
            .with_file("node_modules/@scope/pkg/index.js", "")
    }

    fn path(id: ModuleId) -> String {
        id.path_string().into_owned()
    }

    #[tokio::test]
    async fn relative_with_extension_probing() {
        let r = resolver(project(), ResolveConfig::default());
        let importer = Path::new("/project/src/index.js");
        assert_eq!(path(r.resolve("./count", Some(importer)).await.unwrap()), "/project/src/count.js");
        assert_eq!(path(r.resolve("./data", Some(importer)).await.unwrap()), "/project/src/data.json");
        assert_eq!(path(r.resolve("./utils", Some(importer)).await.unwrap()), "/project/src/utils/index.js");
        assert_eq!(path(r.resolve("../src/count.js", Some(importer)).await.unwrap()), "/project/src/count.js");
    }

    #[tokio::test]
    async fn entries_resolve_from_root() {
        let r = resolver(project(), ResolveConfig::default());
        assert_eq!(path(r.resolve("./src/index.js", None).await.unwrap()), "/project/src/index.js");
    }

    #[tokio::test]
    async fn bare_specifiers_use_main_fields_in_order() {
        let r = resolver(project(), ResolveConfig::default());
        let importer = Some(Path::new("/project/src/utils/index.js"));
        assert_eq!(path(r.resolve("lodash", importer).await.unwrap()), "/project/node_modules/lodash/lodash.js");
        assert_eq!(path(r.resolve("lodash/fp/map", importer).await.unwrap()), "/project/node_modules/lodash/fp/map.js");
        assert_eq!(path(r.resolve("esm-pkg", importer).await.unwrap()), "/project/node_modules/esm-pkg/dist/index.mjs");
        assert_eq!(path(r.resolve("@scope/pkg", importer).await.unwrap()), "/project/node_modules/@scope/pkg/index.js");

        let main_only = ResolveConfig {
            main_fields: vec!["main".into()],
            ..ResolveConfig::default()
        };
        let r = resolver(project(), main_only);
        assert_eq!(path(r.resolve("esm-pkg", importer).await.unwrap()), "/project/node_modules/esm-pkg/index.js");
    }

    #[tokio::test]
    async fn longest_alias_wins() {
        let mut alias = IndexMap::new();
        alias.insert("@".to_string(), PathBuf::from("src"));
        alias.insert("@utils".to_string(), PathBuf::from("src/utils"));
        let config = ResolveConfig {
            alias,
            ..ResolveConfig::default()
        };
        let r = resolver(project(), config);
        assert_eq!(path(r.resolve("@/count", None).await.unwrap()), "/project/src/count.js");
        assert_eq!(path(r.resolve("@utils", None).await.unwrap()), "/project/src/utils/index.js");
        // A scoped package is not an alias hit.
        assert_eq!(path(r.resolve("@scope/pkg", None).await.unwrap()), "/project/node_modules/@scope/pkg/index.js");
    }

    #[tokio::test]
    async fn missing_module_is_not_found() {
        let r = resolver(project(), ResolveConfig::default());
        let err = r.resolve("./nope", None).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound));
        let err = r.resolve("left-pad", None).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound));
    }

    #[tokio::test]
    async fn invalid_package_json_is_reported() {
        let runtime = project().with_file("node_modules/broken/package.json", "{ nope");
        let r = resolver(runtime, ResolveConfig::default());
        let err = r.resolve("broken", None).await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidPackageJson { .. }));
    }
}
