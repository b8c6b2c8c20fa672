use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::module_id::ModuleId;

/// What a module becomes in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleKind {
    Script,
    Json,
    Style,
    Asset(AssetMode),
}

impl ModuleKind {
    pub fn is_style(&self) -> bool {
        matches!(self, ModuleKind::Style)
    }

    pub fn is_asset(&self) -> bool {
        matches!(self, ModuleKind::Asset(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetMode {
    /// Emitted as a file; the module exports its URL.
    Resource,
    /// Embedded as a base64 data URL.
    Inline,
    /// The module exports the file's text.
    Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    /// `import … from`, `import '…'`, `export … from`
    Static,
    /// `import('…')`
    Dynamic,
    /// `require('…')`
    Require,
    /// CSS `@import`
    StyleImport,
    /// CSS `url(…)`
    Url,
}

impl DependencyKind {
    /// Whether the dependency must be loaded together with its importer.
    pub fn is_eager(&self) -> bool {
        !matches!(self, DependencyKind::Dynamic)
    }
}

/// A dependency as written in the source, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScannedDependency {
    pub specifier: String,
    pub kind: DependencyKind,
}

/// A resolved dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub specifier: String,
    pub kind: DependencyKind,
    pub resolved: ModuleId,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    pub kind: ModuleKind,
    /// Original file bytes.
    pub source: Arc<[u8]>,
    /// Dependencies in source order. A specifier appears once per occurrence.
    pub dependencies: Vec<Dependency>,
    /// Transform output: script code, compiled CSS, normalized JSON, or asset text.
    pub output: Arc<str>,
    /// BLAKE3 hex digest of `source`.
    pub content_hash: String,
    pub is_entry: bool,
    /// Filename template from the matching rule, for emitted assets.
    pub asset_filename: Option<String>,
}

impl Module {
    pub fn builder(id: ModuleId, kind: ModuleKind) -> ModuleBuilder {
        ModuleBuilder {
            module: Module {
                id,
                kind,
                source: Arc::from(Vec::new()),
                dependencies: Vec::new(),
                output: Arc::from(""),
                content_hash: String::new(),
                is_entry: false,
                asset_filename: None,
            },
        }
    }

    /// Size of the original source in bytes.
    pub fn size(&self) -> u64 {
        self.source.len() as u64
    }

    /// Size the module contributes to a chunk. Used by chunk splitting.
    pub fn output_size(&self) -> u64 {
        match self.kind {
            ModuleKind::Asset(AssetMode::Resource) => 0,
            _ => self.output.len().max(self.source.len()) as u64,
        }
    }

    /// Resolved targets of dependencies that load with this module.
    pub fn eager_dependencies(&self) -> impl Iterator<Item = &ModuleId> {
        self.dependencies
            .iter()
            .filter(|d| d.kind.is_eager())
            .map(|d| &d.resolved)
    }

    pub fn dynamic_dependencies(&self) -> impl Iterator<Item = &ModuleId> {
        self.dependencies
            .iter()
            .filter(|d| d.kind == DependencyKind::Dynamic)
            .map(|d| &d.resolved)
    }

    /// Resolved target for a specifier written in this module.
    pub fn resolved(&self, specifier: &str) -> Option<&ModuleId> {
        self.dependencies
            .iter()
            .find(|d| d.specifier == specifier)
            .map(|d| &d.resolved)
    }
}

pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn source(mut self, source: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = source.into();
        self.module.content_hash = blake3::hash(&bytes).to_hex().to_string();
        self.module.source = Arc::from(bytes);
        self
    }

    pub fn output(mut self, output: impl Into<String>) -> Self {
        self.module.output = Arc::from(output.into());
        self
    }

    pub fn dependency(mut self, specifier: impl Into<String>, kind: DependencyKind, resolved: ModuleId) -> Self {
        self.module.dependencies.push(Dependency {
            specifier: specifier.into(),
            kind,
            resolved,
        });
        self
    }

    pub fn entry(mut self, is_entry: bool) -> Self {
        self.module.is_entry = is_entry;
        self
    }

    pub fn asset_filename(mut self, template: Option<String>) -> Self {
        self.module.asset_filename = template;
        self
    }

    pub fn build(self) -> Module {
        self.module
    }
}
