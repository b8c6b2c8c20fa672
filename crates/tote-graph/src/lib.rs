//! Module graph construction for tote.
//!
//! The [`GraphBuilder`] walks imports breadth-first from the entry modules:
//! each file is read through a [`Runtime`], matched against the module rules,
//! transformed (or fetched from a [`TransformCache`]), scanned for
//! dependencies and resolved. The result is a [`ModuleGraph`].

pub mod builder;
pub mod cache;
pub mod error;
pub mod memory;
pub mod module;
pub mod module_id;
pub mod resolver;
pub mod rules;
pub mod runtime;
pub mod scan;
pub mod transform;

pub use builder::{BuiltGraph, GraphBuilder, GraphStats};
pub use cache::{CacheKey, KeyHasher, MemoryCache, NoopCache, TransformCache};
pub use error::{GraphError, Result};
pub use memory::ModuleGraph;
pub use module::{AssetMode, Dependency, DependencyKind, Module, ModuleKind, ScannedDependency};
pub use module_id::{ModuleId, ModuleIdError};
pub use resolver::{ResolveError, Resolver};
pub use rules::{MatchedRule, RuleSet};
pub use runtime::{FileMetadata, Runtime, RuntimeError, RuntimeResult};
pub use runtime::memory::MemoryRuntime;
pub use runtime::native::NativeRuntime;
pub use transform::{TransformError, TransformOutput};

#[cfg(test)]
mod tests;
