use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::module::Module;
use crate::module_id::ModuleId;

/// Graph storage shared by all clones of a [`ModuleGraph`].
#[derive(Debug, Default)]
pub(super) struct GraphInner {
    pub(super) modules: HashMap<ModuleId, Arc<Module>>,
    /// Forward edges in first-occurrence order, without duplicates.
    pub(super) dependencies: HashMap<ModuleId, Vec<ModuleId>>,
    pub(super) dependents: HashMap<ModuleId, HashSet<ModuleId>>,
    /// Entry modules in the order they were registered.
    pub(super) entry_points: Vec<ModuleId>,
}

/// Directed graph of modules keyed by [`ModuleId`].
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    pub(super) inner: Arc<RwLock<GraphInner>>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from modules; edges come from each module's dependencies.
    pub fn from_modules<I>(modules: I) -> Self
    where
        I: IntoIterator<Item = Module>,
    {
        let graph = Self::new();
        for module in modules {
            graph.add_module(module);
        }
        graph
    }
}
