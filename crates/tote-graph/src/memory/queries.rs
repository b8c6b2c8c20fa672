//! Read-only lookups.

use std::sync::Arc;

use super::graph::ModuleGraph;
use crate::module::Module;
use crate::module_id::ModuleId;

impl ModuleGraph {
    pub fn module(&self, id: &ModuleId) -> Option<Arc<Module>> {
        self.inner.read().modules.get(id).cloned()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.inner.read().modules.contains_key(id)
    }

    /// All modules, sorted by id.
    pub fn modules(&self) -> Vec<Arc<Module>> {
        let mut modules: Vec<Arc<Module>> = self.inner.read().modules.values().cloned().collect();
        modules.sort_by(|a, b| a.id.cmp(&b.id));
        modules
    }

    pub fn len(&self) -> usize {
        self.inner.read().modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().modules.is_empty()
    }

    pub fn entry_points(&self) -> Vec<ModuleId> {
        self.inner.read().entry_points.clone()
    }

    /// Direct dependencies in source order.
    pub fn dependencies(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.inner
            .read()
            .dependencies
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Direct importers, sorted.
    pub fn dependents(&self, id: &ModuleId) -> Vec<ModuleId> {
        let mut dependents: Vec<ModuleId> = self
            .inner
            .read()
            .dependents
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        dependents.sort();
        dependents
    }

    /// Total source bytes across all modules.
    pub fn total_size(&self) -> u64 {
        self.inner.read().modules.values().map(|m| m.size()).sum()
    }
}
