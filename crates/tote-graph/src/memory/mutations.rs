//! Mutation methods for ModuleGraph.

use std::sync::Arc;

use rustc_hash::FxHashSet as HashSet;

use super::graph::{GraphInner, ModuleGraph};
use crate::module::Module;
use crate::module_id::ModuleId;

impl ModuleGraph {
    /// Insert a module, replacing any previous version, and record its edges.
    pub fn add_module(&self, module: Module) {
        let mut inner = self.inner.write();

        if let Some(previous) = inner.dependencies.remove(&module.id) {
            for target in previous {
                if let Some(set) = inner.dependents.get_mut(&target) {
                    set.remove(&module.id);
                }
            }
        }

        let mut targets = Vec::new();
        let mut seen = HashSet::default();
        for dep in &module.dependencies {
            if seen.insert(dep.resolved.clone()) {
                targets.push(dep.resolved.clone());
            }
        }
        for target in &targets {
            inner
                .dependents
                .entry(target.clone())
                .or_default()
                .insert(module.id.clone());
        }
        inner.dependencies.insert(module.id.clone(), targets);

        if module.is_entry && !inner.entry_points.contains(&module.id) {
            inner.entry_points.push(module.id.clone());
        }
        inner.modules.insert(module.id.clone(), Arc::new(module));
    }

    /// Mark a module as an entry point.
    pub fn add_entry_point(&self, id: ModuleId) {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.modules.get(&id) {
            if !existing.is_entry {
                let mut module = (**existing).clone();
                module.is_entry = true;
                inner.modules.insert(id.clone(), Arc::new(module));
            }
        }
        if !inner.entry_points.contains(&id) {
            inner.entry_points.push(id);
        }
    }

    /// Remove a module and every edge touching it.
    pub fn remove_module(&self, id: &ModuleId) -> Option<Arc<Module>> {
        let mut inner = self.inner.write();
        remove_locked(&mut inner, id)
    }

    /// Drop every module no entry point reaches. Returns the removed ids, sorted.
    pub fn retain_reachable(&self) -> Vec<ModuleId> {
        let reachable = self.reachable_from_entries();
        let mut inner = self.inner.write();
        let mut removed: Vec<ModuleId> = inner
            .modules
            .keys()
            .filter(|id| !reachable.contains(*id))
            .cloned()
            .collect();
        removed.sort();
        for id in &removed {
            remove_locked(&mut inner, id);
        }
        if !removed.is_empty() {
            tracing::debug!(count = removed.len(), "pruned unreachable modules");
        }
        removed
    }
}

fn remove_locked(inner: &mut GraphInner, id: &ModuleId) -> Option<Arc<Module>> {
    let module = inner.modules.remove(id)?;
    if let Some(targets) = inner.dependencies.remove(id) {
        for target in targets {
            if let Some(set) = inner.dependents.get_mut(&target) {
                set.remove(id);
            }
        }
    }
    if let Some(importers) = inner.dependents.remove(id) {
        for importer in importers {
            if let Some(targets) = inner.dependencies.get_mut(&importer) {
                targets.retain(|t| t != id);
            }
        }
    }
    inner.entry_points.retain(|e| e != id);
    Some(module)
}
