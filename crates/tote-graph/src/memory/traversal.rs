//! Graph traversal.

use std::collections::VecDeque;

use rustc_hash::FxHashSet as HashSet;

use super::graph::ModuleGraph;
use crate::module_id::ModuleId;

impl ModuleGraph {
    /// Every module reachable from `id` over any edge, excluding `id` itself
    /// unless it lies on a cycle. Breadth-first order.
    pub fn transitive_dependencies(&self, id: &ModuleId) -> Vec<ModuleId> {
        let inner = self.inner.read();
        let mut seen = HashSet::default();
        let mut order = Vec::new();
        let mut queue: VecDeque<&ModuleId> = VecDeque::new();

        if let Some(targets) = inner.dependencies.get(id) {
            queue.extend(targets.iter());
        }
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            order.push(current.clone());
            if let Some(targets) = inner.dependencies.get(current) {
                queue.extend(targets.iter().filter(|t| !seen.contains(*t)));
            }
        }
        order
    }

    /// Modules reachable from any entry point, entries included.
    pub fn reachable_from_entries(&self) -> HashSet<ModuleId> {
        let entries = self.entry_points();
        let mut reachable: HashSet<ModuleId> = HashSet::default();
        for entry in entries {
            if !self.contains(&entry) {
                continue;
            }
            reachable.insert(entry.clone());
            reachable.extend(self.transitive_dependencies(&entry));
        }
        reachable
    }

    /// Dependencies-first order of the modules `roots` load eagerly.
    ///
    /// Dynamic imports are not followed; they load in their own chunk. Among
    /// siblings, source order is kept, so the result matches the order in
    /// which a module system would evaluate them.
    pub fn execution_order(&self, roots: &[ModuleId]) -> Vec<ModuleId> {
        let inner = self.inner.read();
        let mut visited: HashSet<ModuleId> = HashSet::default();
        let mut order = Vec::new();

        for root in roots {
            if visited.contains(root) || !inner.modules.contains_key(root) {
                continue;
            }
            // Iterative post-order DFS: (node, index of next child to visit).
            let mut stack: Vec<(ModuleId, usize)> = vec![(root.clone(), 0)];
            visited.insert(root.clone());
            while let Some((node, next)) = stack.pop() {
                let children: Vec<&ModuleId> = inner
                    .modules
                    .get(&node)
                    .map(|m| m.eager_dependencies().collect())
                    .unwrap_or_default();
                let mut advanced = false;
                for (offset, child) in children.iter().enumerate().skip(next) {
                    if visited.contains(*child) || !inner.modules.contains_key(*child) {
                        continue;
                    }
                    visited.insert((*child).clone());
                    stack.push((node.clone(), offset + 1));
                    stack.push(((*child).clone(), 0));
                    advanced = true;
                    break;
                }
                if !advanced {
                    order.push(node);
                }
            }
        }
        order
    }
}
