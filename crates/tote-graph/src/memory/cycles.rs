//! Cycle detection.

use rustc_hash::FxHashMap as HashMap;

use super::graph::ModuleGraph;
use crate::module_id::ModuleId;

impl ModuleGraph {
    /// Strongly connected components with more than one module, plus
    /// modules that import themselves. Each cycle is sorted, and the list is
    /// sorted by its first element.
    ///
    /// Cycles are legal; the bundler logs them at debug level.
    pub fn find_cycles(&self) -> Vec<Vec<ModuleId>> {
        let inner = self.inner.read();
        let mut ids: Vec<&ModuleId> = inner.modules.keys().collect();
        ids.sort();

        let mut tarjan = Tarjan::default();
        for id in ids {
            if !tarjan.index.contains_key(id) {
                tarjan.visit(id, |node| {
                    inner
                        .dependencies
                        .get(node)
                        .map(|targets| targets.iter().filter(|t| inner.modules.contains_key(*t)).cloned().collect())
                        .unwrap_or_default()
                });
            }
        }

        let mut cycles: Vec<Vec<ModuleId>> = tarjan
            .components
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || inner
                        .dependencies
                        .get(&component[0])
                        .is_some_and(|targets| targets.contains(&component[0]))
            })
            .map(|mut component| {
                component.sort();
                component
            })
            .collect();
        cycles.sort();
        cycles
    }
}

#[derive(Default)]
struct Tarjan {
    counter: usize,
    index: HashMap<ModuleId, usize>,
    lowlink: HashMap<ModuleId, usize>,
    on_stack: HashMap<ModuleId, bool>,
    stack: Vec<ModuleId>,
    components: Vec<Vec<ModuleId>>,
}

impl Tarjan {
    /// Iterative Tarjan so deep import chains cannot overflow the stack.
    fn visit(&mut self, start: &ModuleId, edges: impl Fn(&ModuleId) -> Vec<ModuleId>) {
        let mut work: Vec<(ModuleId, Vec<ModuleId>, usize)> = Vec::new();
        self.open(start.clone());
        work.push((start.clone(), edges(start), 0));

        while let Some((node, children, next)) = work.last_mut() {
            if let Some(child) = children.get(*next).cloned() {
                *next += 1;
                if !self.index.contains_key(&child) {
                    self.open(child.clone());
                    let grandchildren = edges(&child);
                    work.push((child, grandchildren, 0));
                } else if self.on_stack.get(&child).copied().unwrap_or(false) {
                    let low = self.lowlink[&*node].min(self.index[&child]);
                    self.lowlink.insert(node.clone(), low);
                }
                continue;
            }

            let node = node.clone();
            work.pop();
            if let Some((parent, _, _)) = work.last() {
                let low = self.lowlink[parent].min(self.lowlink[&node]);
                self.lowlink.insert(parent.clone(), low);
            }
            if self.lowlink[&node] == self.index[&node] {
                let mut component = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.insert(member.clone(), false);
                    let done = member == node;
                    component.push(member);
                    if done {
                        break;
                    }
                }
                self.components.push(component);
            }
        }
    }

    fn open(&mut self, id: ModuleId) {
        self.index.insert(id.clone(), self.counter);
        self.lowlink.insert(id.clone(), self.counter);
        self.counter += 1;
        self.on_stack.insert(id.clone(), true);
        self.stack.push(id);
    }
}
