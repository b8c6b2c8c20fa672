//! Entry and async chunk assignment.

use rustc_hash::{FxHashMap, FxHashSet};
use tote_graph::{ModuleGraph, ModuleId};

use super::{Chunk, ChunkGraph, ChunkIdx, ChunkKind, unique_name};
use crate::entry::EntryPoint;

pub(super) fn assign(graph: &ModuleGraph, entries: &[EntryPoint]) -> ChunkGraph {
    let mut taken: FxHashSet<String> = entries.iter().map(|e| e.name.clone()).collect();
    let mut chunks: Vec<Chunk> = Vec::new();
    // Eager closure of each chunk before anything is subtracted.
    let mut full: Vec<Vec<ModuleId>> = Vec::new();
    let mut parents: Vec<Vec<ChunkIdx>> = Vec::new();
    let mut async_targets: FxHashMap<ModuleId, ChunkIdx> = FxHashMap::default();

    for entry in entries {
        let idx = chunks.len();
        let modules = graph.execution_order(&entry.modules);
        chunks.push(Chunk::new(
            idx,
            entry.name.clone(),
            ChunkKind::Entry,
            modules.clone(),
            entry.modules.clone(),
        ));
        full.push(modules);
        parents.push(Vec::new());
    }

    // Breadth-first over chunks: every dynamic import found in a chunk's
    // closure makes (or reuses) the target's async chunk.
    let mut cursor = 0;
    while cursor < chunks.len() {
        let current = cursor;
        cursor += 1;

        let mut children = Vec::new();
        for module_id in full[current].clone() {
            let Some(module) = graph.module(&module_id) else {
                continue;
            };
            for target in module.dynamic_dependencies() {
                let idx = match async_targets.get(target) {
                    Some(&idx) => idx,
                    None => {
                        let idx = chunks.len();
                        let name = unique_name(&target.file_stem(), &mut taken);
                        let modules = graph.execution_order(std::slice::from_ref(target));
                        chunks.push(Chunk::new(
                            idx,
                            name,
                            ChunkKind::Async,
                            modules.clone(),
                            vec![target.clone()],
                        ));
                        full.push(modules);
                        parents.push(Vec::new());
                        async_targets.insert(target.clone(), idx);
                        tracing::debug!(chunk = %chunks[idx].name, "created async chunk");
                        idx
                    }
                };
                if idx != current && !parents[idx].contains(&current) {
                    parents[idx].push(current);
                }
                if !children.contains(&idx) {
                    children.push(idx);
                }
            }
        }
        chunks[current].async_children = children;
    }

    let available = available_modules(&chunks, &full, &parents);
    for (idx, chunk) in chunks.iter_mut().enumerate() {
        if chunk.kind != ChunkKind::Async {
            continue;
        }
        if let Some(Some(available)) = available.get(idx) {
            chunk.modules.retain(|m| !available.contains(m));
        }
    }

    ChunkGraph {
        chunks,
        async_targets,
    }
}

/// For each async chunk, the modules guaranteed to be loaded whichever parent
/// triggers it: the intersection over parents of the parent's closure plus
/// what is available to the parent. Solved as a decreasing fixed point where
/// `None` stands for "every module".
fn available_modules(
    chunks: &[Chunk],
    full: &[Vec<ModuleId>],
    parents: &[Vec<ChunkIdx>],
) -> Vec<Option<FxHashSet<ModuleId>>> {
    let mut available: Vec<Option<FxHashSet<ModuleId>>> = chunks
        .iter()
        .map(|c| match c.kind {
            ChunkKind::Entry => Some(FxHashSet::default()),
            _ => None,
        })
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for idx in 0..chunks.len() {
            if chunks[idx].kind != ChunkKind::Async {
                continue;
            }
            let mut next: Option<FxHashSet<ModuleId>> = None;
            for &parent in &parents[idx] {
                let Some(parent_available) = &available[parent] else {
                    continue;
                };
                let mut offered: FxHashSet<ModuleId> = parent_available.clone();
                offered.extend(full[parent].iter().cloned());
                next = Some(match next {
                    None => offered,
                    Some(current) => current.intersection(&offered).cloned().collect(),
                });
            }
            if next.is_some() && next != available[idx] {
                available[idx] = next;
                changed = true;
            }
        }
    }
    available
}
