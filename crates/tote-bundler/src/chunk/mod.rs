//! Chunks: the unit of output scripts and stylesheets.
//!
//! [`build_chunks`] partitions a module graph in three passes:
//!
//! 1. one entry chunk per entry, holding everything the entry loads eagerly;
//! 2. one async chunk per `import()` target, minus the modules every parent
//!    chunk group already guarantees;
//! 3. `split_chunks`: modules shared by several selected chunks move into
//!    split chunks chosen by cache group.
//!
//! Every entry and async chunk ends up with a chunk group: the ordered list
//! of chunks to load (split chunks first, then itself).

mod assign;
mod split;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tote_config::{ConfigError, SplitChunksConfig};
use tote_graph::{ModuleGraph, ModuleId};

use crate::entry::EntryPoint;

/// Index of a chunk in its [`ChunkGraph`]; rendered as `[id]`.
pub type ChunkIdx = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Entry,
    Async,
    Split,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub idx: ChunkIdx,
    pub name: String,
    pub kind: ChunkKind,
    /// Modules in execution order.
    pub modules: Vec<ModuleId>,
    /// Modules run once the group is loaded: the entry modules, or the
    /// `import()` target. Empty for split chunks.
    pub roots: Vec<ModuleId>,
    /// Chunks to load, in order, before the roots run. Ends with this chunk
    /// unless it has no modules of its own. Empty for split chunks.
    pub group: Vec<ChunkIdx>,
    /// Async chunks that modules of this chunk's group may `import()`.
    pub async_children: Vec<ChunkIdx>,
    /// Cache group that produced a split chunk.
    pub cache_group: Option<String>,
}

impl Chunk {
    fn new(idx: ChunkIdx, name: String, kind: ChunkKind, modules: Vec<ModuleId>, roots: Vec<ModuleId>) -> Self {
        Self {
            idx,
            name,
            kind,
            modules,
            roots,
            group: Vec::new(),
            async_children: Vec::new(),
            cache_group: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Entry chunks always produce a file because they carry the runtime.
    pub fn has_file(&self) -> bool {
        self.kind == ChunkKind::Entry || !self.modules.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChunkGraph {
    chunks: Vec<Chunk>,
    async_targets: FxHashMap<ModuleId, ChunkIdx>,
}

impl ChunkGraph {
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, idx: ChunkIdx) -> &Chunk {
        &self.chunks[idx]
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.name == name)
    }

    pub fn entry_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(|c| c.kind == ChunkKind::Entry)
    }

    /// The async chunk created for an `import()` of `target`.
    pub fn async_chunk_for(&self, target: &ModuleId) -> Option<ChunkIdx> {
        self.async_targets.get(target).copied()
    }

    pub fn chunks_containing(&self, module: &ModuleId) -> Vec<ChunkIdx> {
        self.chunks
            .iter()
            .filter(|c| c.modules.contains(module))
            .map(|c| c.idx)
            .collect()
    }

    /// Every module loaded by a chunk group.
    pub fn group_modules(&self, idx: ChunkIdx) -> FxHashSet<ModuleId> {
        self.chunks[idx]
            .group
            .iter()
            .flat_map(|&member| self.chunks[member].modules.iter().cloned())
            .collect()
    }

    /// Async chunks reachable from `idx` through nested `import()`s,
    /// in discovery order.
    pub fn reachable_async(&self, idx: ChunkIdx) -> Vec<ChunkIdx> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack: Vec<ChunkIdx> = self.chunks[idx].async_children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if next == idx || !seen.insert(next) {
                continue;
            }
            order.push(next);
            stack.extend(self.chunks[next].async_children.iter().rev().copied());
        }
        order
    }
}

/// Partition `graph` into chunks.
///
/// Fails only when a cache group `test` is not a valid regular expression.
pub fn build_chunks(
    graph: &ModuleGraph,
    entries: &[EntryPoint],
    options: &SplitChunksConfig,
) -> Result<ChunkGraph, ConfigError> {
    let mut chunk_graph = assign::assign(graph, entries);
    let mut extra: Vec<Vec<ChunkIdx>> = vec![Vec::new(); chunk_graph.chunks.len()];

    if options.enabled {
        split::split(graph, &mut chunk_graph, &mut extra, options)?;
    }

    for idx in 0..chunk_graph.chunks.len() {
        if chunk_graph.chunks[idx].kind == ChunkKind::Split {
            continue;
        }
        let mut group: Vec<ChunkIdx> = Vec::new();
        for &member in extra.get(idx).map(Vec::as_slice).unwrap_or_default() {
            if !group.contains(&member) && chunk_graph.chunks[member].has_file() {
                group.push(member);
            }
        }
        if chunk_graph.chunks[idx].has_file() {
            group.push(idx);
        }
        chunk_graph.chunks[idx].group = group;
    }

    tracing::debug!(
        chunks = chunk_graph.chunks.len(),
        entries = entries.len(),
        "chunk graph built"
    );
    Ok(chunk_graph)
}

/// Make `name` unique among `taken` by appending `-2`, `-3`, ...
fn unique_name(name: &str, taken: &mut FxHashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{name}-{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_names_get_numbered() {
        let mut taken = FxHashSet::default();
        assert_eq!(unique_name("index", &mut taken), "index");
        assert_eq!(unique_name("index", &mut taken), "index-2");
        assert_eq!(unique_name("index", &mut taken), "index-3");
        assert_eq!(unique_name("lazy", &mut taken), "lazy");
    }
}
