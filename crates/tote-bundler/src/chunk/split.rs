//! `split_chunks`: move shared modules into chunks chosen by cache group.

use std::cmp::Reverse;

use indexmap::IndexMap;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use tote_config::{ConfigError, SplitChunksConfig};
use tote_graph::{ModuleGraph, ModuleId};

use super::{Chunk, ChunkGraph, ChunkIdx, ChunkKind, unique_name};

#[derive(Debug)]
struct CacheGroup {
    key: String,
    test: Option<Regex>,
    min_chunks: usize,
    min_size: u64,
    reuse_existing_chunk: bool,
    enforce: bool,
    name: Option<String>,
}

impl CacheGroup {
    fn matches(&self, module: &ModuleId, chunk_count: usize) -> bool {
        if chunk_count < self.min_chunks {
            return false;
        }
        match &self.test {
            Some(test) => test.is_match(&module.path_string().replace('\\', "/")),
            None => true,
        }
    }
}

/// Enabled groups, highest priority first. Ties keep configuration order.
fn compile_groups(options: &SplitChunksConfig) -> Result<Vec<CacheGroup>, ConfigError> {
    let mut groups: Vec<(i32, CacheGroup)> = Vec::new();
    for (key, group) in &options.cache_groups {
        if !group.enabled {
            continue;
        }
        let test = group
            .test
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|err| ConfigError::InvalidRegex {
                    field: format!("optimization.split_chunks.cache_groups.{key}.test"),
                    pattern: pattern.to_string(),
                    message: err.to_string(),
                })
            })
            .transpose()?;
        groups.push((
            group.priority,
            CacheGroup {
                key: key.clone(),
                test,
                min_chunks: group.min_chunks.unwrap_or(options.min_chunks),
                min_size: group.min_size.unwrap_or(options.min_size),
                reuse_existing_chunk: group.reuse_existing_chunk,
                enforce: group.enforce,
                name: group.name.clone(),
            },
        ));
    }
    groups.sort_by_key(|(priority, _)| Reverse(*priority));
    Ok(groups.into_iter().map(|(_, group)| group).collect())
}

struct Candidate {
    group: usize,
    chunks: Vec<ChunkIdx>,
    modules: Vec<ModuleId>,
    size: u64,
}

pub(super) fn split(
    graph: &ModuleGraph,
    chunk_graph: &mut ChunkGraph,
    extra: &mut [Vec<ChunkIdx>],
    options: &SplitChunksConfig,
) -> Result<(), ConfigError> {
    let groups = compile_groups(options)?;
    if groups.is_empty() {
        return Ok(());
    }

    let selected: Vec<bool> = chunk_graph
        .chunks
        .iter()
        .map(|c| match c.kind {
            ChunkKind::Entry => options.chunks.includes(true),
            ChunkKind::Async => options.chunks.includes(false),
            ChunkKind::Split => false,
        })
        .collect();

    let mut containing: FxHashMap<ModuleId, Vec<ChunkIdx>> = FxHashMap::default();
    for chunk in chunk_graph.chunks.iter().filter(|c| selected[c.idx]) {
        for module in &chunk.modules {
            containing.entry(module.clone()).or_default().push(chunk.idx);
        }
    }
    let mut modules: Vec<&ModuleId> = containing.keys().collect();
    modules.sort();

    let mut keyed: IndexMap<(usize, Vec<ChunkIdx>), Vec<ModuleId>> = IndexMap::new();
    for module in modules {
        let chunks = &containing[module];
        if let Some(group) = groups.iter().position(|g| g.matches(module, chunks.len())) {
            keyed
                .entry((group, chunks.clone()))
                .or_default()
                .push(module.clone());
        }
    }

    let mut candidates: Vec<Candidate> = keyed
        .into_iter()
        .map(|((group, chunks), modules)| {
            let size = modules
                .iter()
                .filter_map(|m| graph.module(m))
                .map(|m| m.output_size())
                .sum();
            Candidate {
                group,
                chunks,
                modules,
                size,
            }
        })
        .collect();
    candidates.sort_by(|a, b| {
        a.group
            .cmp(&b.group)
            .then_with(|| b.size.cmp(&a.size))
            .then_with(|| a.chunks.cmp(&b.chunks))
            .then_with(|| a.modules.cmp(&b.modules))
    });

    let mut taken: FxHashSet<String> = chunk_graph.chunks.iter().map(|c| c.name.clone()).collect();
    let mut named: FxHashMap<String, ChunkIdx> = FxHashMap::default();

    for candidate in candidates {
        let group = &groups[candidate.group];
        let enforce = group.enforce || candidate.size >= options.enforce_size_threshold;

        if !enforce && candidate.size < group.min_size {
            tracing::trace!(group = %group.key, size = candidate.size, "split candidate below min_size");
            continue;
        }
        if !enforce && exceeds_requests(chunk_graph, extra, &candidate.chunks, options) {
            tracing::debug!(group = %group.key, "split candidate exceeds request limits");
            continue;
        }

        let members: FxHashSet<&ModuleId> = candidate.modules.iter().collect();

        if group.reuse_existing_chunk {
            let reusable = candidate.chunks.iter().copied().find(|&idx| {
                let chunk = &chunk_graph.chunks[idx];
                chunk.kind != ChunkKind::Entry
                    && chunk.modules.len() == members.len()
                    && chunk.modules.iter().all(|m| members.contains(m))
            });
            if let Some(reused) = reusable {
                for &idx in &candidate.chunks {
                    if idx == reused {
                        continue;
                    }
                    chunk_graph.chunks[idx].modules.retain(|m| !members.contains(m));
                    extra[idx].push(reused);
                }
                tracing::debug!(group = %group.key, chunk = %chunk_graph.chunks[reused].name, "reused existing chunk");
                continue;
            }
        }

        // Module order follows the first chunk that had them.
        let ordered: Vec<ModuleId> = chunk_graph.chunks[candidate.chunks[0]]
            .modules
            .iter()
            .filter(|m| members.contains(m))
            .cloned()
            .collect();

        let target = match group.name.as_ref().and_then(|name| named.get(name).copied()) {
            Some(existing) => {
                chunk_graph.chunks[existing].modules.extend(ordered);
                existing
            }
            None => {
                let base = group.name.clone().unwrap_or_else(|| {
                    let names: Vec<&str> = candidate
                        .chunks
                        .iter()
                        .map(|&idx| chunk_graph.chunks[idx].name.as_str())
                        .collect();
                    format!("{}-{}", group.key, names.join("~"))
                });
                let name = unique_name(&base, &mut taken);
                let idx = chunk_graph.chunks.len();
                let mut chunk = Chunk::new(idx, name, ChunkKind::Split, ordered, Vec::new());
                chunk.cache_group = Some(group.key.clone());
                chunk_graph.chunks.push(chunk);
                if let Some(fixed) = &group.name {
                    named.insert(fixed.clone(), idx);
                }
                idx
            }
        };

        for &idx in &candidate.chunks {
            chunk_graph.chunks[idx].modules.retain(|m| !members.contains(m));
            if !extra[idx].contains(&target) {
                extra[idx].push(target);
            }
        }
        tracing::debug!(
            group = %group.key,
            chunk = %chunk_graph.chunks[target].name,
            modules = members.len(),
            size = candidate.size,
            "created split chunk"
        );
    }

    Ok(())
}

/// Whether one more split chunk would push any affected group past its limit.
fn exceeds_requests(
    chunk_graph: &ChunkGraph,
    extra: &[Vec<ChunkIdx>],
    chunks: &[ChunkIdx],
    options: &SplitChunksConfig,
) -> bool {
    chunks.iter().any(|&idx| {
        let limit = match chunk_graph.chunks[idx].kind {
            ChunkKind::Entry => options.max_initial_requests,
            _ => options.max_async_requests,
        };
        // The chunk itself, its split chunks so far, and the new one.
        extra[idx].len() + 2 > limit
    })
}
