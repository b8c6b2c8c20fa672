//! Breadth-first graph construction.

use std::sync::Arc;

use rustc_hash::FxHashSet as HashSet;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cache::{CacheKey, KeyHasher, NoopCache, TransformCache};
use crate::error::GraphError;
use crate::memory::ModuleGraph;
use crate::module::Module;
use crate::module_id::ModuleId;
use crate::resolver::Resolver;
use crate::rules::RuleSet;
use crate::runtime::Runtime;
use crate::transform::{TransformOutput, transform_module};

const DEFAULT_MAX_PARALLEL: usize = 32;

/// Counters for one graph build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub modules: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

#[derive(Debug)]
pub struct BuiltGraph {
    pub graph: ModuleGraph,
    pub stats: GraphStats,
}

#[derive(Debug)]
struct Shared {
    runtime: Arc<dyn Runtime>,
    resolver: Arc<Resolver>,
    rules: Arc<RuleSet>,
    cache: Arc<dyn TransformCache>,
    /// Cache key namespace: caller fingerprint combined with the rule fingerprint.
    namespace: String,
}

/// Loads every module reachable from a set of entries.
///
/// Each breadth-first level is processed concurrently (bounded by
/// `max_parallel`), and results are merged in the order modules were
/// discovered, so the resulting graph does not depend on task scheduling.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    shared: Arc<Shared>,
    max_parallel: usize,
}

struct Loaded {
    module: Module,
    cache_hit: bool,
    /// Imports that failed to resolve. The module is still traversed so
    /// failures deeper in the graph are reported in the same build.
    unresolved: Vec<GraphError>,
}

impl GraphBuilder {
    pub fn new(runtime: Arc<dyn Runtime>, resolver: Arc<Resolver>, rules: Arc<RuleSet>) -> Self {
        let namespace = namespace_for("", &rules);
        Self {
            shared: Arc::new(Shared {
                runtime,
                resolver,
                rules,
                cache: Arc::new(NoopCache),
                namespace,
            }),
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    /// Use `cache` for transform results, with keys namespaced by `fingerprint`.
    pub fn with_cache(self, cache: Arc<dyn TransformCache>, fingerprint: &str) -> Self {
        let shared = Shared {
            runtime: self.shared.runtime.clone(),
            resolver: self.shared.resolver.clone(),
            rules: self.shared.rules.clone(),
            namespace: namespace_for(fingerprint, &self.shared.rules),
            cache,
        };
        Self {
            shared: Arc::new(shared),
            max_parallel: self.max_parallel,
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.shared.resolver
    }

    /// Build the graph reachable from `entries`.
    ///
    /// All read, transform and resolution failures are collected; if any
    /// occurred, they are returned together instead of a graph.
    pub async fn build(&self, entries: &[ModuleId]) -> Result<BuiltGraph, Vec<GraphError>> {
        let graph = ModuleGraph::new();
        let mut stats = GraphStats::default();
        let mut errors = Vec::new();

        let entry_set: HashSet<ModuleId> = entries.iter().cloned().collect();
        let mut seen: HashSet<ModuleId> = HashSet::default();
        let mut frontier: Vec<ModuleId> = entries
            .iter()
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut depth = 0usize;

        while !frontier.is_empty() {
            tracing::debug!(depth, modules = frontier.len(), "loading graph level");

            let mut tasks = JoinSet::new();
            for (index, id) in frontier.iter().cloned().enumerate() {
                let shared = self.shared.clone();
                let semaphore = semaphore.clone();
                let is_entry = entry_set.contains(&id);
                tasks.spawn(async move {
                    let result = match semaphore.acquire_owned().await {
                        Ok(_permit) => load_module(&shared, id, is_entry).await,
                        Err(err) => Err(vec![GraphError::Task(err.to_string())]),
                    };
                    (index, result)
                });
            }

            let mut results: Vec<Option<Result<Loaded, Vec<GraphError>>>> =
                (0..frontier.len()).map(|_| None).collect();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, result)) => results[index] = Some(result),
                    Err(err) => errors.push(GraphError::Task(err.to_string())),
                }
            }

            let mut next = Vec::new();
            for result in results.into_iter().flatten() {
                match result {
                    Ok(loaded) => {
                        if loaded.cache_hit {
                            stats.cache_hits += 1;
                        } else {
                            stats.cache_misses += 1;
                        }
                        for dep in &loaded.module.dependencies {
                            if seen.insert(dep.resolved.clone()) {
                                next.push(dep.resolved.clone());
                            }
                        }
                        errors.extend(loaded.unresolved);
                        graph.add_module(loaded.module);
                    }
                    Err(mut failures) => errors.append(&mut failures),
                }
            }

            frontier = next;
            depth += 1;
        }

        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "graph build failed");
            return Err(errors);
        }

        for entry in entries {
            graph.add_entry_point(entry.clone());
        }
        let cycles = graph.find_cycles();
        if !cycles.is_empty() {
            tracing::debug!(count = cycles.len(), "module graph contains import cycles");
        }

        stats.modules = graph.len();
        tracing::debug!(
            modules = stats.modules,
            cache_hits = stats.cache_hits,
            cache_misses = stats.cache_misses,
            "graph traversal finished"
        );
        Ok(BuiltGraph { graph, stats })
    }
}

fn namespace_for(fingerprint: &str, rules: &RuleSet) -> String {
    KeyHasher::new("namespace")
        .field(fingerprint)
        .field(rules.fingerprint())
        .finish()
        .as_hex()
        .to_string()
}

async fn load_module(shared: &Shared, id: ModuleId, is_entry: bool) -> Result<Loaded, Vec<GraphError>> {
    let path = id.as_path().to_path_buf();
    let bytes = shared
        .runtime
        .read_file(&path)
        .await
        .map_err(|source| vec![GraphError::Read { path: path.clone(), source }])?;

    let matched = shared.rules.match_path(&path);
    let kind = matched.kind(bytes.len() as u64);
    let content_hash = blake3::hash(&bytes).to_hex().to_string();
    let key = CacheKey::transform(&shared.namespace, &path, &content_hash);

    let (output, cache_hit) = match shared.cache.get(&key) {
        Some(output) => (output, true),
        None => {
            let output: TransformOutput = transform_module(kind, &matched.transforms, &path, &bytes)
                .map_err(|source| vec![GraphError::Transform { path: path.clone(), source }])?;
            shared.cache.put(&key, &output);
            (output, false)
        }
    };

    let mut builder = Module::builder(id, kind)
        .source(bytes)
        .output(output.code)
        .entry(is_entry)
        .asset_filename(matched.asset_filename);

    let mut unresolved = Vec::new();
    for dep in output.dependencies {
        match shared.resolver.resolve(&dep.specifier, Some(&path)).await {
            Ok(resolved) => builder = builder.dependency(dep.specifier, dep.kind, resolved),
            Err(source) => unresolved.push(GraphError::Unresolved {
                specifier: dep.specifier,
                importer: path.clone(),
                source,
            }),
        }
    }

    tracing::debug!(module = %path.display(), cache_hit, "loaded module");
    Ok(Loaded {
        module: builder.build(),
        cache_hit,
        unresolved,
    })
}
