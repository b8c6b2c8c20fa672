//! The build pipeline: config to output files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use path_clean::PathClean;
use serde::Serialize;
use tote_config::{CacheType, EntryConfig, EntryRequest, HintLevel, PluginsExt, ToteConfig, validate_schema};
use tote_graph::{GraphBuilder, MemoryCache, NativeRuntime, NoopCache, Resolver, RuleSet, Runtime, TransformCache};

use crate::cache::{PersistentCache, build_fingerprint};
use crate::chunk::build_chunks;
use crate::diagnostics::Diagnostic;
use crate::emit::{EmitContext, emit};
use crate::entry::resolve_entries;
use crate::minify::Minifier;
use crate::output::BuildOutput;
use crate::performance::{self, Entrypoint};
use crate::plugins::Linter;
use crate::{Error, Result};

/// Inputs to [`build`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Project root. Relative paths in the config resolve against it.
    pub root: PathBuf,
    pub config: ToteConfig,
    /// Replaces `config.entry`, e.g. from `--entry` flags.
    pub entries: Option<Vec<EntryRequest>>,
    pub runtime: Arc<dyn Runtime>,
    /// Transform cache to use instead of the one `config.cache` selects.
    /// The dev server passes one in so rebuilds share it.
    pub cache: Option<Arc<dyn TransformCache>>,
    /// Disable caching entirely.
    pub no_cache: bool,
}

impl BuildOptions {
    pub fn new(root: impl Into<PathBuf>, config: ToteConfig) -> Self {
        Self {
            root: root.into(),
            config,
            entries: None,
            runtime: Arc::new(NativeRuntime::new()),
            cache: None,
            no_cache: false,
        }
    }

    pub fn with_entries(mut self, entries: Vec<EntryRequest>) -> Self {
        if !entries.is_empty() {
            self.entries = Some(entries);
        }
        self
    }

    pub fn with_runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn TransformCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }
}

/// Counters for one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub modules: usize,
    pub chunks: usize,
    pub files: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub minify_cache_hits: u64,
    pub minify_cache_misses: u64,
    pub duration_ms: u64,
}

/// Run a complete build and return the files in memory.
///
/// Nothing is written; see [`BuildOutput::write_to`].
pub async fn build(options: &BuildOptions) -> Result<BuildOutput> {
    let started = Instant::now();
    let runtime = options.runtime.clone();
    let root = project_root(&options.root, runtime.as_ref());

    let mut config = options.config.clone();
    if let Some(entries) = &options.entries {
        config.entry = EntryConfig::from_requests(entries)?;
    }
    validate_schema(&config)?;
    tracing::info!(mode = %config.mode, root = %root.display(), "build started");

    let rules = Arc::new(RuleSet::compile(&config.module.effective_rules())?);
    let resolver = Arc::new(Resolver::new(runtime.clone(), &root, &config.resolve));
    let linter = config.plugins.lint().map(Linter::new).transpose()?;

    let entries = resolve_entries(&config.entry, &root, &resolver).await?;
    let fingerprint = build_fingerprint(&config, &root, runtime.as_ref()).await;
    let cache = select_cache(options, &config, &root);

    let roots: Vec<_> = entries.iter().flat_map(|e| e.modules.iter().cloned()).collect();
    let built = GraphBuilder::new(runtime.clone(), resolver, rules)
        .with_cache(cache.clone(), &fingerprint)
        .build(&roots)
        .await
        .map_err(Error::Graph)?;
    let graph = built.graph;
    let pruned = graph.retain_reachable();
    tracing::info!(
        modules = graph.len(),
        pruned = pruned.len(),
        cache_hits = built.stats.cache_hits,
        cache_misses = built.stats.cache_misses,
        "module graph built"
    );

    let mut warnings: Vec<Diagnostic> = Vec::new();
    if let Some(linter) = &linter {
        let (errors, rest): (Vec<_>, Vec<_>) = linter
            .check_graph(&graph, &root)
            .into_iter()
            .partition(Diagnostic::is_error);
        for warning in &rest {
            tracing::warn!(code = warning.code(), "{warning}");
        }
        if !errors.is_empty() {
            return Err(Error::Lint(errors));
        }
        warnings.extend(rest);
    }

    let chunks = build_chunks(&graph, &entries, &config.optimization.split_chunks)?;
    tracing::info!(chunks = chunks.len(), "chunks assigned");

    let minimize = config.minimize();
    let minifier = Minifier::new(cache.clone(), fingerprint.clone(), config.optimization.parallel);
    let emitted = emit(EmitContext {
        config: &config,
        root: &root,
        graph: &graph,
        chunks: &chunks,
        runtime: runtime.as_ref(),
        minifier: &minifier,
        minimize,
        fingerprint: &fingerprint,
    })
    .await?;

    let level = config.performance_hints();
    if level != HintLevel::Off {
        let entrypoints: Vec<Entrypoint<'_>> = emitted
            .entrypoints
            .iter()
            .map(|(name, files)| Entrypoint {
                name,
                files: files.iter().map(String::as_str).collect(),
            })
            .collect();
        let found = performance::check(&config.performance, level, &emitted.files, &entrypoints);
        if level == HintLevel::Error && !found.is_empty() {
            return Err(Error::Performance(found));
        }
        warnings.extend(found);
    }

    let (minify_cache_hits, minify_cache_misses) = minifier.counters();
    let stats = BuildStats {
        modules: graph.len(),
        chunks: emitted.chunks.len(),
        files: emitted.files.len(),
        cache_hits: built.stats.cache_hits,
        cache_misses: built.stats.cache_misses,
        minify_cache_hits,
        minify_cache_misses,
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    tracing::info!(
        files = stats.files,
        warnings = warnings.len(),
        duration_ms = stats.duration_ms,
        hash = %emitted.hash,
        "build finished"
    );

    Ok(BuildOutput {
        files: emitted.files,
        entrypoints: emitted.entrypoints,
        chunks: emitted.chunks,
        warnings,
        stats,
        hash: emitted.hash,
    })
}

fn project_root(root: &Path, runtime: &dyn Runtime) -> PathBuf {
    if root.is_absolute() {
        return root.to_path_buf().clean();
    }
    match runtime.get_cwd() {
        Ok(cwd) => cwd.join(root).clean(),
        Err(_) => root.to_path_buf().clean(),
    }
}

/// An explicit cache wins, then `--no-cache`, then `config.cache`.
/// A persistent cache that cannot be opened degrades to memory.
fn select_cache(options: &BuildOptions, config: &ToteConfig, root: &Path) -> Arc<dyn TransformCache> {
    if options.no_cache {
        return Arc::new(NoopCache);
    }
    if let Some(cache) = &options.cache {
        return cache.clone();
    }
    match config.cache.cache_type {
        CacheType::Memory => Arc::new(MemoryCache::new()),
        CacheType::Filesystem => {
            let dir = root.join(&config.cache.cache_directory);
            match PersistentCache::open(&dir) {
                Ok(cache) => Arc::new(cache),
                Err(err) => {
                    tracing::warn!(dir = %dir.display(), error = %err, "persistent cache unavailable, using memory");
                    Arc::new(MemoryCache::new())
                }
            }
        }
    }
}
