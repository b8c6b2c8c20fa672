//! Chunk assignment and splitting over hand-built graphs.

use proptest::prelude::*;
use rustc_hash::FxHashSet;
use tote_bundler::{ChunkGraph, ChunkKind, EntryPoint, build_chunks};
use tote_config::{CacheGroupConfig, ChunksFilter, SplitChunksConfig};
use tote_graph::{DependencyKind, Module, ModuleGraph, ModuleId, ModuleKind};

fn id(path: &str) -> ModuleId {
    ModuleId::new(format!("/app/{path}")).unwrap()
}

fn module(path: &str, size: usize, statics: &[&str], dynamics: &[&str]) -> Module {
    let mut builder = Module::builder(id(path), ModuleKind::Script).source("x".repeat(size));
    for dep in statics {
        builder = builder.dependency(format!("./{dep}"), DependencyKind::Static, id(dep));
    }
    for dep in dynamics {
        builder = builder.dependency(format!("./{dep}"), DependencyKind::Dynamic, id(dep));
    }
    builder.build()
}

fn entry(name: &str, path: &str) -> EntryPoint {
    EntryPoint {
        name: name.to_string(),
        modules: vec![id(path)],
    }
}

fn names(chunks: &ChunkGraph, indices: &[usize]) -> Vec<String> {
    indices.iter().map(|&idx| chunks.chunk(idx).name.clone()).collect()
}

fn all_chunks() -> SplitChunksConfig {
    SplitChunksConfig {
        chunks: ChunksFilter::All,
        ..SplitChunksConfig::default()
    }
}

/// Two entries sharing one module of `shared_size` bytes at `shared`.
fn two_entries(shared: &str, shared_size: usize) -> (ModuleGraph, Vec<EntryPoint>) {
    let graph = ModuleGraph::from_modules([
        module("a.js", 10, &[shared], &[]),
        module("b.js", 10, &[shared], &[]),
        module(shared, shared_size, &[], &[]),
    ]);
    (graph, vec![entry("a", "a.js"), entry("b", "b.js")])
}

#[test]
fn dynamic_import_gets_its_own_chunk() {
    let graph = ModuleGraph::from_modules([
        module("index.js", 10, &["shared.js"], &["lazy.js"]),
        module("shared.js", 10, &[], &[]),
        module("lazy.js", 10, &["shared.js", "only.js"], &[]),
        module("only.js", 10, &[], &[]),
    ]);
    let chunks = build_chunks(&graph, &[entry("main", "index.js")], &SplitChunksConfig::default()).unwrap();

    let main = chunks.by_name("main").unwrap();
    assert_eq!(main.kind, ChunkKind::Entry);
    assert_eq!(main.modules, vec![id("shared.js"), id("index.js")]);
    assert_eq!(main.roots, vec![id("index.js")]);
    assert_eq!(names(&chunks, &main.group), vec!["main"]);

    let lazy = chunks.by_name("lazy").unwrap();
    assert_eq!(lazy.kind, ChunkKind::Async);
    // shared.js is already loaded by every parent.
    assert_eq!(lazy.modules, vec![id("only.js"), id("lazy.js")]);
    assert_eq!(lazy.roots, vec![id("lazy.js")]);
    assert_eq!(main.async_children, vec![lazy.idx]);
    assert_eq!(chunks.async_chunk_for(&id("lazy.js")), Some(lazy.idx));
}

#[test]
fn async_chunk_names_are_unique() {
    let graph = ModuleGraph::from_modules([
        module("main.js", 10, &[], &["pages/main.js"]),
        module("pages/main.js", 10, &[], &[]),
    ]);
    let chunks = build_chunks(&graph, &[entry("main", "main.js")], &SplitChunksConfig::default()).unwrap();
    let names: Vec<&str> = chunks.chunks().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["main", "main-2"]);
}

#[test]
fn shared_vendor_module_is_split() {
    let (graph, entries) = two_entries("node_modules/lib/index.js", 30_000);
    let chunks = build_chunks(&graph, &entries, &all_chunks()).unwrap();

    let vendors = chunks.by_name("default_vendors-a~b").unwrap();
    assert_eq!(vendors.kind, ChunkKind::Split);
    assert_eq!(vendors.cache_group.as_deref(), Some("default_vendors"));
    assert_eq!(vendors.modules, vec![id("node_modules/lib/index.js")]);

    for name in ["a", "b"] {
        let chunk = chunks.by_name(name).unwrap();
        assert!(!chunk.modules.contains(&id("node_modules/lib/index.js")));
        assert_eq!(names(&chunks, &chunk.group), vec!["default_vendors-a~b".to_string(), name.to_string()]);
    }
}

#[test]
fn groups_below_min_size_stay_put() {
    let (graph, entries) = two_entries("node_modules/lib/index.js", 100);
    let chunks = build_chunks(&graph, &entries, &all_chunks()).unwrap();

    assert_eq!(chunks.len(), 2);
    for name in ["a", "b"] {
        assert!(chunks.by_name(name).unwrap().modules.contains(&id("node_modules/lib/index.js")));
    }
}

#[test]
fn default_group_needs_two_chunks() {
    let graph = ModuleGraph::from_modules([
        module("a.js", 10, &["shared.js", "mine.js"], &[]),
        module("b.js", 10, &["shared.js"], &[]),
        module("shared.js", 25_000, &[], &[]),
        module("mine.js", 25_000, &[], &[]),
    ]);
    let chunks = build_chunks(&graph, &[entry("a", "a.js"), entry("b", "b.js")], &all_chunks()).unwrap();

    let shared = chunks.by_name("default-a~b").unwrap();
    assert_eq!(shared.modules, vec![id("shared.js")]);
    assert!(chunks.by_name("a").unwrap().modules.contains(&id("mine.js")));
    assert_eq!(chunks.len(), 3);
}

#[test]
fn enforce_size_threshold_overrides_min_size() {
    let mut options = all_chunks();
    options.min_size = 1_000_000;
    options.enforce_size_threshold = 40_000;

    let (graph, entries) = two_entries("node_modules/lib/index.js", 45_000);
    let chunks = build_chunks(&graph, &entries, &options).unwrap();
    assert!(chunks.by_name("default_vendors-a~b").is_some());

    let (graph, entries) = two_entries("node_modules/lib/index.js", 35_000);
    let chunks = build_chunks(&graph, &entries, &options).unwrap();
    assert_eq!(chunks.len(), 2);
}

#[test]
fn initial_request_limit() {
    let mut options = all_chunks();
    options.max_initial_requests = 1;
    let (graph, entries) = two_entries("node_modules/lib/index.js", 30_000);
    let chunks = build_chunks(&graph, &entries, &options).unwrap();
    assert_eq!(chunks.len(), 2);
}

#[test]
fn highest_priority_group_wins() {
    let mut options = all_chunks();
    options.cache_groups.clear();
    options.cache_groups.insert(
        "low".to_string(),
        CacheGroupConfig {
            priority: 0,
            ..CacheGroupConfig::default()
        },
    );
    options.cache_groups.insert(
        "high".to_string(),
        CacheGroupConfig {
            test: Some("shared".to_string()),
            priority: 10,
            ..CacheGroupConfig::default()
        },
    );

    let (graph, entries) = two_entries("shared.js", 25_000);
    let chunks = build_chunks(&graph, &entries, &options).unwrap();
    let split: Vec<_> = chunks.chunks().iter().filter(|c| c.kind == ChunkKind::Split).collect();
    assert_eq!(split.len(), 1);
    assert_eq!(split[0].cache_group.as_deref(), Some("high"));
    assert_eq!(split[0].name, "high-a~b");
}

#[test]
fn named_group_collects_into_one_chunk() {
    let mut options = all_chunks();
    options.cache_groups.insert(
        "vendors".to_string(),
        CacheGroupConfig {
            test: Some("node_modules".to_string()),
            priority: 5,
            enforce: true,
            name: Some("vendors".to_string()),
            ..CacheGroupConfig::default()
        },
    );
    let graph = ModuleGraph::from_modules([
        module("a.js", 10, &["node_modules/x/index.js", "node_modules/y/index.js"], &[]),
        module("b.js", 10, &["node_modules/x/index.js"], &[]),
        module("node_modules/x/index.js", 10, &[], &[]),
        module("node_modules/y/index.js", 10, &[], &[]),
    ]);
    let chunks = build_chunks(&graph, &[entry("a", "a.js"), entry("b", "b.js")], &options).unwrap();

    let vendors = chunks.by_name("vendors").unwrap();
    let members: FxHashSet<_> = vendors.modules.iter().cloned().collect();
    assert_eq!(
        members,
        [id("node_modules/x/index.js"), id("node_modules/y/index.js")].into_iter().collect()
    );
    assert_eq!(chunks.chunks().iter().filter(|c| c.kind == ChunkKind::Split).count(), 1);
}

#[test]
fn existing_async_chunk_is_reused() {
    let graph = ModuleGraph::from_modules([
        module("index.js", 10, &[], &["x.js", "y.js"]),
        module("x.js", 25_000, &[], &[]),
        module("y.js", 10, &["x.js"], &[]),
    ]);
    let chunks = build_chunks(&graph, &[entry("main", "index.js")], &SplitChunksConfig::default()).unwrap();

    assert_eq!(chunks.len(), 3);
    let x = chunks.by_name("x").unwrap();
    let y = chunks.by_name("y").unwrap();
    assert_eq!(x.modules, vec![id("x.js")]);
    assert_eq!(y.modules, vec![id("y.js")]);
    assert_eq!(names(&chunks, &y.group), vec!["x", "y"]);
}

#[test]
fn disabled_splitting_only_assigns() {
    let options = SplitChunksConfig {
        enabled: false,
        ..all_chunks()
    };
    let (graph, entries) = two_entries("node_modules/lib/index.js", 60_000);
    let chunks = build_chunks(&graph, &entries, &options).unwrap();
    assert_eq!(chunks.len(), 2);
}

#[test]
fn invalid_cache_group_test_is_reported() {
    let mut options = SplitChunksConfig::default();
    options.cache_groups.insert(
        "broken".to_string(),
        CacheGroupConfig {
            test: Some("(".to_string()),
            ..CacheGroupConfig::default()
        },
    );
    let (graph, entries) = two_entries("shared.js", 10);
    assert!(build_chunks(&graph, &entries, &options).is_err());
}

/// `(size, vendor, [(target, dynamic)])` per module; module 0 is the entry.
type GraphShape = Vec<(u16, bool, Vec<(usize, bool)>)>;

fn shape() -> impl Strategy<Value = GraphShape> {
    prop::collection::vec(
        (any::<u16>(), any::<bool>(), prop::collection::vec((0usize..10, any::<bool>()), 0..4)),
        2..10,
    )
}

fn path_of(index: usize, vendor: bool) -> String {
    if vendor && index > 1 {
        format!("node_modules/p{index}/index.js")
    } else {
        format!("m{index}.js")
    }
}

fn graph_from(shape: &GraphShape) -> ModuleGraph {
    let paths: Vec<String> = shape
        .iter()
        .enumerate()
        .map(|(index, (_, vendor, _))| path_of(index, *vendor))
        .collect();
    ModuleGraph::from_modules(shape.iter().enumerate().map(|(index, (size, _, deps))| {
        let mut builder =
            Module::builder(id(&paths[index]), ModuleKind::Script).source("x".repeat(*size as usize));
        for &(target, dynamic) in deps {
            let target = target % paths.len();
            let kind = if dynamic { DependencyKind::Dynamic } else { DependencyKind::Static };
            builder = builder.dependency(format!("./{target}"), kind, id(&paths[target]));
        }
        builder.build()
    }))
}

proptest! {
    #[test]
    fn chunking_is_deterministic_and_complete(shape in shape(), chunks_all in any::<bool>()) {
        let graph = graph_from(&shape);
        let entries = vec![entry("main", "m0.js"), entry("second", "m1.js")];
        let mut options = SplitChunksConfig { min_size: 1_000, ..SplitChunksConfig::default() };
        if chunks_all {
            options.chunks = ChunksFilter::All;
        }

        let first = build_chunks(&graph, &entries, &options).unwrap();
        let second = build_chunks(&graph, &entries, &options).unwrap();
        prop_assert_eq!(first.chunks(), second.chunks());

        for entry in &entries {
            let chunk = first.by_name(&entry.name).unwrap();
            let loaded: FxHashSet<ModuleId> = chunk
                .group
                .iter()
                .flat_map(|&idx| first.chunk(idx).modules.iter().cloned())
                .collect();
            for module in graph.execution_order(&entry.modules) {
                prop_assert!(loaded.contains(&module), "{} missing from {}", module, entry.name);
            }
        }

        for chunk in first.chunks() {
            if chunk.kind == ChunkKind::Async {
                // The target may already be guaranteed by every parent.
                for &member in &chunk.group {
                    prop_assert!(first.chunk(member).has_file());
                }
            }
        }
    }
}
