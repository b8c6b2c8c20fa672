//! Tests for default values and edge cases.

use std::path::PathBuf;

use tote_config::{
    CacheConfig, CacheType, ChunksFilter, DevServerConfig, EntryConfig, EnvironmentConfig,
    LibraryTarget, Mode, OutputConfig, PerformanceConfig, ResolveConfig, SplitChunksConfig,
    ToteConfig, default_rules,
};

#[test]
fn tote_config_defaults() {
    let config = ToteConfig::default();
    assert_eq!(config.mode, Mode::Production);
    assert!(config.entry.is_empty());
    assert!(config.plugins.is_empty());
    assert!(config.profiles.is_empty());
    assert!(config.module.rules.is_empty());
    assert_eq!(config.module.effective_rules(), default_rules());
}

#[test]
fn output_defaults() {
    let output = OutputConfig::default();
    assert_eq!(output.path, PathBuf::from("dist"));
    assert_eq!(output.filename, "[name].js");
    assert_eq!(output.chunk_filename, "[name].[contenthash:8].js");
    assert_eq!(output.css_filename, "[name].css");
    assert_eq!(output.asset_filename, "[name].[contenthash:8].[ext]");
    assert_eq!(output.public_path, "/");
    assert!(!output.clean);
    assert!(!output.manifest);
    assert!(output.library.is_none());
    assert_eq!(output.environment, EnvironmentConfig::default());
    assert!(output.environment.arrow_function);
}

#[test]
fn resolve_defaults() {
    let resolve = ResolveConfig::default();
    assert_eq!(resolve.extensions, vec![".js", ".json"]);
    assert_eq!(resolve.modules, vec![PathBuf::from("node_modules")]);
    assert_eq!(resolve.main_fields, vec!["module", "main"]);
    assert!(resolve.alias.is_empty());
}

#[test]
fn split_chunks_defaults() {
    let split = SplitChunksConfig::default();
    assert!(split.enabled);
    assert_eq!(split.chunks, ChunksFilter::Async);
    assert_eq!(split.min_size, 20_000);
    assert_eq!(split.min_chunks, 1);
    assert_eq!(split.max_initial_requests, 30);
    assert_eq!(split.max_async_requests, 30);
    assert_eq!(split.enforce_size_threshold, 50_000);

    let names: Vec<_> = split.cache_groups.keys().cloned().collect();
    assert_eq!(names, vec!["default_vendors", "default"]);
    let vendors = &split.cache_groups["default_vendors"];
    assert_eq!(vendors.priority, -10);
    assert!(vendors.reuse_existing_chunk);
    let default = &split.cache_groups["default"];
    assert_eq!(default.min_chunks, Some(2));
    assert_eq!(default.priority, -20);
}

#[test]
fn cache_defaults() {
    let cache = CacheConfig::default();
    assert_eq!(cache.cache_type, CacheType::Memory);
    assert_eq!(cache.cache_directory, PathBuf::from("node_modules/.cache/tote"));
    assert!(cache.build_dependencies.is_empty());
}

#[test]
fn dev_server_defaults() {
    let dev = DevServerConfig::default();
    assert_eq!(dev.host, "localhost");
    assert_eq!(dev.port, 8080);
    assert!(dev.compress);
    assert!(dev.hot);
    assert!(!dev.open);
    assert!(!dev.history_api_fallback);
    assert!(dev.proxy.is_empty());
    assert_eq!(dev.debounce_ms, 100);
}

#[test]
fn performance_defaults() {
    let perf = PerformanceConfig::default();
    assert!(perf.hints.is_none());
    assert_eq!(perf.max_asset_size, 250_000);
    assert_eq!(perf.max_entrypoint_size, 250_000);
    assert!(perf.considers("main.js"));
    assert!(!perf.considers("main.css"));
}

#[test]
fn partial_cache_groups_keep_defaults() {
    let config = ToteConfig::from_value(serde_json::json!({
        "optimization": {
            "split_chunks": {
                "chunks": "all",
                "cache_groups": { "styles": { "test": "\\.css$", "priority": 5 } }
            }
        }
    }))
    .unwrap();

    let groups = &config.optimization.split_chunks.cache_groups;
    assert_eq!(groups.len(), 3);
    assert_eq!(groups["styles"].priority, 5);
    assert!(groups["styles"].enabled);
    assert_eq!(config.optimization.split_chunks.chunks, ChunksFilter::All);
    assert_eq!(config.optimization.split_chunks.min_size, 20_000);
}

#[test]
fn library_target_names() {
    let config = ToteConfig::from_value(serde_json::json!({
        "output": { "library": { "name": "[name]", "target": "self" } }
    }))
    .unwrap();
    let library = config.output.library.unwrap();
    assert_eq!(library.target, LibraryTarget::SelfTarget);
    assert_eq!(library.name, "[name]");
}

#[test]
fn entry_map_from_value() {
    let config = ToteConfig::from_value(serde_json::json!({
        "entry": { "app": "./app.js", "admin": ["./a.js", "./b.js"] }
    }))
    .unwrap();
    assert!(matches!(config.entry, EntryConfig::Named(ref map) if map.len() == 2));
}
