//! Shared fixtures for tote-bundler integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tote_bundler::{BuildOptions, BuildOutput, FileKind, OutputFile, Result, build};
use tote_config::{EntryConfig, Mode, ToteConfig};
use tote_graph::MemoryRuntime;

pub const ROOT: &str = "/app";

/// A small app: static and dynamic imports, JSON, a stylesheet and an
/// image large enough to be emitted as a file.
pub fn project() -> MemoryRuntime {
    MemoryRuntime::new(ROOT)
        .with_file(
            "src/index.js",
            "import { count } from './count';\nimport data from './data.json';\nimport './style.css';\nimport logo from './logo.png';\n\nexport function start() {\n  return import('./lazy').then(m => m.run(count, data, logo));\n}\n",
        )
        .with_file("src/count.js", "export const count = 1 + 1;\n")
        .with_file("src/data.json", "{ \"name\": \"demo\" }")
        .with_file("src/style.css", ".a {\n  color: red;\n  background: url(./logo.png);\n}\n")
        .with_file("src/logo.png", vec![7u8; 9_000])
        .with_file("src/lazy.js", "export function run(a, b, c) {\n  return [a, b, c];\n}\n")
}

/// Development-mode config with `./src/index.js` as the only entry.
pub fn config() -> ToteConfig {
    ToteConfig {
        mode: Mode::Development,
        entry: EntryConfig::Single("./src/index.js".into()),
        ..ToteConfig::default()
    }
}

pub fn options(runtime: MemoryRuntime, config: ToteConfig) -> BuildOptions {
    BuildOptions::new(ROOT, config).with_runtime(Arc::new(runtime))
}

pub async fn run(runtime: MemoryRuntime, config: ToteConfig) -> Result<BuildOutput> {
    build(&options(runtime, config)).await
}

pub fn text<'a>(output: &'a BuildOutput, name: &str) -> &'a str {
    output
        .file(name)
        .and_then(OutputFile::text)
        .unwrap_or_else(|| panic!("no text file {name}; have {:?}", names(output)))
}

pub fn names(output: &BuildOutput) -> Vec<&str> {
    output.files.iter().map(|f| f.name.as_str()).collect()
}

/// The single file of `kind` whose name starts with `prefix`.
pub fn find<'a>(output: &'a BuildOutput, kind: FileKind, prefix: &str) -> &'a OutputFile {
    let matching: Vec<&OutputFile> = output
        .files_of_kind(kind)
        .filter(|f| f.name.starts_with(prefix))
        .collect();
    assert_eq!(matching.len(), 1, "files starting with {prefix}: {:?}", names(output));
    matching[0]
}
