//! # tote-bundler
//!
//! Turns a module graph into output files: entries are resolved, the graph is
//! built through [`tote_graph::GraphBuilder`], modules are partitioned into
//! chunks, and every chunk, stylesheet, asset and HTML page is rendered and
//! named after the hash of its final bytes.
//!
//! ```no_run
//! use tote_bundler::{BuildOptions, build};
//! use tote_config::ToteConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ToteConfig::default().materialize()?;
//! let output = build(&BuildOptions::new(".", config)).await?;
//! output.write_to("dist", true)?;
//! # Ok(()) }
//! ```

pub mod build;
pub mod cache;
pub mod chunk;
pub mod codegen;
pub mod diagnostics;
pub mod emit;
pub mod entry;
pub mod minify;
pub mod output;
pub mod performance;
pub mod plugins;
pub mod template;

pub use build::{BuildOptions, BuildStats, build};
pub use cache::{CacheError, CacheStore, PersistentCache, build_fingerprint};
pub use chunk::{Chunk, ChunkGraph, ChunkIdx, ChunkKind, build_chunks};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSeverity};
pub use entry::{EntryPoint, resolve_entries, resolve_requests};
pub use output::{BuildOutput, ChunkInfo, FileKind, OutputFile};
pub use template::{DEFAULT_HASH_LENGTH, PathData, content_hash, render_template};

use tote_config::ConfigError;
use tote_graph::GraphError;

/// Error types for tote-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One or more modules failed to load, transform or resolve.
    #[error("{}", format_graph_errors(.0))]
    Graph(Vec<GraphError>),

    /// Invalid configuration or entry definition.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Lint rules configured as errors were violated.
    #[error("{} lint error(s)", .0.len())]
    Lint(Vec<Diagnostic>),

    /// Size limits exceeded with `performance.hints = "error"`.
    #[error("{} performance limit(s) exceeded", .0.len())]
    Performance(Vec<Diagnostic>),

    /// Two different artifacts render to the same file name.
    #[error("Conflict: multiple artifacts emit different content to '{filename}'")]
    DuplicateOutput { filename: String },

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// The persistent cache could not be opened.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// I/O error with context message.
    #[error("{message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for tote-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

fn format_graph_errors(errors: &[GraphError]) -> String {
    match errors {
        [] => "module graph failed to build".to_string(),
        [single] => single.to_string(),
        many => format!(
            "{} errors: {}",
            many.len(),
            many.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
        ),
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Graph(_) => "GRAPH_ERROR",
            Error::Config(_) => "INVALID_CONFIG",
            Error::Lint(_) => "LINT_ERROR",
            Error::Performance(_) => "PERFORMANCE_LIMIT",
            Error::DuplicateOutput { .. } => "DUPLICATE_OUTPUT",
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::WriteFailure(_) => "WRITE_FAILURE",
            Error::Cache(_) => "CACHE_ERROR",
            Error::IoError { .. } => "IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Graph(errors) => {
                let unresolved = errors
                    .iter()
                    .filter(|e| matches!(e, GraphError::Unresolved { .. }))
                    .count();
                (unresolved > 0).then(|| {
                    Box::new(
                        "Check the import paths, `resolve.extensions`, `resolve.alias` and `resolve.modules`.",
                    ) as Box<dyn std::fmt::Display>
                })
            }
            Error::Config(ConfigError::DuplicateEntryName { .. }) => {
                Some(Box::new("Each entry name becomes a chunk name and must be unique."))
            }
            Error::Lint(_) => Some(Box::new(
                "Fix the reported problems or lower the rule level to \"warn\" in the lint plugin.",
            )),
            Error::Performance(_) => Some(Box::new(
                "Split the code with dynamic import(), or raise `performance.max_asset_size` / `performance.max_entrypoint_size`.",
            )),
            Error::DuplicateOutput { .. } => Some(Box::new(
                "Add [contenthash] or [name] to the output filename templates so each artifact gets a unique name.",
            )),
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output path '{path}' is invalid. Filenames must stay inside the output directory."
            ))),
            Error::WriteFailure(msg) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {msg}"
            ))),
            _ => None,
        }
    }

    fn related(&self) -> Option<Box<dyn Iterator<Item = &dyn miette::Diagnostic> + '_>> {
        match self {
            Error::Lint(diagnostics) | Error::Performance(diagnostics) if !diagnostics.is_empty() => Some(
                Box::new(diagnostics.iter().map(|d| d as &dyn miette::Diagnostic)),
            ),
            _ => None,
        }
    }
}
