//! Build results.

pub mod writer;

use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;

use crate::build::BuildStats;
use crate::chunk::ChunkKind;
use crate::diagnostics::Diagnostic;
use crate::Result;

pub use writer::write_files;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Script,
    Style,
    Asset,
    Html,
    Manifest,
    SourceMap,
}

/// One emitted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Path relative to the output directory, `/`-separated.
    pub name: String,
    pub contents: Vec<u8>,
    pub kind: FileKind,
    /// Chunk the file was rendered from.
    pub chunk: Option<String>,
}

impl OutputFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>, kind: FileKind) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
            kind,
            chunk: None,
        }
    }

    pub fn with_chunk(mut self, chunk: impl Into<String>) -> Self {
        self.chunk = Some(chunk.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.contents.len() as u64
    }

    /// Contents as text, for scripts, styles, HTML and the manifest.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }
}

/// Summary of one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkInfo {
    pub name: String,
    pub kind: ChunkKind,
    /// Script first, then the extracted stylesheet if any.
    pub files: Vec<String>,
    /// Module keys in execution order.
    pub modules: Vec<String>,
    /// `[chunkhash]` of the chunk.
    pub hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Files in emission order.
    pub files: Vec<OutputFile>,
    /// Entry name to the files a page loads for it, in load order.
    pub entrypoints: IndexMap<String, Vec<String>>,
    pub chunks: Vec<ChunkInfo>,
    /// Lint and performance findings that did not fail the build.
    pub warnings: Vec<Diagnostic>,
    pub stats: BuildStats,
    /// The `[hash]` of this build.
    pub hash: String,
}

impl BuildOutput {
    pub fn file(&self, name: &str) -> Option<&OutputFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn chunk(&self, name: &str) -> Option<&ChunkInfo> {
        self.chunks.iter().find(|c| c.name == name)
    }

    pub fn files_of_kind(&self, kind: FileKind) -> impl Iterator<Item = &OutputFile> {
        self.files.iter().filter(move |f| f.kind == kind)
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(OutputFile::size).sum()
    }

    /// Write every file under `dir`. See [`writer::write_files`].
    pub fn write_to(&self, dir: impl AsRef<Path>, clean: bool) -> Result<()> {
        write_files(&self.files, dir.as_ref(), clean)
    }
}
