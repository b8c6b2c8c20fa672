//! I/O abstraction for the graph builder.
//!
//! Everything the builder and resolver read goes through [`Runtime`], so the
//! same pipeline runs against the real filesystem ([`native::NativeRuntime`])
//! or a map of files ([`memory::MemoryRuntime`]).

pub mod memory;
pub mod native;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("runtime error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    pub is_dir: bool,
    pub is_file: bool,
    /// Milliseconds since the Unix epoch, when known.
    pub modified: Option<u64>,
}

#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata>;

    fn exists(&self, path: &Path) -> bool;

    fn get_cwd(&self) -> RuntimeResult<PathBuf>;

    async fn is_file(&self, path: &Path) -> bool {
        self.metadata(path).await.map(|m| m.is_file).unwrap_or(false)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        self.metadata(path).await.map(|m| m.is_dir).unwrap_or(false)
    }

    async fn read_to_string(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.read_file(path).await?;
        String::from_utf8(bytes)
            .map_err(|_| RuntimeError::Io(format!("{} is not valid UTF-8", path.display())))
    }
}
