use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;

use super::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

/// In-memory runtime. Directories exist implicitly as ancestors of files.
///
/// ```
/// use tote_graph::MemoryRuntime;
///
/// let runtime = MemoryRuntime::new("/project")
///     .with_file("src/index.js", "import './a.js';")
///     .with_file("src/a.js", "export const a = 1;");
/// assert_eq!(runtime.len(), 2);
/// ```
#[derive(Debug)]
pub struct MemoryRuntime {
    cwd: PathBuf,
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryRuntime {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            files: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_file(self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    /// Add or replace a file. Relative paths are taken from the working directory.
    pub fn insert(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = self.absolute(path.as_ref());
        self.files.write().insert(path, content.into());
    }

    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        let path = self.absolute(path.as_ref());
        self.files.write().remove(&path).is_some()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.clean()
        } else {
            self.cwd.join(path).clean()
        }
    }

    fn has_dir(&self, path: &Path) -> bool {
        let files = self.files.read();
        files
            .keys()
            .any(|file| file.starts_with(path) && file.as_path() != path)
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let path = self.absolute(path);
        self.files
            .read()
            .get(&path)
            .cloned()
            .ok_or(RuntimeError::FileNotFound(path))
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let path = self.absolute(path);
        if let Some(bytes) = self.files.read().get(&path) {
            return Ok(FileMetadata {
                size: bytes.len() as u64,
                is_dir: false,
                is_file: true,
                modified: None,
            });
        }
        if self.has_dir(&path) {
            return Ok(FileMetadata {
                size: 0,
                is_dir: true,
                is_file: false,
                modified: None,
            });
        }
        Err(RuntimeError::FileNotFound(path))
    }

    fn exists(&self, path: &Path) -> bool {
        let path = self.absolute(path);
        self.files.read().contains_key(&path) || self.has_dir(&path)
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directories_are_implied_by_files() {
        let runtime = MemoryRuntime::new("/project").with_file("src/lib/a.js", "x");
        assert!(runtime.is_dir(Path::new("/project/src")).await);
        assert!(runtime.is_file(Path::new("src/lib/a.js")).await);
        assert!(!runtime.is_file(Path::new("/project/src")).await);
        assert!(!runtime.exists(Path::new("/project/other")));
    }

    #[tokio::test]
    async fn insert_replaces_contents() {
        let runtime = MemoryRuntime::new("/p").with_file("a.js", "1");
        runtime.insert("/p/a.js", "2");
        assert_eq!(runtime.read_file(Path::new("/p/a.js")).await.unwrap(), b"2");
        assert!(runtime.remove("a.js"));
        assert!(runtime.read_file(Path::new("/p/a.js")).await.is_err());
    }
}
