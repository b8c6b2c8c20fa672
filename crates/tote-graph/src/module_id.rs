use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const VIRTUAL_PREFIX: &str = "virtual:";

/// Identifier of a module in the graph.
///
/// Real files are identified by their cleaned absolute path, canonicalized
/// when the file exists on disk so that `./a.js` and `../src/a.js` collapse
/// to one module. Synthetic modules keep a `virtual:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(PathBuf);

#[derive(Debug, Error)]
pub enum ModuleIdError {
    #[error("module path is empty")]
    EmptyPath,

    #[error("failed to read the current directory: {source}")]
    CurrentDir {
        #[source]
        source: io::Error,
    },

    #[error("failed to canonicalize {}: {source}", path.display())]
    Canonicalization {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ModuleId {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ModuleIdError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ModuleIdError::EmptyPath);
        }

        if path.to_string_lossy().starts_with(VIRTUAL_PREFIX) {
            return Ok(Self(path.to_path_buf()));
        }

        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|source| ModuleIdError::CurrentDir { source })?
                .join(path)
        };
        let cleaned = joined.clean();

        match std::fs::canonicalize(&cleaned) {
            Ok(canonical) => Ok(Self(canonical)),
            // In-memory runtimes hand us paths that only exist virtually.
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self(cleaned)),
            Err(err) if err.kind() == io::ErrorKind::NotADirectory => Ok(Self(cleaned)),
            Err(err) => Err(ModuleIdError::Canonicalization {
                path: cleaned,
                source: err,
            }),
        }
    }

    /// Identifier for a synthetic module, e.g. `virtual:runtime`.
    pub fn new_virtual(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.starts_with(VIRTUAL_PREFIX) {
            Self(PathBuf::from(id))
        } else {
            Self(PathBuf::from(format!("{VIRTUAL_PREFIX}{id}")))
        }
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path(self) -> PathBuf {
        self.0
    }

    pub fn is_virtual(&self) -> bool {
        self.path_string().starts_with(VIRTUAL_PREFIX)
    }

    pub fn path_string(&self) -> Cow<'_, str> {
        self.0.to_string_lossy()
    }

    /// File name without its last extension (`count` for `src/count.js`).
    pub fn file_stem(&self) -> String {
        self.0
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path_string().trim_start_matches(VIRTUAL_PREFIX).to_string())
    }

    /// Extension without the dot, empty when there is none.
    pub fn extension(&self) -> String {
        self.0
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Path relative to `root` with forward slashes. Used for stable module
    /// ids in generated code so output does not depend on where the project
    /// is checked out.
    pub fn relative_to(&self, root: &Path) -> String {
        let relative = self.0.strip_prefix(root).unwrap_or(&self.0);
        let text = relative.to_string_lossy().replace('\\', "/");
        if self.0.starts_with(root) {
            format!("./{text}")
        } else {
            text
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_string())
    }
}

impl Serialize for ModuleId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.path_string())
    }
}

impl<'de> Deserialize<'de> for ModuleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(ModuleId(PathBuf::from(value)))
    }
}
