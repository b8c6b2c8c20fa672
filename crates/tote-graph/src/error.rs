use std::path::PathBuf;

use thiserror::Error;

use crate::module_id::ModuleIdError;
use crate::resolver::ResolveError;
use crate::runtime::RuntimeError;
use crate::transform::TransformError;

pub type Result<T> = std::result::Result<T, GraphError>;

/// A failure while building the module graph. The builder collects these
/// and reports all of them together.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    #[error("can't resolve '{specifier}' in {}: {source}", importer.display())]
    Unresolved {
        specifier: String,
        importer: PathBuf,
        #[source]
        source: ResolveError,
    },

    #[error("failed to transform {}: {source}", path.display())]
    Transform {
        path: PathBuf,
        #[source]
        source: TransformError,
    },

    #[error(transparent)]
    ModuleId(#[from] ModuleIdError),

    #[error("graph task failed: {0}")]
    Task(String),
}

impl GraphError {
    /// Path of the module the error is attributed to, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            GraphError::Read { path, .. } | GraphError::Transform { path, .. } => Some(path),
            GraphError::Unresolved { importer, .. } => Some(importer),
            GraphError::ModuleId(_) | GraphError::Task(_) => None,
        }
    }
}
