//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Filesystem validation errors (for CLI use)
    #[error("entry path not found: {}", path.display())]
    EntryNotFound { path: PathBuf },

    #[error("HTML template not found: {}", path.display())]
    TemplateNotFound { path: PathBuf },

    // Config parsing/loading errors
    #[error("no tote.toml, tote.json or package.json \"tote\" field found")]
    NotFound,

    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid config value for '{field}'{}", hint.as_ref().map(|h| format!(": {h}")).unwrap_or_default())]
    InvalidValue { field: String, hint: Option<String> },

    #[error("invalid profile override: {message}")]
    InvalidProfileOverride { message: String },

    // Schema validation errors (no filesystem checks)
    #[error("no entries specified")]
    NoEntries,

    #[error("entry name '{name}' is used more than once")]
    DuplicateEntryName { name: String },

    #[error("invalid regular expression in '{field}' ({pattern}): {message}")]
    InvalidRegex {
        field: String,
        pattern: String,
        message: String,
    },

    #[error("unknown placeholder [{placeholder}] in '{field}' template \"{template}\"")]
    InvalidTemplate {
        field: String,
        template: String,
        placeholder: String,
    },

    #[error("unknown transform '{name}' in module rule")]
    UnknownTransform { name: String },

    #[error("{message}")]
    SchemaValidation {
        message: String,
        hint: Option<String>,
    },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
