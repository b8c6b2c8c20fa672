//! Error handling for the tote CLI.
//!
//! Library errors (`tote_config::ConfigError`, `tote_bundler::Error`) convert
//! into [`CliError`] automatically; [`cli_error_to_miette`] renders the result
//! at the top level.

mod miette;

use std::path::PathBuf;
use thiserror::Error;

pub use self::miette::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid configuration values or an unreadable config file.
    #[error("Configuration error: {0}")]
    Config(#[from] tote_config::ConfigError),

    /// The layered configuration could not be merged or deserialized.
    #[error("Invalid configuration: {message}\n\nHint: {hint}")]
    InvalidConfig { message: String, hint: String },

    /// A `--config` path that does not exist.
    #[error("Config file not found: {}\n\nHint: Create a tote.toml file or pass an existing file to --config", .0.display())]
    ConfigNotFound(PathBuf),

    /// The build itself failed.
    #[error(transparent)]
    Build(#[from] tote_bundler::Error),

    /// The output directory is unsafe to write to.
    #[error("Output directory is not writable: {}\n\nHint: Choose a directory inside the project with --out-dir", .0.display())]
    OutputNotWritable(PathBuf),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        CliError::InvalidConfig {
            message: err.to_string(),
            hint: "Check the config file and TOTE_* environment variables for misspelled keys or wrong value types".to_string(),
        }
    }
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    ///
    /// ```rust,no_run
    /// # use std::path::Path;
    /// # use tote_cli::error::{Result, ResultExt};
    /// # fn run() -> Result<()> {
    /// let path = Path::new("tote.toml");
    /// std::fs::read_to_string(path).with_path(path)?;
    /// # Ok(())
    /// # }
    /// ```
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
