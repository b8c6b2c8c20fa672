//! Configuration for the tote bundler.
//!
//! `ToteConfig` is the root type. It is usually produced by [`ConfigDiscovery`]
//! (CLI use) or [`ToteConfig::from_value`] (programmatic use), then narrowed to
//! the active mode with [`ToteConfig::materialize`].

pub mod cache;
pub mod config;
pub mod dev_server;
pub mod discovery;
pub mod entry;
pub mod error;
pub mod optimization;
pub mod output;
pub mod performance;
pub mod plugins;
pub mod resolve;
pub mod rules;
pub mod validation;

// Re-export main types
pub use cache::*;
pub use config::*;
pub use dev_server::*;
pub use entry::*;
pub use error::*;
pub use optimization::*;
pub use output::*;
pub use performance::*;
pub use plugins::*;
pub use resolve::*;
pub use rules::*;

// Re-export discovery and validation
pub use discovery::{CONFIG_FILE_NAMES, ConfigDiscovery, discover};
pub use validation::{ConfigValidator, FsValidator, SchemaValidator, validate_fs, validate_schema};
