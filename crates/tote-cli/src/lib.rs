//! Command-line interface for the tote bundler.
//!
//! - [`cli`] - argument definitions (`clap` derive)
//! - [`config`] - layered configuration loading (`figment`)
//! - [`commands`] - `build`, `dev`, `check` and `init`
//! - [`dev`] - the development server, file watcher and proxy
//! - [`error`] - [`CliError`] and its `miette` rendering
//! - [`logger`] / [`ui`] - `tracing` setup and terminal status lines

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result, ResultExt};
