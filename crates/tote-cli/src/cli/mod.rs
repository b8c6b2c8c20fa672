//! Command-line interface definition.
//!
//! - `tote build` - bundle the project into the output directory
//! - `tote dev` - serve the project with rebuild-on-change and live reload
//! - `tote check` - validate the configuration and entry files
//! - `tote init` - scaffold a new project

mod commands;
pub mod enums;
mod validation;

use clap::Parser;

pub use commands::{BuildArgs, CheckArgs, Command, ConfigArgs, DevArgs, InitArgs};
pub use enums::*;
pub use validation::{parse_entry, parse_host};

/// tote - a content-addressed module bundler
#[derive(Parser, Debug)]
#[command(
    name = "tote",
    version,
    about = "A content-addressed module bundler",
    long_about = "tote bundles scripts, JSON, styles and static assets into chunks whose\n\
                  file names carry the hash of their contents, so unchanged files keep\n\
                  their names across builds."
)]
pub struct Cli {
    /// Enable verbose logging (debug level for tote crates)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
