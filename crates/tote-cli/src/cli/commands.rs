use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::enums::ModeArg;
use crate::cli::validation::{parse_entry, parse_host};

/// Available tote subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bundle the project into the output directory
    ///
    /// Reads tote.toml, tote.json or the "tote" field of package.json from
    /// the project root. Every emitted file is named after its content hash
    /// unless its filename template says otherwise.
    Build(BuildArgs),

    /// Start the development server
    ///
    /// Builds in memory, serves the output, rebuilds when files change and
    /// reloads connected pages.
    Dev(DevArgs),

    /// Validate configuration and entry files without building
    Check(CheckArgs),

    /// Create a new project with a tote.toml and a small app
    Init(InitArgs),
}

/// Options shared by every command that loads a configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Configuration file to use instead of discovering one
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root (defaults to the directory of --config, else the
    /// current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Build mode; selects the matching profile from the config
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Entry points, replacing the configured ones
    ///
    /// Unnamed entries form the `main` entry; `name=path` adds a named one.
    ///
    /// Examples:
    ///   tote build --entry ./src/index.js
    ///   tote build --entry app=./src/app.js --entry admin=./src/admin.js
    #[arg(short, long = "entry", value_name = "[NAME=]PATH", value_parser = parse_entry)]
    pub entry: Vec<String>,
}

/// Arguments for the build command
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output directory (overrides `output.path`)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Remove the previous contents of the output directory
    #[arg(long)]
    pub clean: bool,

    /// Disable the transform cache for this build
    #[arg(long)]
    pub no_cache: bool,
}

/// Arguments for the dev command
#[derive(Args, Debug, Clone, Default)]
pub struct DevArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Port to listen on (overrides `dev_server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind (overrides `dev_server.host`)
    #[arg(long, value_parser = parse_host)]
    pub host: Option<String>,

    /// Open the browser once the server is listening
    #[arg(long)]
    pub open: bool,
}

/// Arguments for the check command
#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the init command
#[derive(Args, Debug, Clone, Default)]
pub struct InitArgs {
    /// Directory to create the project in
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}
