//! `tote build`: load the configuration, build, write the output directory.

use std::time::Instant;

use tote_bundler::{BuildOptions, BuildOutput};

use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::config::{self, LoadedConfig, Overrides};
use crate::error::Result;
use crate::ui;

/// Execute the build command.
///
/// 1. Load configuration (flags > `TOTE_*` env > file > defaults)
/// 2. Build in memory
/// 3. Validate the output directory and write every file
/// 4. Print warnings and the build summary
pub async fn execute(args: BuildArgs) -> Result<()> {
    let start_time = Instant::now();

    let loaded = config::load(&args.config, &Overrides::from_build(&args))?;
    match &loaded.file {
        Some(file) => ui::info(&format!("Using {}", file.display())),
        None => ui::info("No config file found, using defaults"),
    }
    ui::info(&format!("Building in {} mode...", loaded.config.mode));

    let output = build(&loaded, args.no_cache).await?;
    let out_dir = write(&loaded, &output)?;

    for warning in &output.warnings {
        ui::warning(&warning.to_string());
    }
    ui::print_build_summary(&output);
    ui::success(&format!(
        "Built {} files to {} in {}",
        output.files.len(),
        out_dir.display(),
        ui::format_duration(start_time.elapsed())
    ));

    Ok(())
}

/// Build `loaded` in memory.
pub(crate) async fn build(loaded: &LoadedConfig, no_cache: bool) -> Result<BuildOutput> {
    let mut options = BuildOptions::new(&loaded.root, loaded.config.clone())
        .with_entries(loaded.entries.clone());
    if no_cache {
        options = options.without_cache();
    }
    Ok(tote_bundler::build(&options).await?)
}

/// Write `output` to the configured output directory and return it.
pub(crate) fn write(loaded: &LoadedConfig, output: &BuildOutput) -> Result<std::path::PathBuf> {
    let out_dir = loaded.out_dir();
    utils::validate_output_dir(&out_dir, &loaded.root)?;
    if loaded.config.output.clean {
        ui::info(&format!("Cleaning output directory: {}", out_dir.display()));
    }
    output.write_to(&out_dir, loaded.config.output.clean)?;
    Ok(out_dir)
}
