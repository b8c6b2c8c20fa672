//! `tote check`: validate configuration and entries without building.

use std::sync::Arc;

use tote_config::{EntryConfig, EntryRequest, PluginsExt, ToteConfig, validate_fs};
use tote_graph::{NativeRuntime, Resolver};

use crate::cli::CheckArgs;
use crate::config::{self, Overrides};
use crate::error::Result;
use crate::ui;

/// Execute the check command.
///
/// 1. Load and merge the configuration
/// 2. Schema checks: entries, names, regexes, templates, thresholds, proxies
/// 3. Filesystem checks: entry files and HTML templates exist
/// 4. Resolve every entry request the way the build would
pub async fn execute(args: CheckArgs) -> Result<()> {
    ui::info("Checking configuration...");

    let overrides = Overrides {
        mode: args.config.mode.map(Into::into),
        ..Overrides::default()
    };
    let loaded = config::load(&args.config, &overrides)?;

    if loaded.file.is_none() && loaded.entries.is_empty() {
        ui::warning("No tote.toml, tote.json or package.json \"tote\" field found, nothing to check");
        return Ok(());
    }
    if let Some(file) = &loaded.file {
        ui::info(&format!("Config file: {}", file.display()));
    }

    let config = with_entries(loaded.config.clone(), &loaded.entries)?;
    validate_fs(&config, &loaded.root)?;
    ui::success("Configuration is valid");

    ui::info("Resolving entry points...");
    let resolver = Resolver::new(Arc::new(NativeRuntime::new()), &loaded.root, &config.resolve);
    let entries = tote_bundler::resolve_entries(&config.entry, &loaded.root, &resolver).await?;
    for entry in &entries {
        let modules: Vec<String> = entry
            .modules
            .iter()
            .map(|id| id.relative_to(&loaded.root))
            .collect();
        ui::success(&format!("  {} -> {}", entry.name, modules.join(", ")));
    }

    report(&config);
    ui::success("All checks passed!");
    Ok(())
}

/// Replace the configured entries with `--entry` overrides, if any.
fn with_entries(mut config: ToteConfig, entries: &[EntryRequest]) -> Result<ToteConfig> {
    if !entries.is_empty() {
        config.entry = EntryConfig::from_requests(entries)?;
    }
    Ok(config)
}

fn report(config: &ToteConfig) {
    ui::info(&format!(
        "Mode: {}, minimize: {}, output: {}",
        config.mode,
        config.minimize(),
        config.output.path.display()
    ));
    let html = config.plugins.html_plugins().len();
    if html > 0 {
        ui::info(&format!("HTML pages: {html}"));
    }
    if let Some(lint) = config.plugins.lint() {
        ui::info(&format!("Lint rules: {}", lint.rules.len()));
    }
    if !config.dev_server.proxy.is_empty() {
        ui::info(&format!("Proxy rules: {}", config.dev_server.proxy.len()));
    }
}
