//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use miette::Report;
use tote_config::ConfigError;
use tote_config::validation::TEMPLATE_PLACEHOLDERS;

/// Convert a [`CliError`] into a miette report.
///
/// Bundler errors carry their own diagnostic codes, help and related
/// diagnostics, so they are reported as-is.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => bundler_error_to_miette(e),
        CliError::Config(e) => config_error_to_miette(e),
        other => miette::miette!("{}", other),
    }
}

/// Convert a tote-bundler error into a miette report.
pub fn bundler_error_to_miette(err: tote_bundler::Error) -> Report {
    Report::new(err)
}

fn config_error_to_miette(err: ConfigError) -> Report {
    let help = match &err {
        ConfigError::NotFound => Some("Run `tote init` or pass --config <FILE>".to_string()),
        ConfigError::NoEntries => {
            Some("Set `entry` in the config file or pass --entry <PATH>".to_string())
        }
        ConfigError::EntryNotFound { .. } => {
            Some("Entry paths are relative to the project root (see --cwd)".to_string())
        }
        ConfigError::DuplicateEntryName { .. } => {
            Some("Each entry name becomes a chunk name and must be unique".to_string())
        }
        ConfigError::InvalidTemplate { .. } => Some(format!(
            "Known placeholders: {}",
            TEMPLATE_PLACEHOLDERS
                .iter()
                .map(|p| format!("[{p}]"))
                .collect::<Vec<_>>()
                .join(", ")
        )),
        _ => None,
    };
    match help {
        Some(help) => miette::miette!(code = "INVALID_CONFIG", help = help, "{}", err),
        None => miette::miette!(code = "INVALID_CONFIG", "{}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundler_error_keeps_code() {
        let report = cli_error_to_miette(CliError::Build(tote_bundler::Error::InvalidOutputPath(
            "../escape".into(),
        )));
        let code = report.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("INVALID_OUTPUT_PATH"));
    }

    #[test]
    fn test_config_error_has_help() {
        let report = cli_error_to_miette(CliError::Config(ConfigError::NoEntries));
        assert_eq!(report.to_string(), "no entries specified");
        assert!(report.help().is_some());
    }

    #[test]
    fn test_other_errors_render_message() {
        let report = cli_error_to_miette(CliError::Server("port in use".into()));
        assert_eq!(report.to_string(), "Server error: port in use");
    }
}
