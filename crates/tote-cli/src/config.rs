//! Layered configuration loading.
//!
//! Priority: command-line flags > `TOTE_*` environment > config file > defaults.
//! Environment keys use `__` for nesting: `TOTE_OUTPUT__PATH=build`,
//! `TOTE_DEV_SERVER__PORT=3000`.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde_json::{Map, Value, json};
use tote_config::discovery::read_value;
use tote_config::{ConfigDiscovery, EntryConfig, EntryRequest, Mode, ToteConfig};

use crate::cli::{BuildArgs, ConfigArgs, DevArgs};
use crate::commands::utils;
use crate::error::{CliError, Result};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "TOTE_";

/// A configuration ready to build with.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Project root; relative config paths resolve against it.
    pub root: PathBuf,
    /// The file the configuration came from, if any.
    pub file: Option<PathBuf>,
    /// Merged and materialized for its mode.
    pub config: ToteConfig,
    /// `--entry` overrides.
    pub entries: Vec<EntryRequest>,
}

impl LoadedConfig {
    /// Output directory, absolute.
    pub fn out_dir(&self) -> PathBuf {
        utils::resolve_path(&self.config.output.path, &self.root)
    }
}

/// Flag values that override configuration keys.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mode: Option<Mode>,
    pub out_dir: Option<PathBuf>,
    pub clean: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub open: bool,
}

impl Overrides {
    pub fn from_build(args: &BuildArgs) -> Self {
        Self {
            mode: args.config.mode.map(Into::into),
            out_dir: args.out_dir.clone(),
            clean: args.clean,
            ..Self::default()
        }
    }

    /// Dev builds default to development mode.
    pub fn from_dev(args: &DevArgs) -> Self {
        Self {
            mode: Some(args.config.mode.map(Into::into).unwrap_or(Mode::Development)),
            host: args.host.clone(),
            port: args.port,
            open: args.open,
            ..Self::default()
        }
    }

    /// The overrides as a partial config document.
    fn to_value(&self) -> Value {
        let mut root = Map::new();
        if let Some(mode) = self.mode {
            root.insert("mode".into(), json!(mode.as_str()));
        }

        let mut output = Map::new();
        if let Some(out_dir) = &self.out_dir {
            output.insert("path".into(), json!(out_dir.to_string_lossy()));
        }
        if self.clean {
            output.insert("clean".into(), json!(true));
        }
        if !output.is_empty() {
            root.insert("output".into(), Value::Object(output));
        }

        let mut dev_server = Map::new();
        if let Some(host) = &self.host {
            dev_server.insert("host".into(), json!(host));
        }
        if let Some(port) = self.port {
            dev_server.insert("port".into(), json!(port));
        }
        if self.open {
            dev_server.insert("open".into(), json!(true));
        }
        if !dev_server.is_empty() {
            root.insert("dev_server".into(), Value::Object(dev_server));
        }

        Value::Object(root)
    }
}

/// Load the configuration for a command.
pub fn load(args: &ConfigArgs, overrides: &Overrides) -> Result<LoadedConfig> {
    let cwd = utils::get_cwd()?;
    let explicit = args.config.as_ref().map(|p| utils::resolve_path(p, &cwd));
    let root = project_root(args.cwd.as_deref(), explicit.as_deref(), &cwd);

    let file = match explicit {
        Some(path) if path.is_file() => Some(path),
        Some(path) => return Err(CliError::ConfigNotFound(path)),
        None => ConfigDiscovery::new(&root).find(),
    };

    let file_value = file.as_deref().map(read_value).transpose()?;
    let config = merge(file_value, overrides, Env::prefixed(ENV_PREFIX).split("__"))?;

    match &file {
        Some(path) => tracing::debug!(file = %path.display(), mode = %config.mode, "loaded config"),
        None => tracing::debug!(mode = %config.mode, "no config file, using defaults"),
    }

    Ok(LoadedConfig {
        root,
        file,
        config,
        entries: EntryConfig::from_cli_args(&args.entry),
    })
}

/// Merge the layers and apply the profile of the resulting mode.
fn merge(file: Option<Value>, overrides: &Overrides, env: Env) -> Result<ToteConfig> {
    let mut figment = Figment::from(Serialized::defaults(ToteConfig::default()));
    if let Some(value) = file {
        figment = figment.merge(Serialized::defaults(value));
    }
    figment = figment
        .merge(env)
        .merge(Serialized::defaults(overrides.to_value()));

    let value: Value = figment.extract()?;
    Ok(ToteConfig::from_value(value)?.materialize()?)
}

/// `--cwd`, else the directory of `--config`, else the current directory.
fn project_root(cwd_arg: Option<&Path>, config: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(dir) = cwd_arg {
        return utils::resolve_path(dir, cwd);
    }
    config
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tote_config::CacheType;

    fn no_env() -> Env {
        Env::prefixed("TOTE_TEST_UNSET_").split("__")
    }

    #[test]
    fn test_defaults_without_file() {
        let config = merge(None, &Overrides::default(), no_env()).unwrap();
        assert_eq!(config.mode, Mode::Production);
        assert_eq!(config.output.path, PathBuf::from("dist"));
        assert_eq!(config.dev_server.port, 8080);
    }

    #[test]
    fn test_file_over_defaults() {
        let file = json!({
            "entry": "./src/index.js",
            "output": { "path": "build" },
            "cache": { "type": "filesystem" }
        });
        let config = merge(Some(file), &Overrides::default(), no_env()).unwrap();
        assert_eq!(config.entry, EntryConfig::Single("./src/index.js".into()));
        assert_eq!(config.output.path, PathBuf::from("build"));
        assert_eq!(config.output.filename, "[name].js");
        assert_eq!(config.cache.cache_type, CacheType::Filesystem);
    }

    #[test]
    fn test_flags_over_file() {
        let file = json!({ "mode": "production", "output": { "path": "build" } });
        let overrides = Overrides {
            mode: Some(Mode::Development),
            out_dir: Some(PathBuf::from("out")),
            clean: true,
            port: Some(3000),
            ..Overrides::default()
        };
        let config = merge(Some(file), &overrides, no_env()).unwrap();
        assert_eq!(config.mode, Mode::Development);
        assert_eq!(config.output.path, PathBuf::from("out"));
        assert!(config.output.clean);
        assert_eq!(config.dev_server.port, 3000);
    }

    #[test]
    fn test_profile_of_overridden_mode_applies() {
        let file = json!({
            "mode": "production",
            "profiles": {
                "development": { "output": { "filename": "[name].dev.js" } },
                "production": { "output": { "filename": "[name].[contenthash:8].js" } }
            }
        });
        let overrides = Overrides {
            mode: Some(Mode::Development),
            ..Overrides::default()
        };
        let config = merge(Some(file), &overrides, no_env()).unwrap();
        assert_eq!(config.output.filename, "[name].dev.js");
    }

    #[test]
    #[serial]
    fn test_env_between_file_and_flags() {
        unsafe {
            std::env::set_var("TOTE_OUTPUT__PATH", "from-env");
            std::env::set_var("TOTE_DEV_SERVER__PORT", "9000");
        }
        let file = json!({ "output": { "path": "build" } });
        let env = Env::prefixed(ENV_PREFIX).split("__");
        let config = merge(Some(file.clone()), &Overrides::default(), env).unwrap();
        assert_eq!(config.output.path, PathBuf::from("from-env"));
        assert_eq!(config.dev_server.port, 9000);

        let overrides = Overrides {
            out_dir: Some(PathBuf::from("from-flag")),
            ..Overrides::default()
        };
        let env = Env::prefixed(ENV_PREFIX).split("__");
        let config = merge(Some(file), &overrides, env).unwrap();
        assert_eq!(config.output.path, PathBuf::from("from-flag"));
        unsafe {
            std::env::remove_var("TOTE_OUTPUT__PATH");
            std::env::remove_var("TOTE_DEV_SERVER__PORT");
        }
    }

    #[test]
    fn test_bad_value_type_is_reported() {
        let file = json!({ "dev_server": { "port": "not-a-port" } });
        let err = merge(Some(file), &Overrides::default(), no_env()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)), "{err}");
    }

    #[test]
    fn test_dev_overrides_default_to_development() {
        let args = DevArgs::default();
        assert_eq!(Overrides::from_dev(&args).mode, Some(Mode::Development));
    }

    #[test]
    fn test_project_root() {
        let cwd = Path::new("/work");
        assert_eq!(project_root(None, None, cwd), PathBuf::from("/work"));
        assert_eq!(
            project_root(None, Some(Path::new("/work/app/tote.toml")), cwd),
            PathBuf::from("/work/app")
        );
        assert_eq!(
            project_root(Some(Path::new("site")), Some(Path::new("/work/app/tote.toml")), cwd),
            PathBuf::from("/work/site")
        );
    }
}
