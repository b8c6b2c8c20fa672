//! Root configuration structure and mode profile merging.
//!
//! For file discovery, see the `discovery` module.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::CacheConfig;
use crate::dev_server::DevServerConfig;
use crate::entry::EntryConfig;
use crate::error::{ConfigError, Result as ConfigResult};
use crate::optimization::OptimizationConfig;
use crate::output::OutputConfig;
use crate::performance::{HintLevel, PerformanceConfig};
use crate::plugins::PluginConfig;
use crate::resolve::ResolveConfig;
use crate::rules::ModuleConfig;

/// Build mode. Selects the profile and mode-dependent defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    #[default]
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Mode::Production)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            other => Err(ConfigError::InvalidValue {
                field: "mode".to_string(),
                hint: Some(format!(
                    "'{other}' is not a mode, expected 'development' or 'production'"
                )),
            }),
        }
    }
}

/// Source maps for emitted scripts. Maps are line-level and point into the
/// original module files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Devtool {
    /// `<script>.map` next to each script, referenced by a comment.
    SourceMap,
    /// The map embedded in the script as a `data:` URL.
    InlineSourceMap,
    /// `<script>.map` files without a reference in the script.
    HiddenSourceMap,
}

impl Devtool {
    /// Whether a separate `.map` file is written.
    pub fn writes_file(&self) -> bool {
        !matches!(self, Devtool::InlineSourceMap)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToteConfig {
    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub entry: EntryConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub resolve: ResolveConfig,

    #[serde(default)]
    pub module: ModuleConfig,

    #[serde(default)]
    pub plugins: Vec<PluginConfig>,

    #[serde(default)]
    pub optimization: OptimizationConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub dev_server: DevServerConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,

    /// Source maps for scripts. Off when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devtool: Option<Devtool>,

    /// Partial overrides keyed by mode name, deep-merged by [`ToteConfig::materialize`].
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub profiles: HashMap<String, Value>,
}

impl ToteConfig {
    /// Create from a JSON value, layering it over the built-in defaults.
    ///
    /// Objects merge key by key, so a partial `cache_groups` table keeps the
    /// default groups. Arrays and scalars replace the default.
    ///
    /// # Example
    ///
    /// ```
    /// use tote_config::{EntryConfig, ToteConfig};
    /// use serde_json::json;
    ///
    /// let config = ToteConfig::from_value(json!({
    ///     "entry": "./src/index.js",
    ///     "output": { "path": "build" }
    /// }))
    /// .unwrap();
    ///
    /// assert_eq!(config.entry, EntryConfig::Single("./src/index.js".into()));
    /// assert_eq!(config.output.path.to_str(), Some("build"));
    /// assert_eq!(config.output.filename, "[name].js");
    /// ```
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        let mut base = ToteConfig::default().to_value()?;
        merge_values(&mut base, &value);
        serde_json::from_value(base).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Convert to serde_json::Value
    pub fn to_value(&self) -> ConfigResult<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Apply the profile named after the current mode.
    ///
    /// The profile map is consumed; calling this twice is a no-op the second time.
    pub fn materialize(mut self) -> ConfigResult<Self> {
        let profiles = std::mem::take(&mut self.profiles);
        let mode = self.mode;

        let Some(overrides) = profiles.get(mode.as_str()) else {
            return Ok(self);
        };
        if overrides.is_null() {
            return Ok(self);
        }
        if !overrides.is_object() {
            return Err(ConfigError::InvalidProfileOverride {
                message: format!("profile '{mode}' must be a table"),
            });
        }

        let mut base = serde_json::to_value(&self).map_err(|err| {
            ConfigError::InvalidProfileOverride {
                message: err.to_string(),
            }
        })?;
        merge_values(&mut base, overrides);

        let mut merged: ToteConfig = serde_json::from_value(base).map_err(|err| {
            ConfigError::InvalidProfileOverride {
                message: err.to_string(),
            }
        })?;
        // A profile selects itself; it cannot switch to the other mode.
        merged.mode = mode;
        merged.profiles = HashMap::new();
        tracing::debug!(mode = %mode, "applied config profile");
        Ok(merged)
    }

    /// Switch mode and apply its profile in one step.
    pub fn with_mode(mut self, mode: Mode) -> ConfigResult<Self> {
        self.mode = mode;
        self.materialize()
    }

    /// Whether output is minified. Defaults to on in production.
    pub fn minimize(&self) -> bool {
        self.optimization
            .minimize
            .unwrap_or_else(|| self.mode.is_production())
    }

    /// Effective performance hint level. Defaults to warnings in production.
    pub fn performance_hints(&self) -> HintLevel {
        self.performance.hints.unwrap_or(if self.mode.is_production() {
            HintLevel::Warning
        } else {
            HintLevel::Off
        })
    }
}

pub(crate) fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_values(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}
