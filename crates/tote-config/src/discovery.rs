//! File-based config discovery for CLI use
//!
//! Handles finding and loading tote configuration files from the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::ToteConfig;
use crate::error::{ConfigError, Result};

/// Files searched, in order. `package.json` only counts with a `tote` field.
pub const CONFIG_FILE_NAMES: &[&str] = &["tote.toml", "tote.json", "package.json"];

/// File-based configuration discovery
///
/// # Example
///
/// ```no_run
/// use tote_config::ConfigDiscovery;
///
/// let discovery = ConfigDiscovery::new(".");
/// let config = discovery.load().unwrap();
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    /// Create a new config discovery with a root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find a config file in the root directory
    ///
    /// Searches in this order:
    /// 1. tote.toml
    /// 2. tote.json
    /// 3. package.json (tote field)
    pub fn find(&self) -> Option<PathBuf> {
        for name in &CONFIG_FILE_NAMES[..2] {
            let path = self.root.join(name);
            if path.is_file() {
                return Some(path);
            }
        }

        let pkg_path = self.root.join("package.json");
        let content = fs::read_to_string(&pkg_path).ok()?;
        let parsed = serde_json::from_str::<Value>(&content).ok()?;
        match parsed.get("tote") {
            Some(value) if !value.is_null() => Some(pkg_path),
            _ => None,
        }
    }

    /// Load config from the discovered file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if no config file is found.
    pub fn load(&self) -> Result<ToteConfig> {
        let path = self.find().ok_or(ConfigError::NotFound)?;
        load_file(&path)
    }

    /// Raw JSON value of the discovered file, without defaults applied.
    pub fn load_value(&self) -> Result<Option<(PathBuf, Value)>> {
        match self.find() {
            Some(path) => {
                let value = read_value(&path)?;
                Ok(Some((path, value)))
            }
            None => Ok(None),
        }
    }
}

/// Load and default-fill a config file. The format follows the file name.
pub fn load_file(path: &Path) -> Result<ToteConfig> {
    ToteConfig::from_value(read_value(path)?)
}

/// Read a config file into a JSON value.
pub fn read_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();

    if file_name == "package.json" {
        return value_from_package_json(&content);
    }

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => {
            let toml_val: toml::Value =
                toml::from_str(&content).map_err(|e| ConfigError::InvalidValue {
                    field: file_name.to_string(),
                    hint: Some(format!("Invalid TOML syntax: {e}")),
                })?;
            serde_json::to_value(toml_val).map_err(|e| ConfigError::InvalidValue {
                field: file_name.to_string(),
                hint: Some(format!("TOML to JSON conversion failed: {e}")),
            })
        }
        Some("json") => serde_json::from_str(&content).map_err(|e| ConfigError::InvalidValue {
            field: file_name.to_string(),
            hint: Some(format!("Invalid JSON: {e}")),
        }),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn value_from_package_json(content: &str) -> Result<Value> {
    let parsed: Value = serde_json::from_str(content).map_err(|e| ConfigError::InvalidValue {
        field: "package.json".to_string(),
        hint: Some(format!("Invalid JSON: {e}")),
    })?;

    match parsed.get("tote") {
        Some(value) if !value.is_null() => Ok(value.clone()),
        _ => Err(ConfigError::InvalidValue {
            field: "tote".to_string(),
            hint: Some("Add a 'tote' field to your package.json".to_string()),
        }),
    }
}

/// Discover and load config from the current directory.
pub fn discover() -> Result<ToteConfig> {
    let root = std::env::current_dir()?;
    ConfigDiscovery::new(&root).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn find_returns_none_when_no_config() {
        let dir = TempDir::new().unwrap();
        let discovery = ConfigDiscovery::new(dir.path());
        assert!(discovery.find().is_none());
    }

    #[test]
    fn toml_wins_over_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tote.json"), r#"{ "entry": "./b.js" }"#).unwrap();
        fs::write(dir.path().join("tote.toml"), "entry = \"./a.js\"\n").unwrap();

        let discovery = ConfigDiscovery::new(dir.path());
        assert_eq!(discovery.find().unwrap(), dir.path().join("tote.toml"));
        let config = discovery.load().unwrap();
        assert_eq!(config.entry, EntryConfig::Single("./a.js".into()));
    }

    #[test]
    fn load_returns_not_found_when_no_config() {
        let dir = TempDir::new().unwrap();
        let result = ConfigDiscovery::new(dir.path()).load();
        assert!(matches!(result.unwrap_err(), ConfigError::NotFound));
    }

    #[test]
    fn load_parses_toml_tables() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("tote.toml"),
            r#"
mode = "development"

[entry]
app = "./src/app.js"

[output]
path = "build"
clean = true

[[module.rules]]
test = '\.less$'
type = "css"
use = ["css", "less"]
"#,
        )
        .unwrap();

        let config = ConfigDiscovery::new(dir.path()).load().unwrap();
        assert_eq!(config.entry.requests()[0].name, "app");
        assert_eq!(config.output.path, PathBuf::from("build"));
        assert!(config.output.clean);
        assert_eq!(config.module.rules[0].use_, vec!["css", "less"]);
    }

    #[test]
    fn package_json_without_field_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{ "name": "app" }"#).unwrap();
        assert!(ConfigDiscovery::new(dir.path()).find().is_none());
    }

    #[test]
    fn load_from_package_json() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{ "name": "app", "tote": { "entry": ["./a.js", "./b.js"] } }"#,
        )
        .unwrap();

        let config = ConfigDiscovery::new(dir.path()).load().unwrap();
        assert_eq!(config.entry.requests()[0].requests.len(), 2);
    }

    #[test]
    fn invalid_toml_reports_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tote.toml"), "entry = [").unwrap();
        let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "tote.toml"));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tote.yaml");
        fs::write(&path, "entry: x").unwrap();
        assert!(matches!(
            load_file(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
