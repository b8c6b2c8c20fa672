use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Module resolution options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Extensions probed, in order, when a request has none that exists.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Request prefix → replacement path (relative to the project root).
    /// The longest matching prefix wins.
    #[serde(default)]
    pub alias: IndexMap<String, PathBuf>,

    /// Directories searched for bare specifiers. Relative names are looked
    /// up in every ancestor of the importer; absolute paths are searched as is.
    #[serde(default = "default_modules")]
    pub modules: Vec<PathBuf>,

    /// `package.json` fields consulted for a package's entry file.
    #[serde(default = "default_main_fields")]
    pub main_fields: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            alias: IndexMap::new(),
            modules: default_modules(),
            main_fields: default_main_fields(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec![".js".into(), ".json".into()]
}

fn default_modules() -> Vec<PathBuf> {
    vec![PathBuf::from("node_modules")]
}

fn default_main_fields() -> Vec<String> {
    vec!["module".into(), "main".into()]
}
