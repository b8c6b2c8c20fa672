//! Output configuration: where files go and how they are named.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory, relative to the project root.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Template for entry chunk scripts.
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Template for async and split chunk scripts.
    #[serde(default = "default_chunk_filename")]
    pub chunk_filename: String,

    /// Template for extracted entry stylesheets.
    #[serde(default = "default_css_filename")]
    pub css_filename: String,

    #[serde(default = "default_css_chunk_filename")]
    pub css_chunk_filename: String,

    /// Template for emitted asset modules, unless a rule overrides it.
    #[serde(default = "default_asset_filename")]
    pub asset_filename: String,

    /// URL prefix under which the output directory is served.
    #[serde(default = "default_public_path")]
    pub public_path: String,

    /// Remove the output directory before writing.
    #[serde(default)]
    pub clean: bool,

    #[serde(default)]
    pub library: Option<LibraryConfig>,

    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Emit `manifest.json` mapping logical names to emitted files.
    #[serde(default)]
    pub manifest: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            filename: default_filename(),
            chunk_filename: default_chunk_filename(),
            css_filename: default_css_filename(),
            css_chunk_filename: default_css_chunk_filename(),
            asset_filename: default_asset_filename(),
            public_path: default_public_path(),
            clean: false,
            library: None,
            environment: EnvironmentConfig::default(),
            manifest: false,
        }
    }
}

impl OutputConfig {
    /// Every filename template with the config key it came from.
    pub fn templates(&self) -> [(&'static str, &str); 5] {
        [
            ("output.filename", &self.filename),
            ("output.chunk_filename", &self.chunk_filename),
            ("output.css_filename", &self.css_filename),
            ("output.css_chunk_filename", &self.css_chunk_filename),
            ("output.asset_filename", &self.asset_filename),
        ]
    }
}

/// Exposes an entry's exports as a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Global name. `[name]` is replaced with the entry name.
    pub name: String,

    #[serde(default)]
    pub target: LibraryTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryTarget {
    /// `var name = ...`
    #[default]
    Var,
    /// `window.name = ...`
    Window,
    /// `global.name = ...`
    Global,
    /// `self.name = ...`
    #[serde(rename = "self")]
    SelfTarget,
    /// `module.exports = ...`
    Commonjs,
}

/// Syntax the generated runtime is allowed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default = "default_true")]
    pub arrow_function: bool,

    #[serde(default = "default_true")]
    pub const_bindings: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            arrow_function: true,
            const_bindings: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_path() -> PathBuf {
    PathBuf::from("dist")
}

fn default_filename() -> String {
    "[name].js".into()
}

fn default_chunk_filename() -> String {
    "[name].[contenthash:8].js".into()
}

fn default_css_filename() -> String {
    "[name].css".into()
}

fn default_css_chunk_filename() -> String {
    "[name].[contenthash:8].css".into()
}

fn default_asset_filename() -> String {
    "[name].[contenthash:8].[ext]".into()
}

fn default_public_path() -> String {
    "/".into()
}
