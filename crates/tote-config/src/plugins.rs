//! Built-in plugin options.
//!
//! Plugins are a fixed set selected by `type`:
//!
//! ```toml
//! [[plugins]]
//! type = "html"
//! template = "public/index.html"
//!
//! [[plugins]]
//! type = "css-extract"
//! filename = "static/css/[name].[contenthash:10].css"
//! ```

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Lint rules the lint plugin knows how to check.
pub const LINT_RULES: &[&str] = &["no-var", "no-debugger", "no-console", "no-alert"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PluginConfig {
    Html(HtmlPluginConfig),
    CssExtract(CssExtractConfig),
    CssMinimizer,
    Lint(LintConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlPluginConfig {
    /// Template file. A minimal document is generated when absent.
    #[serde(default)]
    pub template: Option<PathBuf>,

    #[serde(default = "default_html_filename")]
    pub filename: String,

    #[serde(default)]
    pub title: Option<String>,

    /// Insert `<link>` and `<script>` tags for the initial files.
    #[serde(default = "default_true")]
    pub inject: bool,

    /// Restrict injected tags to these entries. All entries when empty.
    #[serde(default)]
    pub chunks: Vec<String>,

    #[serde(default)]
    pub minify: Option<HtmlMinifyConfig>,
}

impl Default for HtmlPluginConfig {
    fn default() -> Self {
        Self {
            template: None,
            filename: default_html_filename(),
            title: None,
            inject: true,
            chunks: Vec::new(),
            minify: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlMinifyConfig {
    #[serde(default)]
    pub collapse_whitespace: bool,
    #[serde(default)]
    pub remove_comments: bool,
    #[serde(default)]
    pub remove_attribute_quotes: bool,
    #[serde(default)]
    pub remove_empty_attributes: bool,
    #[serde(default)]
    pub remove_script_type_attributes: bool,
    #[serde(default)]
    pub remove_style_link_type_attributes: bool,
    /// Minify inline `<style>` contents.
    #[serde(default)]
    pub minify_css: bool,
    /// Minify inline `<script>` contents.
    #[serde(default)]
    pub minify_js: bool,
}

/// Extract styles into `.css` files instead of injecting them at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssExtractConfig {
    /// Overrides `output.css_filename`.
    #[serde(default)]
    pub filename: Option<String>,

    /// Overrides `output.css_chunk_filename`.
    #[serde(default)]
    pub chunk_filename: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintConfig {
    #[serde(default)]
    pub rules: IndexMap<String, LintLevel>,

    /// Regex of module paths to skip. `node_modules` is always skipped.
    #[serde(default)]
    pub exclude: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintLevel {
    Off,
    Warn,
    Error,
}

/// Lookup helpers over the plugin list.
pub trait PluginsExt {
    fn html_plugins(&self) -> Vec<&HtmlPluginConfig>;
    fn css_extract(&self) -> Option<&CssExtractConfig>;
    fn css_minimizer(&self) -> bool;
    fn lint(&self) -> Option<&LintConfig>;
}

impl PluginsExt for [PluginConfig] {
    fn html_plugins(&self) -> Vec<&HtmlPluginConfig> {
        self.iter()
            .filter_map(|p| match p {
                PluginConfig::Html(html) => Some(html),
                _ => None,
            })
            .collect()
    }

    fn css_extract(&self) -> Option<&CssExtractConfig> {
        self.iter().find_map(|p| match p {
            PluginConfig::CssExtract(extract) => Some(extract),
            _ => None,
        })
    }

    fn css_minimizer(&self) -> bool {
        self.iter().any(|p| matches!(p, PluginConfig::CssMinimizer))
    }

    fn lint(&self) -> Option<&LintConfig> {
        self.iter().find_map(|p| match p {
            PluginConfig::Lint(lint) => Some(lint),
            _ => None,
        })
    }
}

fn default_true() -> bool {
    true
}

fn default_html_filename() -> String {
    "index.html".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugins_deserialize_by_type() {
        let plugins: Vec<PluginConfig> = serde_json::from_str(
            r#"[
                { "type": "html", "template": "public/index.html" },
                { "type": "css-extract", "filename": "static/css/main.[contenthash:10].css" },
                { "type": "css-minimizer" },
                { "type": "lint", "rules": { "no-var": "error" } }
            ]"#,
        )
        .unwrap();

        let html = plugins.html_plugins();
        assert_eq!(html.len(), 1);
        assert_eq!(html[0].filename, "index.html");
        assert!(html[0].inject);
        assert!(plugins.css_extract().unwrap().filename.is_some());
        assert!(plugins.css_minimizer());
        assert_eq!(plugins.lint().unwrap().rules["no-var"], LintLevel::Error);
    }

    #[test]
    fn unknown_plugin_type_is_rejected() {
        let result: Result<Vec<PluginConfig>, _> =
            serde_json::from_str(r#"[{ "type": "federation" }]"#);
        assert!(result.is_err());
    }
}
