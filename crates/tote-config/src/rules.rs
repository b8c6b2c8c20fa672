//! Module rules: which transforms run for which files.
//!
//! Rules are tried in order and the first match wins. A rule's `use` chain is
//! applied right to left, so `use = ["css", "less"]` compiles LESS first.

use serde::{Deserialize, Serialize};

/// Transform names understood by the graph builder.
pub const BUILTIN_TRANSFORMS: &[&str] = &["js", "json", "css", "less", "raw", "html"];

/// Default inline limit for `type = "asset"` (8 KiB).
pub const DEFAULT_DATA_URL_MAX_SIZE: u64 = 8 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl ModuleConfig {
    /// The configured rules, or the built-in set when none are configured.
    pub fn effective_rules(&self) -> Vec<RuleConfig> {
        if self.rules.is_empty() {
            default_rules()
        } else {
            self.rules.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Regex matched against the absolute module path.
    pub test: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    #[serde(default, rename = "use")]
    pub use_: Vec<String>,

    #[serde(default, rename = "type")]
    pub module_type: ModuleType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<ParserConfig>,
}

impl RuleConfig {
    pub fn new(test: impl Into<String>, module_type: ModuleType, use_: &[&str]) -> Self {
        Self {
            test: test.into(),
            include: None,
            exclude: None,
            use_: use_.iter().map(|s| s.to_string()).collect(),
            module_type,
            generator: None,
            parser: None,
        }
    }

    pub fn data_url_max_size(&self) -> u64 {
        self.parser
            .as_ref()
            .and_then(|p| p.data_url_max_size)
            .unwrap_or(DEFAULT_DATA_URL_MAX_SIZE)
    }

    pub fn generator_filename(&self) -> Option<&str> {
        self.generator.as_ref().and_then(|g| g.filename.as_deref())
    }
}

/// How a matched module is represented in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModuleType {
    #[default]
    #[serde(rename = "javascript")]
    Javascript,
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "css")]
    Css,
    /// Inlined as a data URL below `data_url_max_size`, otherwise emitted.
    #[serde(rename = "asset")]
    Asset,
    #[serde(rename = "asset/resource")]
    AssetResource,
    #[serde(rename = "asset/inline")]
    AssetInline,
    #[serde(rename = "asset/source")]
    AssetSource,
}

impl ModuleType {
    pub fn is_asset(&self) -> bool {
        matches!(
            self,
            ModuleType::Asset
                | ModuleType::AssetResource
                | ModuleType::AssetInline
                | ModuleType::AssetSource
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Filename template for emitted assets matched by this rule.
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default)]
    pub data_url_max_size: Option<u64>,
}

/// Rules used when `module.rules` is empty.
pub fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig::new(r"\.[cm]?js$", ModuleType::Javascript, &["js"]),
        RuleConfig::new(r"\.json$", ModuleType::Json, &["json"]),
        RuleConfig::new(r"\.css$", ModuleType::Css, &["css"]),
        RuleConfig::new(r"\.less$", ModuleType::Css, &["css", "less"]),
        RuleConfig::new(
            r"\.(png|jpe?g|gif|svg|webp|avif|ico)$",
            ModuleType::Asset,
            &[],
        ),
        RuleConfig::new(
            r"\.(woff2?|eot|ttf|otf)$",
            ModuleType::AssetResource,
            &[],
        ),
        RuleConfig::new(r"\.txt$", ModuleType::AssetSource, &["raw"]),
        RuleConfig::new(r"\.html?$", ModuleType::AssetSource, &["html"]),
    ]
}
