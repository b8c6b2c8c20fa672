//! Compiled module rules.

use std::path::Path;

use regex::Regex;
use tote_config::{ConfigError, ModuleType, RuleConfig, BUILTIN_TRANSFORMS};

use crate::module::{AssetMode, ModuleKind};

#[derive(Debug)]
struct CompiledRule {
    test: Regex,
    include: Option<Regex>,
    exclude: Option<Regex>,
    config: RuleConfig,
}

/// Rules compiled once per build. The first matching rule wins.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
    fingerprint: String,
}

/// The outcome of matching a module path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRule {
    pub module_type: ModuleType,
    /// Transform names in application order (already reversed from `use`).
    pub transforms: Vec<String>,
    pub asset_filename: Option<String>,
    pub data_url_max_size: u64,
}

impl MatchedRule {
    /// Kind of module for a file of `size` bytes.
    pub fn kind(&self, size: u64) -> ModuleKind {
        match self.module_type {
            ModuleType::Javascript => ModuleKind::Script,
            ModuleType::Json => ModuleKind::Json,
            ModuleType::Css => ModuleKind::Style,
            ModuleType::AssetResource => ModuleKind::Asset(AssetMode::Resource),
            ModuleType::AssetInline => ModuleKind::Asset(AssetMode::Inline),
            ModuleType::AssetSource => ModuleKind::Asset(AssetMode::Source),
            ModuleType::Asset if size <= self.data_url_max_size => ModuleKind::Asset(AssetMode::Inline),
            ModuleType::Asset => ModuleKind::Asset(AssetMode::Resource),
        }
    }
}

impl RuleSet {
    pub fn compile(rules: &[RuleConfig]) -> Result<Self, ConfigError> {
        let mut compiled = Vec::with_capacity(rules.len());
        let mut fingerprint = blake3::Hasher::new();

        for (index, rule) in rules.iter().enumerate() {
            let field = format!("module.rules[{index}]");
            for name in &rule.use_ {
                if !BUILTIN_TRANSFORMS.contains(&name.as_str()) {
                    return Err(ConfigError::UnknownTransform { name: name.clone() });
                }
            }
            compiled.push(CompiledRule {
                test: regex(&format!("{field}.test"), &rule.test)?,
                include: rule
                    .include
                    .as_deref()
                    .map(|p| regex(&format!("{field}.include"), p))
                    .transpose()?,
                exclude: rule
                    .exclude
                    .as_deref()
                    .map(|p| regex(&format!("{field}.exclude"), p))
                    .transpose()?,
                config: rule.clone(),
            });

            let encoded = serde_json::to_vec(rule).map_err(|e| ConfigError::InvalidValue {
                field,
                hint: Some(e.to_string()),
            })?;
            fingerprint.update(&encoded);
            fingerprint.update(b"\0");
        }

        Ok(Self {
            rules: compiled,
            fingerprint: fingerprint.finalize().to_hex().to_string(),
        })
    }

    /// Digest of the rule configuration, folded into cache keys.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Match a module path. Unmatched files are treated as plain scripts.
    pub fn match_path(&self, path: &Path) -> MatchedRule {
        let text = path.to_string_lossy().replace('\\', "/");
        let matched = self.rules.iter().find(|rule| {
            rule.test.is_match(&text)
                && rule.include.as_ref().is_none_or(|inc| inc.is_match(&text))
                && !rule.exclude.as_ref().is_some_and(|exc| exc.is_match(&text))
        });

        match matched {
            Some(rule) => MatchedRule {
                module_type: rule.config.module_type,
                transforms: rule.config.use_.iter().rev().cloned().collect(),
                asset_filename: rule.config.generator_filename().map(str::to_string),
                data_url_max_size: rule.config.data_url_max_size(),
            },
            None => MatchedRule {
                module_type: ModuleType::Javascript,
                transforms: Vec::new(),
                asset_filename: None,
                data_url_max_size: tote_config::DEFAULT_DATA_URL_MAX_SIZE,
            },
        }
    }
}

fn regex(field: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
        field: field.to_string(),
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tote_config::default_rules;

    #[test]
    fn first_match_wins() {
        let rules = vec![
            RuleConfig::new(r"\.css$", ModuleType::AssetSource, &["raw"]),
            RuleConfig::new(r"\.css$", ModuleType::Css, &["css"]),
        ];
        let set = RuleSet::compile(&rules).unwrap();
        let matched = set.match_path(Path::new("/p/a.css"));
        assert_eq!(matched.module_type, ModuleType::AssetSource);
        assert_eq!(matched.transforms, vec!["raw"]);
    }

    #[test]
    fn use_chain_is_reversed() {
        let set = RuleSet::compile(&default_rules()).unwrap();
        let matched = set.match_path(Path::new("/p/index.less"));
        assert_eq!(matched.transforms, vec!["less", "css"]);
        assert_eq!(matched.kind(10), ModuleKind::Style);
    }

    #[test]
    fn include_and_exclude_filter_matches() {
        let mut rule = RuleConfig::new(r"\.js$", ModuleType::Javascript, &["js"]);
        rule.exclude = Some("node_modules".into());
        let set = RuleSet::compile(&[rule]).unwrap();
        assert_eq!(set.match_path(Path::new("/p/src/a.js")).transforms, vec!["js"]);
        assert!(set.match_path(Path::new("/p/node_modules/x/a.js")).transforms.is_empty());
    }

    #[test]
    fn asset_inlines_below_limit() {
        let set = RuleSet::compile(&default_rules()).unwrap();
        let matched = set.match_path(Path::new("/p/logo.png"));
        assert_eq!(matched.kind(100), ModuleKind::Asset(AssetMode::Inline));
        assert_eq!(matched.kind(9000), ModuleKind::Asset(AssetMode::Resource));
    }

    #[test]
    fn unknown_transform_fails_compilation() {
        let rules = vec![RuleConfig::new(r"\.ts$", ModuleType::Javascript, &["ts"])];
        assert!(matches!(
            RuleSet::compile(&rules),
            Err(ConfigError::UnknownTransform { .. })
        ));
    }

    #[test]
    fn fingerprint_tracks_rule_changes() {
        let a = RuleSet::compile(&default_rules()).unwrap();
        let b = RuleSet::compile(&default_rules()[1..]).unwrap();
        assert_eq!(a.fingerprint(), RuleSet::compile(&default_rules()).unwrap().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
