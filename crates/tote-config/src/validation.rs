//! Pluggable config validation strategies
//!
//! Separates filesystem validation (for CLI use) from schema validation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ToteConfig;
use crate::error::{ConfigError, Result};
use crate::plugins::{LINT_RULES, PluginConfig, PluginsExt};
use crate::rules::BUILTIN_TRANSFORMS;

/// Placeholders accepted in filename templates.
pub const TEMPLATE_PLACEHOLDERS: &[&str] = &["name", "id", "ext", "hash", "chunkhash", "contenthash"];

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Za-z]+)(?::(\d+))?\]").expect("static regex"));

/// Trait for pluggable config validation strategies
pub trait ConfigValidator {
    fn validate(&self, config: &ToteConfig) -> Result<()>;
}

/// Schema-only validation (no filesystem checks)
///
/// # Example
///
/// ```
/// use tote_config::{ConfigValidator, EntryConfig, SchemaValidator, ToteConfig};
///
/// let mut config = ToteConfig::default();
/// config.entry = EntryConfig::Single("./src/index.js".into());
///
/// SchemaValidator.validate(&config).unwrap();
/// ```
pub struct SchemaValidator;

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &ToteConfig) -> Result<()> {
        let requests = config.entry.requests();
        if requests.is_empty() {
            return Err(ConfigError::NoEntries);
        }
        let mut names = HashSet::new();
        for entry in &requests {
            if entry.requests.iter().all(|r| r.trim().is_empty()) {
                return Err(ConfigError::SchemaValidation {
                    message: format!("entry '{}' has no modules", entry.name),
                    hint: Some("Give every entry at least one file".to_string()),
                });
            }
            if !names.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateEntryName {
                    name: entry.name.clone(),
                });
            }
        }

        for (field, template) in config.output.templates() {
            check_template(field, template)?;
        }
        if let Some(library) = &config.output.library {
            if library.name.trim().is_empty() {
                return Err(ConfigError::SchemaValidation {
                    message: "output.library.name cannot be empty".to_string(),
                    hint: None,
                });
            }
        }

        for (index, rule) in config.module.rules.iter().enumerate() {
            let field = format!("module.rules[{index}]");
            check_regex(&format!("{field}.test"), &rule.test)?;
            if let Some(include) = &rule.include {
                check_regex(&format!("{field}.include"), include)?;
            }
            if let Some(exclude) = &rule.exclude {
                check_regex(&format!("{field}.exclude"), exclude)?;
            }
            for name in &rule.use_ {
                if !BUILTIN_TRANSFORMS.contains(&name.as_str()) {
                    return Err(ConfigError::UnknownTransform { name: name.clone() });
                }
            }
            if let Some(filename) = rule.generator_filename() {
                check_template(&format!("{field}.generator.filename"), filename)?;
            }
        }

        for plugin in &config.plugins {
            match plugin {
                PluginConfig::CssExtract(extract) => {
                    if let Some(filename) = &extract.filename {
                        check_template("css-extract.filename", filename)?;
                    }
                    if let Some(filename) = &extract.chunk_filename {
                        check_template("css-extract.chunk_filename", filename)?;
                    }
                }
                PluginConfig::Lint(lint) => {
                    for rule in lint.rules.keys() {
                        if !LINT_RULES.contains(&rule.as_str()) {
                            return Err(ConfigError::SchemaValidation {
                                message: format!("unknown lint rule '{rule}'"),
                                hint: Some(format!("Supported rules: {}", LINT_RULES.join(", "))),
                            });
                        }
                    }
                    if let Some(exclude) = &lint.exclude {
                        check_regex("lint.exclude", exclude)?;
                    }
                }
                PluginConfig::Html(html) => {
                    if html.filename.trim().is_empty() {
                        return Err(ConfigError::SchemaValidation {
                            message: "html plugin filename cannot be empty".to_string(),
                            hint: None,
                        });
                    }
                }
                PluginConfig::CssMinimizer => {}
            }
        }
        let mut html_files = HashSet::new();
        for html in config.plugins.html_plugins() {
            if !html_files.insert(html.filename.as_str()) {
                return Err(ConfigError::SchemaValidation {
                    message: format!("two html plugins write '{}'", html.filename),
                    hint: Some("Give each html plugin its own filename".to_string()),
                });
            }
        }

        let split = &config.optimization.split_chunks;
        if split.min_chunks == 0 {
            return Err(positive("optimization.split_chunks.min_chunks"));
        }
        if split.max_initial_requests == 0 {
            return Err(positive("optimization.split_chunks.max_initial_requests"));
        }
        if split.max_async_requests == 0 {
            return Err(positive("optimization.split_chunks.max_async_requests"));
        }
        for (name, group) in &split.cache_groups {
            if let Some(test) = &group.test {
                check_regex(&format!("optimization.split_chunks.cache_groups.{name}.test"), test)?;
            }
            if group.min_chunks == Some(0) {
                return Err(positive(&format!(
                    "optimization.split_chunks.cache_groups.{name}.min_chunks"
                )));
            }
        }

        if config.dev_server.port == 0 {
            return Err(positive("dev_server.port"));
        }
        for (prefix, rule) in &config.dev_server.proxy {
            if !prefix.starts_with('/') {
                return Err(ConfigError::SchemaValidation {
                    message: format!("proxy path '{prefix}' must start with '/'"),
                    hint: None,
                });
            }
            if !(rule.target.starts_with("http://") || rule.target.starts_with("https://")) {
                return Err(ConfigError::SchemaValidation {
                    message: format!("proxy target '{}' is not an http(s) URL", rule.target),
                    hint: Some("Use an absolute URL such as http://localhost:3000".to_string()),
                });
            }
            for pattern in rule.path_rewrite.keys() {
                check_regex(&format!("dev_server.proxy.{prefix}.path_rewrite"), pattern)?;
            }
        }

        if config.performance.max_asset_size == 0 {
            return Err(positive("performance.max_asset_size"));
        }
        if config.performance.max_entrypoint_size == 0 {
            return Err(positive("performance.max_entrypoint_size"));
        }

        Ok(())
    }
}

/// Filesystem validator (for CLI use)
///
/// Runs the schema checks, then verifies that relative entry files and HTML
/// templates exist under the project root.
pub struct FsValidator {
    root: PathBuf,
}

impl FsValidator {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &ToteConfig) -> Result<()> {
        SchemaValidator.validate(config)?;

        for entry in config.entry.requests() {
            for request in &entry.requests {
                // Bare specifiers and aliases are checked by the resolver.
                if !(request.starts_with('.') || request.starts_with('/')) {
                    continue;
                }
                let path = self.root.join(request);
                let probes = std::iter::once(path.clone()).chain(
                    config
                        .resolve
                        .extensions
                        .iter()
                        .map(|ext| PathBuf::from(format!("{}{ext}", path.display()))),
                );
                if !probes.into_iter().any(|p| p.exists()) {
                    return Err(ConfigError::EntryNotFound { path });
                }
            }
        }

        for html in config.plugins.html_plugins() {
            if let Some(template) = &html.template {
                let path = self.root.join(template);
                if !path.is_file() {
                    return Err(ConfigError::TemplateNotFound { path });
                }
            }
        }

        Ok(())
    }
}

/// Convenience function for schema-only validation
pub fn validate_schema(config: &ToteConfig) -> Result<()> {
    SchemaValidator.validate(config)
}

/// Convenience function for filesystem validation
pub fn validate_fs(config: &ToteConfig, root: impl AsRef<Path>) -> Result<()> {
    FsValidator::new(root).validate(config)
}

/// Reject placeholders the emitter does not know.
pub fn check_template(field: &str, template: &str) -> Result<()> {
    if template.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            hint: Some("filename templates cannot be empty".to_string()),
        });
    }
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if !TEMPLATE_PLACEHOLDERS.contains(&name) {
            return Err(ConfigError::InvalidTemplate {
                field: field.to_string(),
                template: template.to_string(),
                placeholder: name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_regex(field: &str, pattern: &str) -> Result<()> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidRegex {
            field: field.to_string(),
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

fn positive(field: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        hint: Some("must be greater than zero".to_string()),
    }
}
