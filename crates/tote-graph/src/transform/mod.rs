//! Built-in transforms.
//!
//! A module's rule selects a chain of named transforms. Each one takes text and
//! returns text; the chain's output is then scanned for dependencies.

pub mod less;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::module::{AssetMode, ModuleKind, ScannedDependency};
use crate::scan::{css::css_dependencies, html::html_dependencies, scan_script};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("unknown transform '{0}'")]
    Unknown(String),

    #[error("file is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("LESS error{}: {message}", if *line > 0 { format!(" on line {line}") } else { String::new() })]
    Less { line: usize, message: String },
}

/// What the graph builder keeps for a module, and what the cache stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOutput {
    pub code: String,
    pub dependencies: Vec<ScannedDependency>,
}

/// Run a transform chain over a module's source and scan the result.
pub fn transform_module(
    kind: ModuleKind,
    transforms: &[String],
    path: &Path,
    source: &[u8],
) -> Result<TransformOutput, TransformError> {
    if matches!(kind, ModuleKind::Asset(AssetMode::Resource | AssetMode::Inline))
        && transforms.is_empty()
    {
        return Ok(TransformOutput::default());
    }

    let mut code = std::str::from_utf8(source)
        .map_err(|_| TransformError::InvalidUtf8)?
        .to_string();
    for name in transforms {
        code = apply(name, &code)?;
    }
    if kind == ModuleKind::Json && !transforms.iter().any(|t| t == "json") {
        code = apply("json", &code)?;
    }

    let dependencies = match kind {
        ModuleKind::Script => scan_script(&code).dependencies(),
        ModuleKind::Style => css_dependencies(&code),
        ModuleKind::Asset(AssetMode::Source) if transforms.iter().any(|t| t == "html") => {
            html_dependencies(&code)
        }
        ModuleKind::Json | ModuleKind::Asset(_) => Vec::new(),
    };

    tracing::trace!(path = %path.display(), deps = dependencies.len(), "transformed module");
    Ok(TransformOutput { code, dependencies })
}

/// Apply one named transform.
pub fn apply(name: &str, code: &str) -> Result<String, TransformError> {
    match name {
        "js" | "raw" => Ok(code.to_string()),
        "css" | "html" => Ok(code.replace("\r\n", "\n")),
        "json" => {
            let value: serde_json::Value =
                serde_json::from_str(code).map_err(|e| TransformError::InvalidJson(e.to_string()))?;
            serde_json::to_string(&value).map_err(|e| TransformError::InvalidJson(e.to_string()))
        }
        "less" => less::compile(code),
        other => Err(TransformError::Unknown(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::DependencyKind;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn less_then_css_produces_style_dependencies() {
        let output = transform_module(
            ModuleKind::Style,
            &names(&["less", "css"]),
            Path::new("/p/a.less"),
            b"@bg: url('./bg.png');\n.a { background: @bg; }",
        )
        .unwrap();
        assert!(output.code.contains(".a {"));
        assert_eq!(output.dependencies.len(), 1);
        assert_eq!(output.dependencies[0].kind, DependencyKind::Url);
        assert_eq!(output.dependencies[0].specifier, "./bg.png");
    }

    #[test]
    fn json_is_validated_even_without_transform() {
        let ok = transform_module(ModuleKind::Json, &[], Path::new("/p/d.json"), br#"{ "a": [1, 2] }"#)
            .unwrap();
        assert_eq!(ok.code, r#"{"a":[1,2]}"#);

        let err = transform_module(ModuleKind::Json, &[], Path::new("/p/d.json"), b"{ a: 1 }").unwrap_err();
        assert!(matches!(err, TransformError::InvalidJson(_)));
    }

    #[test]
    fn binary_assets_skip_decoding() {
        let output = transform_module(
            ModuleKind::Asset(AssetMode::Resource),
            &[],
            Path::new("/p/a.png"),
            &[0xff, 0xd8, 0x00],
        )
        .unwrap();
        assert!(output.code.is_empty());
        assert!(output.dependencies.is_empty());
    }

    #[test]
    fn scripts_must_be_utf8() {
        let err = transform_module(ModuleKind::Script, &[], Path::new("/p/a.js"), &[0xff]).unwrap_err();
        assert!(matches!(err, TransformError::InvalidUtf8));
    }

    #[test]
    fn html_transform_collects_sources() {
        let output = transform_module(
            ModuleKind::Asset(AssetMode::Source),
            &names(&["html"]),
            Path::new("/p/card.html"),
            b"<figure>\r\n  <img src=\"./photo.jpg\">\r\n</figure>",
        )
        .unwrap();
        assert!(!output.code.contains('\r'));
        assert_eq!(output.dependencies.len(), 1);
        assert_eq!(output.dependencies[0].kind, DependencyKind::Url);
        assert_eq!(output.dependencies[0].specifier, "./photo.jpg");

        let raw = transform_module(
            ModuleKind::Asset(AssetMode::Source),
            &names(&["raw"]),
            Path::new("/p/card.html"),
            b"<img src=\"./photo.jpg\">",
        )
        .unwrap();
        assert!(raw.dependencies.is_empty());
    }

    #[test]
    fn unknown_transform_is_an_error() {
        assert!(matches!(apply("babel", ""), Err(TransformError::Unknown(_))));
    }
}
