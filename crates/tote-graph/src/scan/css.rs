//! `@import` and `url()` scanning for stylesheets.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::mask_comments;
use crate::module::{DependencyKind, ScannedDependency};

static CSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"@import\s+(?:url\(\s*)?["']?(?P<spec>[^"')\s;]+)["']?\s*\)?(?P<media>[^;]*);"#,
    )
    .expect("static regex")
});

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*["']?(?P<spec>[^"')]+?)["']?\s*\)"#).expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssReference {
    /// Request as passed to the resolver.
    pub specifier: String,
    pub kind: DependencyKind,
    /// Whole `@import …;` rule or `url(…)` expression.
    pub span: Range<usize>,
    /// Media query of an `@import`, empty when absent.
    pub media: String,
}

/// Scan a stylesheet for local references. External URLs, data URLs,
/// server-absolute paths and fragment references are left alone.
pub fn scan_css(source: &str) -> Vec<CssReference> {
    let masked = mask_comments(source, false);
    let mut refs = Vec::new();

    for caps in CSS_IMPORT.captures_iter(&masked) {
        let (Some(whole), Some(spec)) = (caps.get(0), caps.name("spec")) else {
            continue;
        };
        let Some(specifier) = normalize_request(spec.as_str()) else {
            continue;
        };
        refs.push(CssReference {
            specifier,
            kind: DependencyKind::StyleImport,
            span: whole.range(),
            media: caps
                .name("media")
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default(),
        });
    }

    let import_spans: Vec<Range<usize>> = refs.iter().map(|r| r.span.clone()).collect();
    for caps in CSS_URL.captures_iter(&masked) {
        let (Some(whole), Some(spec)) = (caps.get(0), caps.name("spec")) else {
            continue;
        };
        let range = whole.range();
        if import_spans
            .iter()
            .any(|s| s.start <= range.start && range.end <= s.end)
        {
            continue;
        }
        let Some(specifier) = normalize_request(spec.as_str()) else {
            continue;
        };
        refs.push(CssReference {
            specifier,
            kind: DependencyKind::Url,
            span: range,
            media: String::new(),
        });
    }

    refs.sort_by_key(|r| r.span.start);
    refs
}

pub fn css_dependencies(source: &str) -> Vec<ScannedDependency> {
    scan_css(source)
        .into_iter()
        .map(|r| ScannedDependency {
            specifier: r.specifier,
            kind: r.kind,
        })
        .collect()
}

/// CSS requests are relative unless prefixed with `~`, which names a module.
pub(crate) fn normalize_request(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty()
        || raw.starts_with('#')
        || raw.starts_with('/')
        || raw.starts_with("data:")
        || raw.contains("://")
    {
        return None;
    }
    // Strip cache busters and fragments (`font.woff?v=1#iefix`).
    let path = raw.split(['?', '#']).next().unwrap_or(raw);
    if let Some(module) = path.strip_prefix('~') {
        return Some(module.to_string());
    }
    if path.starts_with("./") || path.starts_with("../") {
        Some(path.to_string())
    } else {
        Some(format!("./{path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_imports_and_urls() {
        let css = r#"@import "./base.css";
@import url(theme.css) screen;
.logo { background: url('./img/logo.png'); }
.font { src: url(~icons/font.woff2?v=3#iefix); }
"#;
        let refs = scan_css(css);
        let found: Vec<_> = refs
            .iter()
            .map(|r| (r.specifier.as_str(), r.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("./base.css", DependencyKind::StyleImport),
                ("./theme.css", DependencyKind::StyleImport),
                ("./img/logo.png", DependencyKind::Url),
                ("icons/font.woff2", DependencyKind::Url),
            ]
        );
        assert_eq!(refs[1].media, "screen");
        assert_eq!(&css[refs[0].span.clone()], r#"@import "./base.css";"#);
    }

    #[test]
    fn skips_external_and_inline_references() {
        let css = r#"a { background: url(data:image/png;base64,AAAA); }
b { background: url(https://cdn.example.com/x.png); }
c { background: url(/static/y.png); }
d { filter: url(#blur); }
/* e { background: url(./commented.png); } */"#;
        assert!(scan_css(css).is_empty());
    }
}
