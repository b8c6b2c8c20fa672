//! `src`/`href` scanning for HTML modules.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::css::normalize_request;
use crate::module::{DependencyKind, ScannedDependency};

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?:img|source|video|audio|track|script|link|input|embed|image|use)\b[^>]*>")
        .expect("static regex")
});

static URL_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\s(?:src|href|xlink:href|poster)\s*=\s*(?P<value>"[^"]*"|'[^']*'|[^\s"'=<>`]+)"#,
    )
    .expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlReference {
    /// Request as passed to the resolver.
    pub specifier: String,
    /// Attribute value, quotes included.
    pub span: Range<usize>,
}

/// Scan markup for local resource references. Same exclusions as
/// stylesheets: data URLs, absolute URLs and fragments stay as written.
pub fn scan_html(source: &str) -> Vec<HtmlReference> {
    let masked = mask_html_comments(source);
    let mut refs = Vec::new();

    for tag in HTML_TAG.find_iter(&masked) {
        for caps in URL_ATTRIBUTE.captures_iter(tag.as_str()) {
            let Some(value) = caps.name("value") else {
                continue;
            };
            let raw = value.as_str().trim_matches(['"', '\'']);
            let Some(specifier) = normalize_request(raw) else {
                continue;
            };
            let start = tag.start() + value.start();
            refs.push(HtmlReference {
                specifier,
                span: start..start + value.len(),
            });
        }
    }
    refs
}

pub fn html_dependencies(source: &str) -> Vec<ScannedDependency> {
    scan_html(source)
        .into_iter()
        .map(|r| ScannedDependency {
            specifier: r.specifier,
            kind: DependencyKind::Url,
        })
        .collect()
}

/// Blank out `<!-- … -->`, keeping offsets and newlines.
fn mask_html_comments(source: &str) -> String {
    let mut out = source.as_bytes().to_vec();
    let mut from = 0;
    while let Some(offset) = source[from..].find("<!--") {
        let start = from + offset;
        let end = source[start + 4..]
            .find("-->")
            .map(|close| start + 4 + close + 3)
            .unwrap_or(source.len());
        for byte in &mut out[start..end] {
            if *byte != b'\n' {
                *byte = b' ';
            }
        }
        from = end;
    }
    String::from_utf8(out).unwrap_or_else(|_| source.to_string())
}
