//! Import and export scanning for scripts.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::{is_identifier, mask_comments};
use crate::module::{DependencyKind, ScannedDependency};

static IMPORT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*import[ \t]*(?P<clause>[\w$\s{},*]+?)\s*from\s*["'](?P<spec>[^"'\n]+)["'][ \t]*;?"#,
    )
    .expect("static regex")
});

static BARE_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s*["'](?P<spec>[^"'\n]+)["'][ \t]*;?"#).expect("static regex")
});

static EXPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*export\s*(?P<clause>\*(?:\s*as\s+[\w$]+)?|\{[^}]*\})\s*from\s*["'](?P<spec>[^"'\n]+)["'][ \t]*;?"#,
    )
    .expect("static regex")
});

static DYNAMIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*\(\s*["'](?P<spec>[^"'\n]+)["']\s*\)"#).expect("static regex")
});

static REQUIRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\s*\(\s*["'](?P<spec>[^"'\n]+)["']\s*\)"#).expect("static regex")
});

static EXPORT_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?P<kw>export\s+default\s+)(?:(?:async\s+)?function\b\s*\*?\s*(?P<fname>[\w$]+)?|class\s+(?P<cname>[\w$]+))?",
    )
    .expect("static regex")
});

static EXPORT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?P<kw>export\s+)(?:(?:async\s+)?function\b\s*\*?\s*(?P<fname>[\w$]+)|class\s+(?P<cname>[\w$]+)|(?P<var>const|let|var)\s+)",
    )
    .expect("static regex")
});

static EXPORT_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*export\s*\{(?P<list>[^}]*)\}[ \t]*;?").expect("static regex")
});

/// Bindings introduced by an import declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportClause {
    pub default: Option<String>,
    pub namespace: Option<String>,
    /// `(imported, local)` pairs.
    pub named: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReExportClause {
    /// `export * from '…'`
    All,
    /// `export * as ns from '…'`
    Namespace(String),
    /// `export { a, b as c } from '…'`, as `(imported, exported)` pairs.
    Named(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSyntax {
    Declaration(ImportClause),
    SideEffect,
    ReExport(ReExportClause),
    Dynamic,
    Require,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub specifier: String,
    pub kind: DependencyKind,
    /// Byte range of the whole statement or call expression.
    pub span: Range<usize>,
    pub syntax: ImportSyntax,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportKind {
    /// `export const a`, `export function f`, `export class C`:
    /// drop the `export` keyword, keep the declaration.
    Declaration { names: Vec<String> },
    /// `export default function f` / `export default class C`.
    DefaultDeclaration { name: String },
    /// `export default <expression>` or an anonymous function/class.
    DefaultExpression,
    /// `export { a, b as c }`, as `(local, exported)` pairs. Removed entirely.
    List(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    /// Bytes to replace: the `export` / `export default` keywords, or the
    /// whole statement for export lists.
    pub span: Range<usize>,
    pub kind: ExportKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptScan {
    /// Ordered by position.
    pub imports: Vec<ImportRecord>,
    /// Ordered by position.
    pub exports: Vec<ExportRecord>,
}

impl ScriptScan {
    /// Whether the module uses ES module syntax.
    pub fn is_esm(&self) -> bool {
        !self.exports.is_empty()
            || self.imports.iter().any(|i| {
                matches!(
                    i.syntax,
                    ImportSyntax::Declaration(_) | ImportSyntax::SideEffect | ImportSyntax::ReExport(_)
                )
            })
    }

    pub fn dependencies(&self) -> Vec<ScannedDependency> {
        self.imports
            .iter()
            .map(|i| ScannedDependency {
                specifier: i.specifier.clone(),
                kind: i.kind,
            })
            .collect()
    }
}

/// Scan a script for imports and exports.
pub fn scan_script(source: &str) -> ScriptScan {
    let masked = mask_comments(source, true);
    let mut imports: Vec<ImportRecord> = Vec::new();
    let mut taken: Vec<Range<usize>> = Vec::new();

    for caps in IMPORT_DECL.captures_iter(&masked) {
        let (Some(whole), Some(clause), Some(spec)) = (caps.get(0), caps.name("clause"), caps.name("spec"))
        else {
            continue;
        };
        let Some(clause) = parse_import_clause(clause.as_str()) else {
            continue;
        };
        let span = trim_leading_ws(&masked, whole.range());
        taken.push(span.clone());
        imports.push(ImportRecord {
            specifier: spec.as_str().to_string(),
            kind: DependencyKind::Static,
            span,
            syntax: ImportSyntax::Declaration(clause),
        });
    }

    for caps in BARE_IMPORT.captures_iter(&masked) {
        let (Some(whole), Some(spec)) = (caps.get(0), caps.name("spec")) else {
            continue;
        };
        let span = trim_leading_ws(&masked, whole.range());
        taken.push(span.clone());
        imports.push(ImportRecord {
            specifier: spec.as_str().to_string(),
            kind: DependencyKind::Static,
            span,
            syntax: ImportSyntax::SideEffect,
        });
    }

    for caps in EXPORT_FROM.captures_iter(&masked) {
        let (Some(whole), Some(clause), Some(spec)) = (caps.get(0), caps.name("clause"), caps.name("spec"))
        else {
            continue;
        };
        let span = trim_leading_ws(&masked, whole.range());
        taken.push(span.clone());
        imports.push(ImportRecord {
            specifier: spec.as_str().to_string(),
            kind: DependencyKind::Static,
            span,
            syntax: ImportSyntax::ReExport(parse_re_export_clause(clause.as_str())),
        });
    }

    for caps in DYNAMIC_IMPORT.captures_iter(&masked) {
        let (Some(whole), Some(spec)) = (caps.get(0), caps.name("spec")) else {
            continue;
        };
        if overlaps(&taken, &whole.range()) {
            continue;
        }
        imports.push(ImportRecord {
            specifier: spec.as_str().to_string(),
            kind: DependencyKind::Dynamic,
            span: whole.range(),
            syntax: ImportSyntax::Dynamic,
        });
    }

    for caps in REQUIRE.captures_iter(&masked) {
        let (Some(whole), Some(spec)) = (caps.get(0), caps.name("spec")) else {
            continue;
        };
        // `obj.require('x')` is a method call, not a module load.
        if masked[..whole.start()].trim_end().ends_with('.') || overlaps(&taken, &whole.range()) {
            continue;
        }
        imports.push(ImportRecord {
            specifier: spec.as_str().to_string(),
            kind: DependencyKind::Require,
            span: whole.range(),
            syntax: ImportSyntax::Require,
        });
    }

    imports.sort_by_key(|i| i.span.start);
    taken = imports.iter().map(|i| i.span.clone()).collect();

    let exports = scan_exports(&masked, &taken);
    ScriptScan { imports, exports }
}

fn scan_exports(masked: &str, taken: &[Range<usize>]) -> Vec<ExportRecord> {
    let mut exports = Vec::new();

    for caps in EXPORT_DEFAULT.captures_iter(masked) {
        let Some(kw) = caps.name("kw") else { continue };
        let span = trim_leading_ws(masked, kw.range());
        let name = caps
            .name("fname")
            .or_else(|| caps.name("cname"))
            .map(|m| m.as_str())
            .filter(|name| *name != "extends");
        let kind = match name {
            Some(name) => ExportKind::DefaultDeclaration {
                name: name.to_string(),
            },
            None => ExportKind::DefaultExpression,
        };
        exports.push(ExportRecord { span, kind });
    }

    for caps in EXPORT_DECL.captures_iter(masked) {
        let (Some(whole), Some(kw)) = (caps.get(0), caps.name("kw")) else {
            continue;
        };
        let names = if let Some(name) = caps.name("fname").or_else(|| caps.name("cname")) {
            vec![name.as_str().to_string()]
        } else {
            declarator_names(&masked[whole.end()..])
        };
        if names.is_empty() {
            continue;
        }
        exports.push(ExportRecord {
            span: trim_leading_ws(masked, kw.range()),
            kind: ExportKind::Declaration { names },
        });
    }

    for caps in EXPORT_LIST.captures_iter(masked) {
        let (Some(whole), Some(list)) = (caps.get(0), caps.name("list")) else {
            continue;
        };
        if overlaps(taken, &whole.range()) || masked[whole.end()..].trim_start().starts_with("from") {
            continue;
        }
        let pairs = parse_named_list(list.as_str());
        exports.push(ExportRecord {
            span: trim_leading_ws(masked, whole.range()),
            kind: ExportKind::List(pairs),
        });
    }

    exports.sort_by_key(|e| e.span.start);
    exports
}

fn overlaps(taken: &[Range<usize>], range: &Range<usize>) -> bool {
    taken
        .iter()
        .any(|t| t.start < range.end && range.start < t.end)
}

/// Drop the indentation the `^[ \t]*` prefix matched.
fn trim_leading_ws(text: &str, range: Range<usize>) -> Range<usize> {
    let slice = &text[range.clone()];
    let trimmed = slice.len() - slice.trim_start().len();
    range.start + trimmed..range.end
}

fn parse_import_clause(clause: &str) -> Option<ImportClause> {
    let clause = clause.trim();
    let mut result = ImportClause::default();
    let mut rest = clause;

    if !rest.starts_with('{') && !rest.starts_with('*') {
        let (default, tail) = match rest.split_once(',') {
            Some((default, tail)) => (default.trim(), tail.trim()),
            None => (rest, ""),
        };
        if !is_identifier(default) {
            return None;
        }
        result.default = Some(default.to_string());
        rest = tail;
    }

    if let Some(ns) = rest.strip_prefix('*') {
        let name = ns.trim().strip_prefix("as")?.trim();
        if !is_identifier(name) {
            return None;
        }
        result.namespace = Some(name.to_string());
    } else if let Some(list) = rest.strip_prefix('{') {
        let list = list.strip_suffix('}')?;
        result.named = parse_named_list(list);
    } else if !rest.is_empty() {
        return None;
    }

    Some(result)
}

fn parse_re_export_clause(clause: &str) -> ReExportClause {
    let clause = clause.trim();
    if let Some(rest) = clause.strip_prefix('*') {
        return match rest.trim().strip_prefix("as") {
            Some(name) => ReExportClause::Namespace(name.trim().to_string()),
            None => ReExportClause::All,
        };
    }
    let list = clause.trim_start_matches('{').trim_end_matches('}');
    ReExportClause::Named(parse_named_list(list))
}

/// Parse `a, b as c` into `[(a, a), (b, c)]`.
fn parse_named_list(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| {
            let mut parts = item.split_whitespace();
            let first = parts.next()?;
            match (parts.next(), parts.next()) {
                (Some("as"), Some(alias)) => Some((first.to_string(), alias.to_string())),
                (None, None) => Some((first.to_string(), first.to_string())),
                _ => None,
            }
        })
        .collect()
}

/// Names bound by `a = 1, { b, c: d } = obj, [e] = arr` up to the end of
/// the statement.
fn declarator_names(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut last_significant = ',';
    let bytes = text.as_bytes();
    let mut end = text.len();
    let mut declarators = Vec::new();

    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            '\'' | '"' | '`' => {
                i += 1;
                while i < bytes.len() && bytes[i] as char != c {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth < 0 {
                    end = i;
                    break;
                }
            }
            ',' if depth == 0 => {
                declarators.push(&text[start..i]);
                start = i + 1;
            }
            ';' if depth == 0 => {
                end = i;
                break;
            }
            '\n' if depth == 0 && !matches!(last_significant, ',' | '=') => {
                end = i;
                break;
            }
            _ => {}
        }
        if !c.is_whitespace() {
            last_significant = c;
        }
        i += 1;
    }
    if start <= end && end <= text.len() {
        declarators.push(&text[start..end]);
    }

    for declarator in declarators {
        let target = declarator.split_once('=').map_or(declarator, |(lhs, _)| lhs).trim();
        if let Some(pattern) = target.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            for part in pattern.split(',') {
                let part = part.trim().trim_start_matches("...");
                let binding = part.split_once(':').map_or(part, |(_, b)| b);
                let binding = binding.split_once('=').map_or(binding, |(b, _)| b).trim();
                if is_identifier(binding) {
                    names.push(binding.to_string());
                }
            }
        } else if let Some(pattern) = target.strip_prefix('[').and_then(|p| p.strip_suffix(']')) {
            for part in pattern.split(',') {
                let part = part.trim().trim_start_matches("...");
                let binding = part.split_once('=').map_or(part, |(b, _)| b).trim();
                if is_identifier(binding) {
                    names.push(binding.to_string());
                }
            }
        } else if is_identifier(target) {
            names.push(target.to_string());
        }
    }
    names
}
