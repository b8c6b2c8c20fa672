//! Non-fatal findings reported by a build.
//!
//! Lint rules and performance hints produce [`Diagnostic`]s. Warnings are
//! returned with the build output; errors abort the build through
//! [`crate::Error::Lint`] or [`crate::Error::Performance`], which list them
//! as related miette diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: DiagnosticSeverity,
    pub message: String,
    /// Module path or output file name the finding is about.
    pub file: Option<String>,
    /// 1-based line, when the finding points into source text.
    pub line: Option<u32>,
    /// 1-based column in characters.
    pub column: Option<u32>,
    pub help: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A lint rule, by name (`no-var`, ...).
    Lint(String),
    AssetSize,
    EntrypointSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            file: None,
            line: None,
            column: None,
            help: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_position(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }

    /// Stable short code: the rule name for lint findings.
    pub fn code(&self) -> &str {
        match &self.kind {
            DiagnosticKind::Lint(rule) => rule,
            DiagnosticKind::AssetSize => "asset-size",
            DiagnosticKind::EntrypointSize => "entrypoint-size",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(column)) => write!(f, "{file}:{line}:{column}: ")?,
            (Some(file), _, _) => write!(f, "{file}: ")?,
            _ => {}
        }
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for Diagnostic {}

impl miette::Diagnostic for Diagnostic {
    fn code(&self) -> Option<Box<dyn fmt::Display + '_>> {
        Some(Box::new(Diagnostic::code(self)))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            DiagnosticSeverity::Error => miette::Severity::Error,
            DiagnosticSeverity::Warning => miette::Severity::Warning,
        })
    }

    fn help(&self) -> Option<Box<dyn fmt::Display + '_>> {
        self.help
            .as_deref()
            .map(|help| Box::new(help) as Box<dyn fmt::Display>)
    }
}

/// 1-based line and character column of byte `offset` in `source`.
pub(crate) fn line_column(source: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line as u32, column as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location_and_code() {
        let diag = Diagnostic::new(
            DiagnosticKind::Lint("no-var".into()),
            DiagnosticSeverity::Error,
            "Unexpected var, use let or const instead",
        )
        .with_file("src/index.js")
        .with_position(3, 1);
        assert_eq!(
            diag.to_string(),
            "src/index.js:3:1: Unexpected var, use let or const instead (no-var)"
        );
        assert!(diag.is_error());
    }

    #[test]
    fn line_column_counts_characters() {
        let src = "ab\ncé x";
        assert_eq!(line_column(src, 0), (1, 1));
        assert_eq!(line_column(src, 3), (2, 1));
        // 'x' follows a two-byte character
        assert_eq!(line_column(src, src.find('x').unwrap()), (2, 4));
    }
}
