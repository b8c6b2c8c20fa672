//! Source checks run over script modules before chunking.
//!
//! Rules match on the module text with comments and literal contents
//! blanked out, so `"var x"` in a string or a commented-out `debugger` is
//! not reported.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tote_config::{ConfigError, LintConfig, LintLevel};
use tote_graph::scan::mask_literals;
use tote_graph::{Module, ModuleGraph, ModuleKind};

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSeverity, line_column};

struct Rule {
    name: &'static str,
    pattern: &'static LazyLock<Regex>,
    message: fn(&str) -> String,
    help: &'static str,
}

// Group 1 is the offending token. The leading class keeps member accesses
// such as `x.var` or `obj.console` from matching.
static NO_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^.\w$])(var)\s+[A-Za-z_$\[{]").expect("static regex"));
static NO_DEBUGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^.\w$])(debugger)\b").expect("static regex"));
static NO_CONSOLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^.\w$])(console)\s*\.").expect("static regex"));
static NO_ALERT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^.\w$])(alert|confirm|prompt)\s*\(").expect("static regex")
});

static RULES: &[Rule] = &[
    Rule {
        name: "no-var",
        pattern: &NO_VAR,
        message: |_| "Unexpected var, use let or const instead.".to_string(),
        help: "Declare the binding with `let` or `const`.",
    },
    Rule {
        name: "no-debugger",
        pattern: &NO_DEBUGGER,
        message: |_| "Unexpected 'debugger' statement.".to_string(),
        help: "Remove the statement before shipping.",
    },
    Rule {
        name: "no-console",
        pattern: &NO_CONSOLE,
        message: |_| "Unexpected console statement.".to_string(),
        help: "Remove the call or route it through a logger.",
    },
    Rule {
        name: "no-alert",
        pattern: &NO_ALERT,
        message: |token| format!("Unexpected {token}."),
        help: "Use an in-page dialog instead.",
    },
];

/// Compiled lint plugin options.
pub struct Linter {
    rules: Vec<(&'static Rule, DiagnosticSeverity)>,
    exclude: Option<Regex>,
}

impl Linter {
    pub fn new(config: &LintConfig) -> Result<Self, ConfigError> {
        let mut rules = Vec::new();
        for (name, level) in &config.rules {
            let Some(rule) = RULES.iter().find(|r| r.name == name.as_str()) else {
                return Err(ConfigError::InvalidValue {
                    field: format!("plugins.lint.rules.{name}"),
                    hint: Some(format!(
                        "known rules: {}",
                        RULES.iter().map(|r| r.name).collect::<Vec<_>>().join(", ")
                    )),
                });
            };
            let severity = match level {
                LintLevel::Off => continue,
                LintLevel::Warn => DiagnosticSeverity::Warning,
                LintLevel::Error => DiagnosticSeverity::Error,
            };
            rules.push((rule, severity));
        }

        let exclude = config
            .exclude
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
                    field: "plugins.lint.exclude".to_string(),
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self { rules, exclude })
    }

    fn skips(&self, module: &Module) -> bool {
        let path = module.id.path_string().replace('\\', "/");
        path.contains("/node_modules/") || self.exclude.as_ref().is_some_and(|re| re.is_match(&path))
    }

    /// Findings for one module, in source order per rule.
    pub fn check(&self, module: &Module, root: &Path) -> Vec<Diagnostic> {
        if module.kind != ModuleKind::Script || self.rules.is_empty() || self.skips(module) {
            return Vec::new();
        }
        let source = module.output.as_ref();
        let masked = mask_literals(source);
        let file = module.id.relative_to(root);

        let mut found = Vec::new();
        for (rule, severity) in &self.rules {
            for caps in rule.pattern.captures_iter(&masked) {
                let Some(token) = caps.get(1) else { continue };
                let (line, column) = line_column(source, token.start());
                found.push(
                    Diagnostic::new(
                        DiagnosticKind::Lint(rule.name.to_string()),
                        *severity,
                        (rule.message)(token.as_str()),
                    )
                    .with_file(file.clone())
                    .with_position(line, column)
                    .with_help(rule.help),
                );
            }
        }
        found.sort_by_key(|d| (d.line, d.column));
        found
    }

    /// Findings for every module of `graph`, in module path order.
    pub fn check_graph(&self, graph: &ModuleGraph, root: &Path) -> Vec<Diagnostic> {
        graph
            .modules()
            .iter()
            .flat_map(|module| self.check(module, root))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use tote_graph::ModuleId;

    use super::*;

    fn linter(rules: &[(&str, LintLevel)]) -> Linter {
        let config = LintConfig {
            rules: rules
                .iter()
                .map(|(name, level)| (name.to_string(), *level))
                .collect::<IndexMap<_, _>>(),
            exclude: None,
        };
        Linter::new(&config).unwrap()
    }

    fn script(path: &str, code: &str) -> Module {
        Module::builder(ModuleId::new(path).unwrap(), ModuleKind::Script)
            .output(code)
            .build()
    }

    #[test]
    fn reports_positions() {
        let linter = linter(&[("no-var", LintLevel::Error), ("no-console", LintLevel::Warn)]);
        let module = script("/app/src/a.js", "let ok = 1;\n  var x = 1;\nconsole.log(x);\n");
        let found = linter.check(&module, Path::new("/app"));

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].code(), "no-var");
        assert!(found[0].is_error());
        assert_eq!((found[0].line, found[0].column), (Some(2), Some(3)));
        assert_eq!(found[0].to_string(), "./src/a.js:2:3: Unexpected var, use let or const instead. (no-var)");
        assert_eq!(found[1].code(), "no-console");
        assert_eq!(found[1].severity, DiagnosticSeverity::Warning);
    }

    #[test]
    fn literals_comments_and_members_are_ignored() {
        let linter = linter(&[
            ("no-var", LintLevel::Error),
            ("no-debugger", LintLevel::Error),
            ("no-alert", LintLevel::Error),
        ]);
        let module = script(
            "/app/src/a.js",
            "const s = 'var x = 1';\n// debugger\nobj.alert('hi');\nconst variable = 2;\n",
        );
        assert!(linter.check(&module, Path::new("/app")).is_empty());

        let module = script("/app/src/b.js", "if (x) { debugger; }\nalert('no');");
        let found = linter.check(&module, Path::new("/app"));
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].message, "Unexpected alert.");
    }

    #[test]
    fn off_rules_and_excluded_paths() {
        let linter = linter(&[("no-var", LintLevel::Off)]);
        assert!(linter.check(&script("/app/a.js", "var a = 1;"), Path::new("/app")).is_empty());

        let linter = self::linter(&[("no-var", LintLevel::Error)]);
        let vendored = script("/app/node_modules/lib/index.js", "var a = 1;");
        assert!(linter.check(&vendored, Path::new("/app")).is_empty());
    }

    #[test]
    fn unknown_rule_is_a_config_error() {
        let config = LintConfig {
            rules: IndexMap::from([("no-eval".to_string(), LintLevel::Error)]),
            exclude: None,
        };
        assert!(matches!(Linter::new(&config), Err(ConfigError::InvalidValue { .. })));
    }
}
