//! A small LESS compiler.
//!
//! Supports what stylesheets in a plain web app typically use: `//` line
//! comments, `@variables` (with `@{name}` interpolation), nested rules with
//! `&` parent references, and `@media` blocks nested inside rules. Mixins,
//! guards, operations and functions are not supported and pass through as
//! written.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::TransformError;

static VAR_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z_][\w-]*)\s*:\s*([^;{}]+);").expect("static regex"));

static VAR_INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\{([A-Za-z_][\w-]*)\}").expect("static regex"));

static VAR_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z_][\w-]*)").expect("static regex"));

const MAX_VARIABLE_DEPTH: usize = 16;

/// Compile LESS source into CSS.
pub fn compile(source: &str) -> Result<String, TransformError> {
    let stripped = strip_comments(source);
    let (without_vars, variables) = extract_variables(&stripped)?;
    let substituted = substitute(&without_vars, &variables);

    let mut parser = Parser {
        chars: substituted.chars().collect(),
        pos: 0,
        line: 1,
    };
    let nodes = parser.parse_block(false)?;

    let mut out = String::new();
    emit(&nodes, &[], &mut out)?;
    Ok(out)
}

/// Remove comments. `//` only counts outside strings and parentheses (`url(http://…)`).
fn strip_comments(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    let mut parens = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        out.push(chars[i + 1]);
                        i += 2;
                        continue;
                    }
                    i += 1;
                    if chars[i - 1] == c {
                        break;
                    }
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        i += 2;
                        break;
                    }
                    if chars[i] == '\n' {
                        out.push('\n');
                    }
                    i += 1;
                }
            }
            '/' if parens == 0 && chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '(' => {
                parens += 1;
                out.push(c);
                i += 1;
            }
            ')' => {
                parens = parens.saturating_sub(1);
                out.push(c);
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn extract_variables(source: &str) -> Result<(String, HashMap<String, String>), TransformError> {
    let mut variables = HashMap::new();
    for caps in VAR_DECL.captures_iter(source) {
        variables.insert(caps[1].to_string(), caps[2].trim().to_string());
    }
    let stripped = VAR_DECL.replace_all(source, "").into_owned();

    // Variables may refer to each other in any order; resolve to a fixed point.
    let names: Vec<String> = variables.keys().cloned().collect();
    for _ in 0..MAX_VARIABLE_DEPTH {
        let mut changed = false;
        for name in &names {
            let value = variables[name].clone();
            let next = substitute(&value, &variables);
            if next != value {
                variables.insert(name.clone(), next);
                changed = true;
            }
        }
        if !changed {
            return Ok((stripped, variables));
        }
    }
    Err(TransformError::Less {
        line: 0,
        message: "variables refer to each other recursively".to_string(),
    })
}

fn substitute(text: &str, variables: &HashMap<String, String>) -> String {
    let interpolated = VAR_INTERPOLATION.replace_all(text, |caps: &Captures<'_>| {
        variables
            .get(&caps[1])
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    });
    VAR_REF
        .replace_all(&interpolated, |caps: &Captures<'_>| {
            variables
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[derive(Debug)]
enum Node {
    Declaration(String),
    Rule { selector: String, children: Vec<Node> },
    AtRule { prelude: String, children: Option<Vec<Node>> },
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Parser {
    fn error(&self, message: impl Into<String>) -> TransformError {
        TransformError::Less {
            line: self.line,
            message: message.into(),
        }
    }

    fn parse_block(&mut self, nested: bool) -> Result<Vec<Node>, TransformError> {
        let mut nodes = Vec::new();
        let mut buffer = String::new();
        let mut parens = 0usize;

        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            self.pos += 1;
            match c {
                '\n' => {
                    self.line += 1;
                    buffer.push(c);
                }
                '"' | '\'' => {
                    buffer.push(c);
                    while self.pos < self.chars.len() {
                        let next = self.chars[self.pos];
                        self.pos += 1;
                        buffer.push(next);
                        if next == '\\' && self.pos < self.chars.len() {
                            buffer.push(self.chars[self.pos]);
                            self.pos += 1;
                        } else if next == c {
                            break;
                        }
                    }
                }
                '(' => {
                    parens += 1;
                    buffer.push(c);
                }
                ')' => {
                    parens = parens.saturating_sub(1);
                    buffer.push(c);
                }
                ';' if parens == 0 => {
                    push_statement(&mut nodes, &buffer);
                    buffer.clear();
                }
                '{' if parens == 0 => {
                    let prelude = collapse(&buffer);
                    buffer.clear();
                    let children = self.parse_block(true)?;
                    if prelude.starts_with('@') {
                        nodes.push(Node::AtRule {
                            prelude,
                            children: Some(children),
                        });
                    } else if prelude.is_empty() {
                        return Err(self.error("block without a selector"));
                    } else {
                        nodes.push(Node::Rule {
                            selector: prelude,
                            children,
                        });
                    }
                }
                '}' if parens == 0 => {
                    if !nested {
                        return Err(self.error("unexpected '}'"));
                    }
                    push_statement(&mut nodes, &buffer);
                    return Ok(nodes);
                }
                _ => buffer.push(c),
            }
        }

        if nested {
            return Err(self.error("missing closing '}'"));
        }
        push_statement(&mut nodes, &buffer);
        Ok(nodes)
    }
}

fn push_statement(nodes: &mut Vec<Node>, buffer: &str) {
    let statement = buffer.trim();
    if statement.is_empty() {
        return;
    }
    if statement.starts_with('@') {
        nodes.push(Node::AtRule {
            prelude: collapse(statement),
            children: None,
        });
    } else {
        nodes.push(Node::Declaration(statement.to_string()));
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Combine parent selectors with a nested selector.
fn combine(parents: &[String], selector: &str) -> Vec<String> {
    let parts: Vec<&str> = selector.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    if parents.is_empty() {
        return parts.into_iter().map(str::to_string).collect();
    }
    let mut combined = Vec::with_capacity(parents.len() * parts.len());
    for parent in parents {
        for part in &parts {
            if part.contains('&') {
                combined.push(part.replace('&', parent));
            } else {
                combined.push(format!("{parent} {part}"));
            }
        }
    }
    combined
}

fn is_conditional_at_rule(prelude: &str) -> bool {
    ["@media", "@supports", "@container", "@document", "@layer"]
        .iter()
        .any(|kw| prelude.starts_with(kw))
}

fn emit(nodes: &[Node], parents: &[String], out: &mut String) -> Result<(), TransformError> {
    let declarations: Vec<&str> = nodes
        .iter()
        .filter_map(|n| match n {
            Node::Declaration(d) => Some(d.as_str()),
            _ => None,
        })
        .collect();

    if !declarations.is_empty() {
        if let Some(undefined) = declarations
            .iter()
            .find_map(|d| VAR_REF.captures(d).map(|c| c[1].to_string()))
        {
            return Err(TransformError::Less {
                line: 0,
                message: format!("variable @{undefined} is undefined"),
            });
        }
        if parents.is_empty() {
            for declaration in &declarations {
                out.push_str(declaration);
                out.push_str(";\n");
            }
        } else {
            out.push_str(&parents.join(",\n"));
            out.push_str(" {\n");
            for declaration in &declarations {
                out.push_str("  ");
                out.push_str(declaration);
                out.push_str(";\n");
            }
            out.push_str("}\n");
        }
    }

    for node in nodes {
        match node {
            Node::Declaration(_) => {}
            Node::Rule { selector, children } => {
                let selectors = combine(parents, selector);
                emit(children, &selectors, out)?;
            }
            Node::AtRule {
                prelude,
                children: None,
            } => {
                out.push_str(prelude);
                out.push_str(";\n");
            }
            Node::AtRule {
                prelude,
                children: Some(children),
            } => {
                out.push_str(prelude);
                out.push_str(" {\n");
                if is_conditional_at_rule(prelude) {
                    emit(children, parents, out)?;
                } else {
                    emit(children, &[], out)?;
                }
                out.push_str("}\n");
            }
        }
    }
    Ok(())
}
