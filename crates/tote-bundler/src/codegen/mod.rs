//! Script and stylesheet generation.
//!
//! Every module becomes a factory `function (module, exports, __tote_require__)`
//! keyed by its root-relative path. Entry chunks carry the runtime that
//! registers factories, runs them on demand and loads other chunks; every
//! other chunk only pushes its factories onto a global array.

pub mod css;
pub mod module;
pub mod runtime;
pub mod source_map;

use std::ops::Range;
use std::path::Path;

use rustc_hash::FxHashMap;
use tote_config::EnvironmentConfig;
use tote_graph::ModuleId;

use crate::chunk::ChunkGraph;

pub use css::rewrite_css;
pub use module::render_module;
pub use runtime::{ChunkFiles, EntryRuntime, render_chunk_script, render_entry_script};

/// Global array non-entry chunks push onto.
pub const CHUNK_ARRAY: &str = "toteChunk";

/// Syntax the generated code may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Syntax {
    pub arrow_function: bool,
    pub const_bindings: bool,
}

impl From<EnvironmentConfig> for Syntax {
    fn from(env: EnvironmentConfig) -> Self {
        Self {
            arrow_function: env.arrow_function,
            const_bindings: env.const_bindings,
        }
    }
}

impl Syntax {
    /// Function expression head: `function (a, b)` or `(a, b) =>`.
    pub fn function(&self, params: &str) -> String {
        if self.arrow_function {
            format!("({params}) =>")
        } else {
            format!("function ({params})")
        }
    }

    /// Binding keyword for values that are never reassigned.
    pub fn binding(&self) -> &'static str {
        if self.const_bindings { "const" } else { "var" }
    }

    /// A zero-argument function returning `expr`.
    pub fn getter(&self, expr: &str) -> String {
        if self.arrow_function {
            format!("() => ({expr})")
        } else {
            format!("function () {{ return {expr}; }}")
        }
    }
}

/// An asset module after the asset phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    /// Emitted under this file name.
    File(String),
    DataUrl(String),
}

/// What module rendering needs to know about the rest of the build.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub root: &'a Path,
    pub chunks: &'a ChunkGraph,
    /// Where each resource or inline asset ended up.
    pub assets: &'a FxHashMap<ModuleId, AssetRef>,
    /// `output.public_path`, used when URLs are baked into CSS.
    pub public_path: &'a str,
    /// Styles go to `.css` files instead of being injected.
    pub extract_css: bool,
    pub syntax: Syntax,
}

impl RenderContext<'_> {
    /// Module id as it appears in generated code.
    pub fn module_key(&self, id: &ModuleId) -> String {
        id.relative_to(self.root)
    }

    /// URL of an asset as written into CSS.
    pub fn asset_url(&self, id: &ModuleId) -> Option<String> {
        self.assets.get(id).map(|asset| match asset {
            AssetRef::File(file) => format!("{}{}", self.public_path, file),
            AssetRef::DataUrl(url) => url.clone(),
        })
    }
}

/// JavaScript string literal for `text`.
pub fn js_string(text: &str) -> String {
    serde_json::Value::from(text).to_string()
}

/// Replace byte ranges of `source`. Edits must not overlap; they are applied
/// in order of position.
pub(crate) fn splice(source: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        if range.start < cursor || range.end > source.len() {
            continue;
        }
        out.push_str(&source[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&source[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_variants() {
        let modern = Syntax {
            arrow_function: true,
            const_bindings: true,
        };
        let legacy = Syntax {
            arrow_function: false,
            const_bindings: false,
        };
        assert_eq!(modern.function("a"), "(a) =>");
        assert_eq!(legacy.function("a"), "function (a)");
        assert_eq!(modern.binding(), "const");
        assert_eq!(legacy.binding(), "var");
        assert_eq!(legacy.getter("x"), "function () { return x; }");
        assert_eq!(modern.getter("x"), "() => (x)");
    }

    #[test]
    fn splice_applies_edits_in_order() {
        let out = splice(
            "import a from 'a';\nrun(a);",
            vec![(19..22, "go".into()), (0..18, "var a = 1;".into())],
        );
        assert_eq!(out, "var a = 1;\ngo(a);");
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(js_string("a\"b\n"), r#""a\"b\n""#);
    }
}
