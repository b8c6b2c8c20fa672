//! Line-level source maps for scripts.
//!
//! Module boundaries are exact: every line of a factory maps into that
//! module's file. Inside a factory, lines are matched from the bottom, since
//! code generation only adds a prologue above the module's own lines.
//! Runtime lines outside any factory stay unmapped.

use std::borrow::Cow;

use sourcemap::SourceMapBuilder;

use crate::{Error, Result};

/// A module factory as it appears in a rendered script.
#[derive(Debug)]
pub struct MappedModule<'a> {
    /// URL written to `sources`.
    pub source: String,
    /// Original file text, written to `sourcesContent`.
    pub content: Cow<'a, str>,
    /// Factory text, verbatim.
    pub factory: &'a str,
}

/// Source map JSON for `script`, whose factories are `modules` joined with
/// `,\n`. `None` when that block does not occur in the script verbatim.
pub fn script_source_map(file: &str, script: &str, modules: &[MappedModule<'_>]) -> Result<Option<Vec<u8>>> {
    if modules.is_empty() {
        return Ok(None);
    }
    let joined = modules
        .iter()
        .map(|m| m.factory)
        .collect::<Vec<_>>()
        .join(",\n");
    let Some(start) = script.find(&joined) else {
        tracing::debug!(file, "factories not found in script, no source map");
        return Ok(None);
    };

    let mut builder = SourceMapBuilder::new(Some(file));
    let mut line = line_count(&script[..start]) - 1;
    for module in modules {
        let src_id = builder.add_source(&module.source);
        builder.set_source_contents(src_id, Some(module.content.as_ref()));
        for (generated, original) in factory_lines(module.factory, &module.content) {
            builder.add_raw(line + generated, 0, original, 0, Some(src_id), None, false);
        }
        line += line_count(module.factory);
    }

    let mut json = Vec::new();
    builder
        .into_sourcemap()
        .to_writer(&mut json)
        .map_err(|e| Error::WriteFailure(format!("{file}.map: {e}")))?;
    Ok(Some(json))
}

/// `(factory line, original line)` for every line of one factory.
fn factory_lines(factory: &str, content: &str) -> Vec<(u32, u32)> {
    let total = line_count(factory);
    let original_lines = content.lines().count().max(1) as u32;
    let last = original_lines - 1;
    // Header and closing brace frame the body.
    let body = total.saturating_sub(2);
    let prologue = body.saturating_sub(original_lines);

    let mut lines = Vec::with_capacity(total as usize);
    lines.push((0, 0));
    for offset in 0..body {
        lines.push((offset + 1, offset.saturating_sub(prologue).min(last)));
    }
    if total > 1 {
        lines.push((total - 1, last));
    }
    lines
}

fn line_count(text: &str) -> u32 {
    text.matches('\n').count() as u32 + 1
}

/// The trailing comment that points a script at its map.
pub fn mapping_comment(url: &str) -> String {
    format!("//# sourceMappingURL={url}\n")
}

#[cfg(test)]
mod tests {
    use sourcemap::SourceMap;

    use super::*;

    fn module<'a>(source: &str, content: &'a str, factory: &'a str) -> MappedModule<'a> {
        MappedModule {
            source: source.to_string(),
            content: Cow::Borrowed(content),
            factory,
        }
    }

    #[test]
    fn factory_lines_map_into_their_modules() {
        let a = "\"./src/a.js\": function (module, exports, __tote_require__) {\n\"use strict\";\nvar x = 1;\nconsole.log(x);\n}";
        let b = "\"./src/b.js\": function (module, exports, __tote_require__) {\nmodule.exports = 2;\n}";
        let script = format!("(function () {{\nvar __tote_modules__ = {{\n{a},\n{b}\n}};\nrun();\n}})();\n");
        let modules = [
            module("tote:///src/a.js", "var x = 1;\nconsole.log(x);\n", a),
            module("tote:///src/b.js", "module.exports = 2;\n", b),
        ];

        let json = script_source_map("main.js", &script, &modules).unwrap().unwrap();
        let map = SourceMap::from_slice(&json).unwrap();

        assert_eq!(map.get_file(), Some("main.js"));
        assert_eq!(map.get_source_contents(0), Some("var x = 1;\nconsole.log(x);\n"));

        // Line 4 is `var x = 1;`, line 5 is `console.log(x);`.
        let token = map.lookup_token(4, 0).unwrap();
        assert_eq!((token.get_source(), token.get_src_line()), (Some("tote:///src/a.js"), 0));
        let token = map.lookup_token(5, 0).unwrap();
        assert_eq!((token.get_source(), token.get_src_line()), (Some("tote:///src/a.js"), 1));
        let token = map.lookup_token(7, 0).unwrap();
        assert_eq!((token.get_source(), token.get_src_line()), (Some("tote:///src/b.js"), 0));
    }

    #[test]
    fn rewritten_scripts_get_no_map() {
        let factory = "\"./a.js\": function (module, exports, __tote_require__) {\nx();\n}";
        let modules = [module("tote:///a.js", "x();\n", factory)];
        assert!(script_source_map("a.js", "minified", &modules).unwrap().is_none());
        assert!(script_source_map("a.js", "", &[]).unwrap().is_none());
    }

    #[test]
    fn prologue_lines_map_to_the_first_line() {
        let lines = factory_lines("head\np1\np2\nl1\nl2\n}", "l1\nl2");
        assert_eq!(lines, vec![(0, 0), (1, 0), (2, 0), (3, 0), (4, 1), (5, 1)]);
    }
}
