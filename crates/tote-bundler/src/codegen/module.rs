//! Module factories.
//!
//! Scripts are rewritten statement by statement using the scanner's spans:
//! imports become `__tote_require__` calls bound with `var`, exports become
//! getters installed before the module body runs. Bindings of named imports
//! are read once, when the import statement executes.

use tote_graph::scan::{ExportKind, ImportSyntax, ReExportClause, scan_html, scan_script};
use tote_graph::{AssetMode, DependencyKind, Module, ModuleKind};

use super::{AssetRef, RenderContext, js_string, splice};
use crate::codegen::css::rewrite_css;

/// `"./src/a.js": function (module, exports, __tote_require__) { … }`
pub fn render_module(module: &Module, ctx: &RenderContext<'_>) -> String {
    let key = js_string(&ctx.module_key(&module.id));
    let body = module_body(module, ctx);
    format!(
        "{key}: function (module, exports, __tote_require__) {{\n{}\n}}",
        body.trim_end()
    )
}

fn module_body(module: &Module, ctx: &RenderContext<'_>) -> String {
    match module.kind {
        ModuleKind::Script => rewrite_script(module, ctx),
        ModuleKind::Json => format!("module.exports = {};", module.output.trim()),
        ModuleKind::Style if ctx.extract_css => String::new(),
        ModuleKind::Style => {
            let mut lines: Vec<String> = module
                .dependencies
                .iter()
                .filter(|d| d.kind == DependencyKind::StyleImport)
                .map(|d| format!("__tote_require__({});", js_string(&ctx.module_key(&d.resolved))))
                .collect();
            lines.push(format!(
                "__tote_require__.s({}, {});",
                js_string(&rewrite_css(module, ctx)),
                js_string(&ctx.module_key(&module.id))
            ));
            lines.join("\n")
        }
        ModuleKind::Asset(AssetMode::Source) => {
            format!("module.exports = {};", js_string(&rewrite_markup(module, ctx)))
        }
        ModuleKind::Asset(_) => match ctx.assets.get(&module.id) {
            Some(AssetRef::File(file)) => {
                format!("module.exports = __tote_require__.p + {};", js_string(file))
            }
            Some(AssetRef::DataUrl(url)) => format!("module.exports = {};", js_string(url)),
            None => {
                tracing::warn!(module = %module.id, "asset has no emitted file");
                "module.exports = \"\";".to_string()
            }
        },
    }
}

/// Source text with the `src`/`href` attributes of bundled resources
/// pointing at their emitted files.
fn rewrite_markup(module: &Module, ctx: &RenderContext<'_>) -> String {
    let source = module.output.as_ref();
    if module.dependencies.is_empty() {
        return source.to_string();
    }
    let edits = scan_html(source)
        .into_iter()
        .filter_map(|reference| {
            let url = module
                .resolved(&reference.specifier)
                .and_then(|target| ctx.asset_url(target))?;
            Some((reference.span, format!("\"{}\"", url.replace('"', "&quot;"))))
        })
        .collect();
    splice(source, edits)
}

fn rewrite_script(module: &Module, ctx: &RenderContext<'_>) -> String {
    let source = module.output.as_ref();
    let scan = scan_script(source);
    let syntax = ctx.syntax;

    let mut edits = Vec::with_capacity(scan.imports.len() + scan.exports.len());
    // (exported name, expression)
    let mut getters: Vec<(String, String)> = Vec::new();
    let mut counter = 0usize;
    let mut next_binding = || {
        let name = format!("__tote_m{counter}__");
        counter += 1;
        name
    };

    for import in &scan.imports {
        let Some(target) = module.resolved(&import.specifier) else {
            continue;
        };
        let key = js_string(&ctx.module_key(target));
        let load = format!("__tote_require__.i(__tote_require__({key}))");

        let replacement = match &import.syntax {
            ImportSyntax::Declaration(clause) => {
                let ns = next_binding();
                let mut parts = vec![format!("var {ns} = {load};")];
                if let Some(local) = &clause.default {
                    parts.push(format!("var {local} = {ns}[\"default\"];"));
                }
                if let Some(local) = &clause.namespace {
                    parts.push(format!("var {local} = {ns};"));
                }
                for (imported, local) in &clause.named {
                    parts.push(format!("var {local} = {ns}[{}];", js_string(imported)));
                }
                parts.join(" ")
            }
            ImportSyntax::SideEffect => format!("__tote_require__({key});"),
            ImportSyntax::ReExport(ReExportClause::All) => {
                format!("__tote_require__.a(exports, __tote_require__({key}));")
            }
            ImportSyntax::ReExport(ReExportClause::Namespace(name)) => {
                let ns = next_binding();
                getters.push((name.clone(), ns.clone()));
                format!("var {ns} = {load};")
            }
            ImportSyntax::ReExport(ReExportClause::Named(pairs)) => {
                let ns = next_binding();
                for (imported, exported) in pairs {
                    getters.push((exported.clone(), format!("{ns}[{}]", js_string(imported))));
                }
                format!("var {ns} = {load};")
            }
            ImportSyntax::Dynamic => {
                let chunk = ctx
                    .chunks
                    .async_chunk_for(target)
                    .map(|idx| ctx.chunks.chunk(idx));
                let ensure = match chunk {
                    Some(chunk) if !chunk.group.is_empty() => {
                        format!("__tote_require__.e({})", js_string(&chunk.name))
                    }
                    _ => "Promise.resolve()".to_string(),
                };
                format!(
                    "{ensure}.then({} {{ return {load}; }})",
                    syntax.function("")
                )
            }
            ImportSyntax::Require => format!("__tote_require__({key})"),
        };
        edits.push((import.span.clone(), replacement));
    }

    for export in &scan.exports {
        let replacement = match &export.kind {
            ExportKind::Declaration { names } => {
                getters.extend(names.iter().map(|name| (name.clone(), name.clone())));
                String::new()
            }
            ExportKind::DefaultDeclaration { name } => {
                getters.push(("default".to_string(), name.clone()));
                String::new()
            }
            ExportKind::DefaultExpression => {
                getters.push(("default".to_string(), "__tote_default__".to_string()));
                "var __tote_default__ = ".to_string()
            }
            ExportKind::List(pairs) => {
                getters.extend(
                    pairs
                        .iter()
                        .map(|(local, exported)| (exported.clone(), local.clone())),
                );
                String::new()
            }
        };
        edits.push((export.span.clone(), replacement));
    }

    let mut prologue = String::new();
    if scan.is_esm() {
        prologue.push_str("\"use strict\";\n__tote_require__.o(exports);\n");
    }
    if !getters.is_empty() {
        let entries: Vec<String> = getters
            .iter()
            .map(|(name, expr)| format!("{}: {}", js_string(name), syntax.getter(expr)))
            .collect();
        prologue.push_str(&format!("__tote_require__.d(exports, {{ {} }});\n", entries.join(", ")));
    }

    let rewritten = splice(source, edits);
    format!("{prologue}{rewritten}")
}
