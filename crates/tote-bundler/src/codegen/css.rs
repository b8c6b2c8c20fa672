//! Stylesheet output.

use tote_graph::scan::scan_css;
use tote_graph::{DependencyKind, Module};

use super::{RenderContext, splice};

/// CSS of one style module as it appears in output: `@import` rules are
/// dropped (imported sheets are modules of their own, ordered before their
/// importer) and `url()`s of bundled assets point at the emitted files.
pub fn rewrite_css(module: &Module, ctx: &RenderContext<'_>) -> String {
    let source = module.output.as_ref();
    let mut edits = Vec::new();

    for reference in scan_css(source) {
        match reference.kind {
            DependencyKind::StyleImport => {
                if !reference.media.is_empty() {
                    tracing::debug!(
                        module = %module.id,
                        media = %reference.media,
                        "media query on @import is not preserved"
                    );
                }
                edits.push((reference.span, String::new()));
            }
            DependencyKind::Url => {
                let url = module
                    .resolved(&reference.specifier)
                    .and_then(|target| ctx.asset_url(target));
                if let Some(url) = url {
                    edits.push((reference.span, format!("url({})", quote_url(&url))));
                }
            }
            _ => {}
        }
    }

    let rewritten = splice(source, edits);
    rewritten.trim_start_matches(['\n', '\r']).to_string()
}

/// Concatenated CSS of the style modules among `modules`, in order.
pub fn chunk_css<'a>(modules: impl IntoIterator<Item = &'a Module>, ctx: &RenderContext<'_>) -> String {
    let mut out = String::new();
    for module in modules.into_iter().filter(|m| m.kind.is_style()) {
        let css = rewrite_css(module, ctx);
        if css.trim().is_empty() {
            continue;
        }
        out.push_str(&css);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

fn quote_url(url: &str) -> String {
    if url.contains(['(', ')', ' ', '"', '\'']) {
        format!("\"{}\"", url.replace('"', "%22"))
    } else {
        url.to_string()
    }
}
