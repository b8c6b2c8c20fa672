//! Dependency scanners.
//!
//! Sources are scanned, not parsed: comments are blanked out first so commented
//! imports are ignored, then statements are matched with regular expressions.
//! Every record carries its byte span so code generation can rewrite it.

pub mod css;
pub mod html;
pub mod script;

pub use css::{CssReference, scan_css};
pub use html::{HtmlReference, scan_html};
pub use script::{
    ExportKind, ExportRecord, ImportClause, ImportRecord, ImportSyntax, ReExportClause, ScriptScan,
    scan_script,
};

/// Replace comments with spaces, keeping byte offsets and newlines intact.
///
/// `line_comments` enables `//` comments (scripts); CSS only has block comments.
/// String literals are skipped so `"http://x"` survives.
pub fn mask_comments(source: &str, line_comments: bool) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < len {
                    match bytes[i] {
                        b'\\' => i += 2,
                        b if b == quote => {
                            i += 1;
                            break;
                        }
                        b'\n' if quote != b'`' => break,
                        _ => i += 1,
                    }
                }
            }
            b'/' if line_comments && bytes.get(i + 1) == Some(&b'/') => {
                while i < len && bytes[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = source[i + 2..]
                    .find("*/")
                    .map(|offset| i + 2 + offset + 2)
                    .unwrap_or(len);
                for byte in &mut out[i..end] {
                    if *byte != b'\n' {
                        *byte = b' ';
                    }
                }
                i = end;
            }
            _ => i += 1,
        }
    }

    // Only whole characters inside comments were replaced.
    String::from_utf8(out).unwrap_or_else(|_| source.to_string())
}

/// Like [`mask_comments`] for scripts, but string and template literal
/// contents are blanked too (the quotes stay). Offsets and newlines are kept.
pub fn mask_literals(source: &str) -> String {
    let masked = mask_comments(source, true);
    let bytes = masked.as_bytes();
    let mut out = bytes.to_vec();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < len {
                    match bytes[i] {
                        b'\\' => {
                            out[i] = b' ';
                            if i + 1 < len && bytes[i + 1] != b'\n' {
                                out[i + 1] = b' ';
                            }
                            i += 2;
                        }
                        b if b == quote => {
                            i += 1;
                            break;
                        }
                        b'\n' if quote != b'`' => break,
                        b'\n' => i += 1,
                        _ => {
                            out[i] = b' ';
                            i += 1;
                        }
                    }
                }
            }
            _ => i += 1,
        }
    }

    String::from_utf8(out).unwrap_or(masked)
}

/// Whether `name` is a plain JavaScript identifier.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_line_and_block_comments() {
        let src = "a // import 'x'\n/* require('y') */b";
        let masked = mask_comments(src, true);
        assert_eq!(masked.len(), src.len());
        assert!(!masked.contains("import"));
        assert!(!masked.contains("require"));
        assert!(masked.starts_with("a "));
        assert!(masked.ends_with('b'));
        assert_eq!(masked.matches('\n').count(), 1);
    }

    #[test]
    fn strings_are_left_alone() {
        let src = r#"const u = "http://example.com"; // gone"#;
        let masked = mask_comments(src, true);
        assert!(masked.contains("http://example.com"));
        assert!(!masked.contains("gone"));
    }

    #[test]
    fn css_keeps_double_slashes() {
        let src = "a { background: url(http://x/y.png) } /* c */";
        let masked = mask_comments(src, false);
        assert!(masked.contains("http://x/y.png"));
        assert!(!masked.contains("/* c */"));
    }

    #[test]
    fn multibyte_text_in_comments_stays_valid() {
        let src = "x /* héllo */ y";
        let masked = mask_comments(src, true);
        assert_eq!(masked.len(), src.len());
        assert!(masked.ends_with(" y"));
    }

    #[test]
    fn literal_contents_are_blanked() {
        let src = "var a = 'var x'; debugger; // var\nconst t = `console.log(${b})`;";
        let masked = mask_literals(src);
        assert_eq!(masked.len(), src.len());
        assert_eq!(masked.matches("var").count(), 1);
        assert!(masked.contains("debugger;"));
        assert!(!masked.contains("console"));
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("$a_1"));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }
}
