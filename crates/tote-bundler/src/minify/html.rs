//! HTML minification.
//!
//! Markup outside `<script>`, `<style>`, `<pre>` and `<textarea>` has its
//! comments, whitespace and attributes reduced according to
//! [`HtmlMinifyConfig`]. The contents of those four elements are left alone,
//! except that inline scripts and styles can be handed to the script and
//! stylesheet minifiers.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tote_config::HtmlMinifyConfig;

use super::{minify_css, minify_js};

static RAW_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(script|style|pre|textarea)\b[^>]*>").expect("static regex")
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static regex"));

static START_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<([A-Za-z][A-Za-z0-9-]*)((?:\s+[^\s"'=<>/]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#,
    )
    .expect("static regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'=<>/]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("static regex")
});

static UNQUOTABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[^\s"'=<>`]+$"#).expect("static regex"));

const EMPTY_REMOVABLE: &[&str] = &["class", "id", "style", "title", "lang", "dir"];

/// Options used in production when an HTML plugin has no `minify` table.
pub fn production_options() -> HtmlMinifyConfig {
    HtmlMinifyConfig {
        collapse_whitespace: true,
        remove_comments: true,
        remove_attribute_quotes: true,
        remove_empty_attributes: true,
        remove_script_type_attributes: true,
        remove_style_link_type_attributes: true,
        minify_css: true,
        minify_js: true,
    }
}

pub fn minify_html(html: &str, options: &HtmlMinifyConfig) -> String {
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;

    while let Some(open) = RAW_OPEN.captures(&html[cursor..]) {
        let Some(whole) = open.get(0) else { break };
        let start = cursor + whole.start();
        let body_start = cursor + whole.end();
        let name = open[1].to_ascii_lowercase();

        out.push_str(&minify_markup(&html[cursor..start], options, cursor == 0, false));
        out.push_str(&rewrite_tags(whole.as_str(), options));

        // Offsets survive ASCII lowercasing.
        let closing = format!("</{name}");
        let body_end = html[body_start..]
            .to_ascii_lowercase()
            .find(&closing)
            .map_or(html.len(), |p| body_start + p);
        out.push_str(&raw_body(&name, whole.as_str(), &html[body_start..body_end], options));
        cursor = body_end;
    }

    out.push_str(&minify_markup(&html[cursor..], options, cursor == 0, true));
    out
}

fn raw_body(name: &str, open_tag: &str, body: &str, options: &HtmlMinifyConfig) -> String {
    match name {
        "script" if options.minify_js && is_script_type(open_tag) => minify_js(body),
        "style" if options.minify_css => minify_css(body),
        _ => body.to_string(),
    }
}

/// Classic and module scripts; data blocks such as JSON or templates are kept.
fn is_script_type(open_tag: &str) -> bool {
    let Some(tag) = START_TAG.captures(open_tag) else {
        return true;
    };
    for attr in ATTRIBUTE.captures_iter(&tag[2]) {
        if attr[1].eq_ignore_ascii_case("type") {
            let value = attribute_value(&attr).map(|(v, _)| v.trim().to_ascii_lowercase());
            return matches!(
                value.as_deref(),
                None | Some("" | "module" | "text/javascript" | "application/javascript")
            );
        }
    }
    true
}

fn minify_markup(markup: &str, options: &HtmlMinifyConfig, at_start: bool, at_end: bool) -> String {
    let mut text = if options.remove_comments {
        COMMENT
            .replace_all(markup, |caps: &Captures<'_>| {
                // Conditional comments are markup for old browsers.
                if caps[0].starts_with("<!--[if") {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            })
            .into_owned()
    } else {
        markup.to_string()
    };

    text = rewrite_tags(&text, options);

    if options.collapse_whitespace {
        text = collapse_whitespace(&text, at_start, at_end);
    }
    text
}

/// Runs of whitespace become one space. Runs spanning a line break between
/// two tags are dropped, as is whitespace at either end of the document.
fn collapse_whitespace(text: &str, at_start: bool, at_end: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if !ch.is_whitespace() {
            out.push(ch);
            continue;
        }
        let mut newline = ch == '\n';
        while let Some(&next) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            newline |= next == '\n';
            chars.next();
        }
        let prev = out.chars().last();
        let next = chars.peek().copied();

        let leading = prev.is_none() && at_start;
        let trailing = next.is_none() && at_end;
        // Segments end where a raw element's start tag begins.
        let between_tags = newline && prev.is_none_or(|p| p == '>') && next.is_none_or(|n| n == '<');
        if !(leading || trailing || between_tags) {
            out.push(' ');
        }
    }
    out
}

fn touches_attributes(options: &HtmlMinifyConfig) -> bool {
    options.remove_attribute_quotes
        || options.remove_empty_attributes
        || options.remove_script_type_attributes
        || options.remove_style_link_type_attributes
}

fn rewrite_tags(text: &str, options: &HtmlMinifyConfig) -> String {
    if !touches_attributes(options) {
        return text.to_string();
    }
    START_TAG
        .replace_all(text, |caps: &Captures<'_>| rewrite_tag(caps, options))
        .into_owned()
}

/// `(value, quote)` where quote is `"`, `'` or empty for unquoted values.
fn attribute_value<'h>(attr: &Captures<'h>) -> Option<(&'h str, &'static str)> {
    if let Some(v) = attr.get(2) {
        Some((v.as_str(), "\""))
    } else if let Some(v) = attr.get(3) {
        Some((v.as_str(), "'"))
    } else {
        attr.get(4).map(|v| (v.as_str(), ""))
    }
}

fn rewrite_tag(caps: &Captures<'_>, options: &HtmlMinifyConfig) -> String {
    let tag = &caps[1];
    let tag_lower = tag.to_ascii_lowercase();
    let mut out = format!("<{tag}");
    let mut last_unquoted = false;

    for attr in ATTRIBUTE.captures_iter(&caps[2]) {
        let name = &attr[1];
        let lower = name.to_ascii_lowercase();
        let value = attribute_value(&attr);

        if let Some((v, _)) = value {
            let v = v.trim().to_ascii_lowercase();
            if options.remove_empty_attributes
                && v.is_empty()
                && (EMPTY_REMOVABLE.contains(&lower.as_str()) || lower.starts_with("on"))
            {
                continue;
            }
            if lower == "type"
                && ((options.remove_script_type_attributes
                    && tag_lower == "script"
                    && v == "text/javascript")
                    || (options.remove_style_link_type_attributes
                        && matches!(tag_lower.as_str(), "style" | "link")
                        && v == "text/css"))
            {
                continue;
            }
        }

        out.push(' ');
        out.push_str(name);
        last_unquoted = false;
        match value {
            None => {}
            Some((v, _)) if options.remove_attribute_quotes && UNQUOTABLE.is_match(v) => {
                out.push('=');
                out.push_str(v);
                last_unquoted = true;
            }
            Some((v, quote)) => {
                let quote = if quote.is_empty() { "\"" } else { quote };
                out.push('=');
                out.push_str(quote);
                out.push_str(v);
                out.push_str(quote);
            }
        }
    }

    if &caps[3] == "/" {
        // `<img src=a.png/>` would read the slash as part of the value.
        if last_unquoted {
            out.push(' ');
        }
        out.push('/');
    }
    out.push('>');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_whitespace() {
        let options = HtmlMinifyConfig {
            collapse_whitespace: true,
            remove_comments: true,
            ..HtmlMinifyConfig::default()
        };
        let html = "<!DOCTYPE html>\n<html>\n  <head>\n    <!-- note -->\n    <!--[if IE]><p>old</p><![endif]-->\n    <title>  My   App </title>\n  </head>\n</html>\n";
        assert_eq!(
            minify_html(html, &options),
            "<!DOCTYPE html><html><head><!--[if IE]><p>old</p><![endif]--><title> My App </title></head></html>"
        );
    }

    #[test]
    fn attributes() {
        let html = r#"<div class="" id="main" onclick=""><input type="text" disabled value="a b"><script type="text/javascript" src="app.js"></script><link rel="stylesheet" type="text/css" href="a.css"><img src='x.png' /></div>"#;
        assert_eq!(
            minify_html(html, &production_options()),
            r#"<div id=main><input type=text disabled value="a b"><script src=app.js></script><link rel=stylesheet href=a.css><img src=x.png /></div>"#
        );
    }

    #[test]
    fn raw_elements() {
        let html = "<style>\n  .a { color: red; }\n</style>\n<pre>  keep   this </pre>\n<script>\n  var a = 1;   // one\n</script>\n<script type=\"application/json\">{ \"a\": 1 }</script>";
        assert_eq!(
            minify_html(html, &production_options()),
            "<style>.a{color:red}</style><pre>  keep   this </pre><script>var a=1;</script><script type=application/json>{ \"a\": 1 }</script>"
        );
    }

    #[test]
    fn disabled_options_change_nothing() {
        let html = "<p class=\"\">\n  a  b\n</p>";
        assert_eq!(minify_html(html, &HtmlMinifyConfig::default()), html);
    }
}
