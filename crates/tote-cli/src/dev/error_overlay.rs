//! Error page shown in the browser while the last build is failing.
//!
//! The page subscribes to the reload stream, so it goes away by itself once
//! a build succeeds.

use crate::dev::server::{EVENTS_PATH, RELOAD_SCRIPT_PATH};

/// Render the overlay for a build error. The message is HTML-escaped.
pub fn generate_error_overlay(error: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Build Error</title>
  <style>
    body {{ margin: 0; background: #1e1e1e; color: #f0f0f0; font-family: ui-monospace, Menlo, monospace; }}
    main {{ max-width: 960px; margin: 4rem auto; padding: 0 1.5rem; }}
    h1 {{ color: #ff6b6b; font-size: 1.4rem; }}
    pre {{ background: #2b2b2b; border-left: 4px solid #ff6b6b; padding: 1rem; white-space: pre-wrap; word-break: break-word; }}
    p {{ color: #a0a0a0; }}
  </style>
</head>
<body>
  <main>
    <h1>Build Error</h1>
    <pre>{}</pre>
    <p>Fix the error and save; this page reloads when the next build succeeds.</p>
  </main>
  <script src="{RELOAD_SCRIPT_PATH}" data-events="{EVENTS_PATH}"></script>
</body>
</html>
"#,
        html_escape(error)
    )
}

/// Escape `& < > " '` for HTML text and attribute values.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape(r#"say "hi" it's"#), "say &quot;hi&quot; it&#x27;s");
        assert_eq!(html_escape("plain"), "plain");
    }

    #[test]
    fn test_overlay_escapes_error() {
        let html = generate_error_overlay("<script>alert('xss')</script>");
        assert!(html.contains("&lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn test_overlay_subscribes_to_reload() {
        let html = generate_error_overlay("Test error");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Build Error"));
        assert!(html.contains(RELOAD_SCRIPT_PATH));
    }
}
