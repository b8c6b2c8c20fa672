//! HTML pages with tags for each entry's initial files.

use std::path::Path;

use tote_config::{ConfigError, HtmlPluginConfig};
use tote_graph::Runtime;

const DEFAULT_TITLE: &str = "tote App";

const DEFAULT_TEMPLATE: &str = "<!DOCTYPE html>
<html>
  <head>
    <meta charset=\"utf-8\">
    <title></title>
    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">
  </head>
  <body>
  </body>
</html>
";

/// Initial files of one entry, in load order, as public URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryAssets {
    pub name: String,
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

/// Read the plugin's template, relative to `root`. `None` when the plugin
/// uses the built-in document.
pub async fn load_template(
    plugin: &HtmlPluginConfig,
    root: &Path,
    runtime: &dyn Runtime,
) -> Result<Option<String>, ConfigError> {
    let Some(template) = &plugin.template else {
        return Ok(None);
    };
    let path = root.join(template);
    runtime
        .read_to_string(&path)
        .await
        .map(Some)
        .map_err(|_| ConfigError::TemplateNotFound { path })
}

/// Render one page. Entries not listed in `plugin.chunks` are skipped
/// unless the list is empty.
pub fn render_page(template: Option<&str>, plugin: &HtmlPluginConfig, entries: &[EntryAssets]) -> String {
    let mut html = template.unwrap_or(DEFAULT_TEMPLATE).to_string();

    let title = match (&plugin.title, template) {
        (Some(title), _) => Some(title.as_str()),
        (None, None) => Some(DEFAULT_TITLE),
        (None, Some(_)) => None,
    };
    if let Some(title) = title {
        html = set_title(&html, &escape(title));
    }

    if !plugin.inject {
        return html;
    }

    let mut tags: Vec<String> = Vec::new();
    let selected = entries
        .iter()
        .filter(|entry| plugin.chunks.is_empty() || plugin.chunks.contains(&entry.name));
    let mut styles: Vec<&str> = Vec::new();
    let mut scripts: Vec<&str> = Vec::new();
    for entry in selected {
        for style in &entry.styles {
            if !styles.contains(&style.as_str()) {
                styles.push(style);
            }
        }
        for script in &entry.scripts {
            if !scripts.contains(&script.as_str()) {
                scripts.push(script);
            }
        }
    }
    tags.extend(styles.iter().map(|href| format!("<link href=\"{}\" rel=\"stylesheet\">", escape(href))));
    tags.extend(scripts.iter().map(|src| format!("<script defer src=\"{}\"></script>", escape(src))));

    inject_head(&html, &tags)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

fn set_title(html: &str, title: &str) -> String {
    if let Some(open) = find_ci(html, "<title") {
        let content_start = html[open..].find('>').map(|p| open + p + 1);
        let content_end = find_ci(html, "</title>");
        if let (Some(start), Some(end)) = (content_start, content_end) {
            if start <= end {
                return format!("{}{}{}", &html[..start], title, &html[end..]);
            }
        }
    }
    inject_head(html, &[format!("<title>{title}</title>")])
}

/// Insert `tags` just before `</head>`, one per line when `</head>` sits on
/// its own line.
fn inject_head(html: &str, tags: &[String]) -> String {
    if tags.is_empty() {
        return html.to_string();
    }
    let Some(close) = find_ci(html, "</head>").or_else(|| find_ci(html, "<body")) else {
        return format!("{}{}", tags.concat(), html);
    };

    let line_start = html[..close].rfind('\n').map_or(0, |p| p + 1);
    let prefix = &html[line_start..close];
    if prefix.chars().all(char::is_whitespace) && line_start > 0 {
        let indent = format!("{prefix}  ");
        let block: String = tags.iter().map(|tag| format!("{indent}{tag}\n")).collect();
        format!("{}{}{}", &html[..line_start], block, &html[line_start..])
    } else {
        format!("{}{}{}", &html[..close], tags.concat(), &html[close..])
    }
}
