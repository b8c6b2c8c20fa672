//! Starter project written by `tote init`.
//!
//! A small web app: one script entry importing JSON, CSS and LESS, an HTML
//! template and a `tote.toml` that exercises hashing, CSS extraction and the
//! dev server proxy.

/// Files of the starter project, relative to the project directory.
pub const FILES: &[(&str, &str)] = &[
    ("tote.toml", TOTE_TOML),
    ("public/index.html", INDEX_HTML),
    ("src/index.js", INDEX_JS),
    ("src/count.js", COUNT_JS),
    ("src/data.json", DATA_JSON),
    ("src/index.css", INDEX_CSS),
    ("src/index.less", INDEX_LESS),
    (".gitignore", GITIGNORE),
];

pub const TOTE_TOML: &str = r#"entry = "./src/index.js"
mode = "production"

[output]
path = "dist"
filename = "js/[name].[contenthash:8].js"
chunk_filename = "js/[name].[contenthash:8].chunk.js"
asset_filename = "static/media/[name].[contenthash:8].[ext]"
clean = true

[resolve]
extensions = [".js", ".json"]

[resolve.alias]
"@" = "src"

[cache]
type = "filesystem"
build_dependencies = ["tote.toml"]

[optimization.split_chunks]
chunks = "all"

[performance]
hints = "warning"
max_entrypoint_size = 50000000
max_asset_size = 30000000

[[plugins]]
type = "html"
template = "public/index.html"

[plugins.minify]
collapse_whitespace = true
remove_comments = true

[[plugins]]
type = "css-extract"
filename = "static/css/[name].[contenthash:10].css"

[[plugins]]
type = "css-minimizer"

[[plugins]]
type = "lint"

[plugins.rules]
no-var = "error"
no-debugger = "warn"

[dev_server]
port = 8888
history_api_fallback = true
static = ["public"]

[dev_server.proxy."/api"]
target = "http://localhost:3000"
change_origin = true

[dev_server.proxy."/api".path_rewrite]
"^/api" = ""

[profiles.development.output]
filename = "[name].js"
chunk_filename = "[name].chunk.js"
"#;

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>tote app</title>
  </head>
  <body>
    <!-- mount point -->
    <div id="app"></div>
  </body>
</html>
"#;

pub const INDEX_JS: &str = r#"import data from './data.json';
import './index.css';
import './index.less';
import count from '@/count';

console.log(count(5, 3));

const sum = (a, b) => a + b;
console.log(sum(1, 4));
console.log(data);

const ready = new Promise((resolve) => {
  setTimeout(() => resolve('ready'), 100);
});
ready.then((state) => {
  document.getElementById('app').textContent = state;
});
"#;

pub const COUNT_JS: &str = r#"export default function count(a, b) {
  return a - b;
}
"#;

pub const DATA_JSON: &str = r#"{
  "name": "tote",
  "features": ["hashing", "splitting", "caching"]
}
"#;

pub const INDEX_CSS: &str = r#"body {
  margin: 0;
  font-family: sans-serif;
}

#app {
  padding: 2rem;
}
"#;

pub const INDEX_LESS: &str = r#"@accent: #1e90ff;

#app {
  color: @accent;

  &:hover {
    text-decoration: underline;
  }
}
"#;

pub const GITIGNORE: &str = "node_modules/\ndist/\n";

/// `package.json` for a starter project named `name`.
pub fn package_json(name: &str) -> String {
    format!(
        r#"{{
  "name": "{name}",
  "version": "0.1.0",
  "private": true,
  "scripts": {{
    "build": "tote build",
    "dev": "tote dev"
  }}
}}
"#
    )
}
