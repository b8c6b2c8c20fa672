//! Development server configuration types.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directories served when a path is not part of the build output.
    #[serde(default, rename = "static")]
    pub static_dirs: Vec<PathBuf>,

    /// Gzip responses.
    #[serde(default = "default_true")]
    pub compress: bool,

    /// Open the browser once the server is listening.
    #[serde(default)]
    pub open: bool,

    /// Reload connected pages after each rebuild.
    #[serde(default = "default_true")]
    pub hot: bool,

    /// Serve `index.html` for unknown GET requests that accept HTML.
    #[serde(default)]
    pub history_api_fallback: bool,

    /// Path prefix → proxy rule.
    #[serde(default)]
    pub proxy: IndexMap<String, ProxyRule>,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dirs: Vec::new(),
            compress: true,
            open: false,
            hot: true,
            history_api_fallback: false,
            proxy: IndexMap::new(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRule {
    /// Origin requests are forwarded to, e.g. `http://localhost:3000`.
    pub target: String,

    /// Regex → replacement applied to the request path, in order.
    #[serde(default)]
    pub path_rewrite: IndexMap<String, String>,

    /// Send the target's host in the `Host` header.
    #[serde(default)]
    pub change_origin: bool,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    8080
}

fn default_debounce_ms() -> u64 {
    100
}
