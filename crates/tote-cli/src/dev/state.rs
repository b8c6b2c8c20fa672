//! Shared state for the development server.
//!
//! Build status, the files of the last successful build and the connected
//! reload clients, behind parking_lot locks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tote_bundler::BuildOutput;

use crate::dev::DevEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    NotStarted,
    InProgress { started_at: Instant },
    Success { duration_ms: u64 },
    Failed { error: String },
}

impl BuildStatus {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, BuildStatus::InProgress { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success { .. })
    }

    /// Error message if the last build failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            BuildStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// A file ready to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    pub contents: Arc<Vec<u8>>,
    pub content_type: &'static str,
}

/// The emitted files of one build, keyed by URL path.
#[derive(Debug, Clone, Default)]
pub struct BundleCache {
    files: HashMap<String, CachedFile>,
}

impl BundleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every emitted file under the URL it is served from.
    pub fn from_output(output: &BuildOutput, public_path: &str) -> Self {
        let mut cache = Self::new();
        for file in &output.files {
            cache.insert(url_path(public_path, &file.name), file.contents.clone());
        }
        cache
    }

    pub fn insert(&mut self, path: String, contents: Vec<u8>) {
        let content_type = content_type(&path);
        self.files.insert(
            path,
            CachedFile {
                contents: Arc::new(contents),
                content_type,
            },
        );
    }

    /// Look up a request path. Directory paths fall back to their `index.html`.
    pub fn get(&self, path: &str) -> Option<&CachedFile> {
        if path.ends_with('/') {
            return self.files.get(&format!("{path}index.html"));
        }
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// URL path of an emitted file. Only the path part of an absolute
/// `public_path` counts, since the dev server owns the origin.
pub fn url_path(public_path: &str, name: &str) -> String {
    let prefix = match public_path.find("://") {
        Some(scheme_end) => {
            let rest = &public_path[scheme_end + 3..];
            rest.find('/').map(|slash| &rest[slash..]).unwrap_or("")
        }
        None => public_path,
    };
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("/{name}")
    } else {
        format!("/{prefix}/{name}")
    }
}

/// MIME type by file extension.
pub fn content_type(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match extension {
        "js" | "mjs" | "cjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// Connected live-reload clients.
pub type ClientRegistry = Arc<RwLock<HashMap<usize, mpsc::Sender<String>>>>;

pub struct DevServerState {
    pub status: RwLock<BuildStatus>,
    pub cache: RwLock<BundleCache>,
    pub clients: ClientRegistry,
    next_client_id: RwLock<usize>,
}

impl DevServerState {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(BuildStatus::NotStarted),
            cache: RwLock::new(BundleCache::new()),
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_client_id: RwLock::new(0),
        }
    }

    pub fn start_build(&self) {
        *self.status.write() = BuildStatus::InProgress {
            started_at: Instant::now(),
        };
    }

    pub fn complete_build(&self, duration_ms: u64, cache: BundleCache) {
        *self.cache.write() = cache;
        *self.status.write() = BuildStatus::Success { duration_ms };
    }

    /// The previous files stay in place so unaffected requests keep working.
    pub fn fail_build(&self, error: String) {
        *self.status.write() = BuildStatus::Failed { error };
    }

    pub fn get_status(&self) -> BuildStatus {
        self.status.read().clone()
    }

    pub fn get_cached_file(&self, path: &str) -> Option<CachedFile> {
        self.cache.read().get(path).cloned()
    }

    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = {
            let mut next_id = self.next_client_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let (tx, rx) = mpsc::channel(100);
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Send an event to every client, dropping the ones that went away.
    pub async fn broadcast(&self, event: &DevEvent) {
        let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
        let clients = self.clients.read().clone();

        let mut gone = Vec::new();
        for (id, tx) in clients {
            if tx.send(json.clone()).await.is_err() {
                gone.push(id);
            }
        }
        for id in gone {
            tracing::debug!(client = id, "reload client disconnected");
            self.unregister_client(id);
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }
}

impl Default for DevServerState {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedState = Arc<DevServerState>;

#[cfg(test)]
mod tests {
    use super::*;
    use tote_bundler::{FileKind, OutputFile};

    #[test]
    fn test_build_status() {
        let status = BuildStatus::InProgress {
            started_at: Instant::now(),
        };
        assert!(status.is_in_progress());
        assert!(status.error().is_none());

        let status = BuildStatus::Failed {
            error: "boom".to_string(),
        };
        assert!(!status.is_success());
        assert_eq!(status.error(), Some("boom"));
    }

    #[test]
    fn test_url_path() {
        assert_eq!(url_path("/", "main.js"), "/main.js");
        assert_eq!(url_path("", "main.js"), "/main.js");
        assert_eq!(url_path("/assets/", "js/main.js"), "/assets/js/main.js");
        assert_eq!(url_path("assets", "main.js"), "/assets/main.js");
        assert_eq!(url_path("https://cdn.example.com/app/", "main.js"), "/app/main.js");
        assert_eq!(url_path("https://cdn.example.com", "main.js"), "/main.js");
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("/js/main.1a2b.js"), "application/javascript; charset=utf-8");
        assert_eq!(content_type("/index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type("/static/logo.png"), "image/png");
        assert_eq!(content_type("/LICENSE"), "application/octet-stream");
    }

    #[test]
    fn test_cache_from_output() {
        let output = BuildOutput {
            files: vec![
                OutputFile::new("js/main.abcd1234.js", "console.log(1)", FileKind::Script),
                OutputFile::new("index.html", "<html></html>", FileKind::Html),
            ],
            ..BuildOutput::default()
        };
        let cache = BundleCache::from_output(&output, "/");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("/js/main.abcd1234.js").unwrap().contents.as_slice(), b"console.log(1)");
        assert_eq!(cache.get("/").unwrap().content_type, "text/html; charset=utf-8");
        assert!(cache.get("/missing.js").is_none());
    }

    #[test]
    fn test_failed_build_keeps_last_files() {
        let state = DevServerState::new();
        let mut cache = BundleCache::new();
        cache.insert("/main.js".into(), b"ok".to_vec());

        state.start_build();
        state.complete_build(10, cache);
        state.fail_build("syntax error".into());

        assert_eq!(state.get_status().error(), Some("syntax error"));
        assert!(state.get_cached_file("/main.js").is_some());
    }

    #[tokio::test]
    async fn test_broadcast_drops_closed_clients() {
        let state = DevServerState::new();
        let (_, mut rx1) = state.register_client();
        let (_, rx2) = state.register_client();
        assert_eq!(state.client_count(), 2);
        drop(rx2);

        state.broadcast(&DevEvent::BuildStarted).await;
        assert_eq!(state.client_count(), 1);
        assert_eq!(rx1.recv().await.unwrap(), r#"{"type":"BuildStarted"}"#);
    }
}
