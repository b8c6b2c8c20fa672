//! Development HTTP server.
//!
//! Requests are answered, in order, by: proxy rules, the error overlay
//! (HTML requests while the build is failing), the in-memory build, the
//! static directories, and the history API fallback.

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
    routing::get,
};
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tote_config::DevServerConfig;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::commands::utils;
use crate::dev::state::{CachedFile, url_path};
use crate::dev::{DevEvent, ProxyTable, SharedState, error_overlay};
use crate::error::{CliError, Result};

/// Server-Sent Events stream of [`DevEvent`]s.
pub const EVENTS_PATH: &str = "/__tote/events";
/// The live reload client.
pub const RELOAD_SCRIPT_PATH: &str = "/__tote/reload.js";

const RELOAD_SCRIPT: &str = include_str!("../../assets/reload-client.js");

/// Per-request settings shared by the handlers.
#[derive(Debug)]
struct Settings {
    static_dirs: Vec<PathBuf>,
    hot: bool,
    history_api_fallback: bool,
    index_path: String,
    proxy: ProxyTable,
}

#[derive(Clone)]
struct AppState {
    shared: SharedState,
    settings: Arc<Settings>,
}

pub struct DevServer {
    host: String,
    port: u16,
    compress: bool,
    settings: Settings,
    state: SharedState,
}

impl DevServer {
    pub fn new(config: &DevServerConfig, root: &Path, public_path: &str, state: SharedState) -> Result<Self> {
        let settings = Settings {
            static_dirs: config
                .static_dirs
                .iter()
                .map(|dir| utils::resolve_path(dir, root))
                .collect(),
            hot: config.hot,
            history_api_fallback: config.history_api_fallback,
            index_path: url_path(public_path, "index.html"),
            proxy: ProxyTable::new(&config.proxy)?,
        };
        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            compress: config.compress,
            settings,
            state,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Bind and serve until the task is dropped.
    pub async fn start(self) -> Result<()> {
        let url = self.server_url();
        let listener = tokio::net::TcpListener::bind((self.host.as_str(), self.port))
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}:{}: {}", self.host, self.port, e)))?;

        crate::ui::success(&format!("Development server running at {url}"));
        let app = self.router();
        axum::serve(listener, app)
            .await
            .map_err(|e| CliError::Server(format!("Server error: {e}")))
    }

    fn router(self) -> Router {
        let compress = self.compress;
        let state = AppState {
            shared: self.state,
            settings: Arc::new(self.settings),
        };

        let mut app = Router::new()
            .route(EVENTS_PATH, get(handle_events))
            .route(RELOAD_SCRIPT_PATH, get(handle_reload_script))
            .fallback(handle_request)
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        if compress {
            app = app.layer(CompressionLayer::new());
        }
        app.with_state(state)
    }
}

async fn handle_events(State(app): State<AppState>) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (id, rx) = app.shared.register_client();
    tracing::debug!(client = id, "reload client connected");
    app.shared.broadcast(&DevEvent::ClientConnected { id }).await;

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}

async fn handle_reload_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        RELOAD_SCRIPT,
    )
}

async fn handle_request(State(app): State<AppState>, request: Request) -> Response {
    let settings = &app.settings;
    let path = request.uri().path().to_string();

    if settings.proxy.matches(&path) {
        return settings.proxy.forward(request).await;
    }

    let method = request.method().clone();
    let html = accepts_html(request.headers());

    if html {
        if let Some(error) = app.shared.get_status().error() {
            return html_response(error_overlay::generate_error_overlay(error).into_bytes());
        }
    }

    if let Some(file) = app.shared.get_cached_file(&path) {
        return serve_cached(file, settings.hot);
    }

    for dir in &settings.static_dirs {
        if let Some(response) = serve_static(dir, request.uri()).await {
            return response;
        }
    }

    if settings.history_api_fallback && should_fallback(&method, html, &path) {
        if let Some(file) = app.shared.get_cached_file(&settings.index_path) {
            tracing::debug!(%path, "history fallback to index.html");
            return serve_cached(file, settings.hot);
        }
    }

    let mut response = Response::new(Body::from(format!("File not found: {path}")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Whether a request should get `index.html` instead of a 404: a GET or HEAD
/// that accepts HTML, for a path whose last segment has no extension.
pub fn should_fallback(method: &Method, accepts_html: bool, path: &str) -> bool {
    if *method != Method::GET && *method != Method::HEAD {
        return false;
    }
    if !accepts_html {
        return false;
    }
    let last = path.rsplit('/').next().unwrap_or_default();
    !last.contains('.')
}

fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

fn serve_cached(file: CachedFile, hot: bool) -> Response {
    if hot && file.content_type.starts_with("text/html") {
        return html_response(inject_reload_script(&file.contents));
    }
    let mut response = Response::new(Body::from(file.contents.to_vec()));
    set_headers(&mut response, file.content_type);
    response
}

fn html_response(body: Vec<u8>) -> Response {
    let mut response = Response::new(Body::from(body));
    set_headers(&mut response, "text/html; charset=utf-8");
    response
}

fn set_headers(response: &mut Response, content_type: &'static str) {
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
}

/// Serve `uri` from a static directory, if the file exists there.
async fn serve_static(dir: &Path, uri: &Uri) -> Option<Response> {
    let request = axum::http::Request::builder().uri(uri.clone()).body(Body::empty()).ok()?;
    match ServeDir::new(dir).try_call(request).await {
        Ok(response) if response.status() != StatusCode::NOT_FOUND => Some(response.map(Body::new)),
        Ok(_) => None,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "failed to serve static file");
            None
        }
    }
}

/// Add the reload client before `</body>`, or at the end.
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(content);
    let tag = format!(r#"<script src="{RELOAD_SCRIPT_PATH}" data-events="{EVENTS_PATH}"></script>"#);

    match html.rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + tag.len() + 1);
            out.push_str(&html[..pos]);
            out.push_str(&tag);
            out.push('\n');
            out.push_str(&html[pos..]);
            out.into_bytes()
        }
        None => format!("{html}\n{tag}").into_bytes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dev::{BundleCache, DevServerState};
    use tote_config::ProxyRule;

    #[test]
    fn test_should_fallback() {
        assert!(should_fallback(&Method::GET, true, "/users/42"));
        assert!(should_fallback(&Method::HEAD, true, "/"));
        assert!(!should_fallback(&Method::POST, true, "/users"));
        assert!(!should_fallback(&Method::GET, false, "/users"));
        assert!(!should_fallback(&Method::GET, true, "/missing.js"));
        assert!(should_fallback(&Method::GET, true, "/v1.2/page"));
    }

    #[test]
    fn test_accepts_html() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_html(&headers));
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml"));
        assert!(accepts_html(&headers));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!accepts_html(&headers));
    }

    #[test]
    fn test_inject_reload_script() {
        let html = String::from_utf8(inject_reload_script(b"<html><body><h1>x</h1></body></html>")).unwrap();
        let script = html.find(RELOAD_SCRIPT_PATH).unwrap();
        assert!(script < html.find("</body>").unwrap());

        let html = String::from_utf8(inject_reload_script(b"<h1>x</h1>")).unwrap();
        assert!(html.ends_with("</script>"));
    }

    fn app(config: DevServerConfig, root: &Path) -> (SharedState, Router) {
        let state: SharedState = Arc::new(DevServerState::new());
        let mut cache = BundleCache::new();
        cache.insert("/index.html".into(), b"<html><body>app</body></html>".to_vec());
        cache.insert("/js/main.1234abcd.js".into(), b"console.log(1)".to_vec());
        state.complete_build(5, cache);
        let server = DevServer::new(&config, root, "/", state.clone()).unwrap();
        (state, server.router())
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}")
    }

    async fn get(base: &str, path: &str, accept: &str) -> (StatusCode, String) {
        let response = reqwest::Client::new()
            .get(format!("{base}{path}"))
            .header(header::ACCEPT, accept)
            .send()
            .await
            .unwrap();
        (response.status(), response.text().await.unwrap())
    }

    #[tokio::test]
    async fn test_serves_build_and_fallbacks() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("public")).unwrap();
        std::fs::write(tmp.path().join("public/robots.txt"), "User-agent: *").unwrap();

        let config = DevServerConfig {
            static_dirs: vec![PathBuf::from("public")],
            history_api_fallback: true,
            compress: false,
            ..DevServerConfig::default()
        };
        let (_, router) = app(config, tmp.path());
        let base = serve(router).await;

        let (status, body) = get(&base, "/js/main.1234abcd.js", "*/*").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log(1)");

        let (status, body) = get(&base, "/", "text/html").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(RELOAD_SCRIPT_PATH));

        let (status, body) = get(&base, "/robots.txt", "text/plain").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "User-agent: *");

        let (status, body) = get(&base, "/settings/profile", "text/html").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("app"));

        let (status, _) = get(&base, "/missing.js", "*/*").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_build_shows_overlay_to_pages_only() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, router) = app(DevServerConfig::default(), tmp.path());
        let base = serve(router).await;
        state.fail_build("Unexpected token <".into());

        let (status, body) = get(&base, "/", "text/html").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Unexpected token &lt;"));

        let (_, body) = get(&base, "/js/main.1234abcd.js", "application/javascript").await;
        assert_eq!(body, "console.log(1)");
    }

    #[tokio::test]
    async fn test_proxy_takes_precedence() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = DevServerConfig::default();
        config.proxy.insert(
            "/js".into(),
            ProxyRule {
                target: "http://127.0.0.1:9".into(),
                path_rewrite: Default::default(),
                change_origin: true,
            },
        );
        let (_, router) = app(config, tmp.path());
        let base = serve(router).await;
        let (status, _) = get(&base, "/js/main.1234abcd.js", "*/*").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
