//! Forwarding dev server requests to backend servers.
//!
//! Each `dev_server.proxy` rule maps a path prefix to a target origin. The
//! longest matching prefix wins; `path_rewrite` regexes then rewrite the path
//! before it is appended to the target.

use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, header};
use indexmap::IndexMap;
use regex::Regex;
use tote_config::ProxyRule;

use crate::error::{CliError, Result};

/// Largest request body forwarded.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Headers that describe a single connection and are not forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Clone)]
struct CompiledRule {
    prefix: String,
    target: String,
    rewrites: Vec<(Regex, String)>,
    change_origin: bool,
}

/// The compiled proxy rules plus a shared HTTP client.
#[derive(Debug, Clone)]
pub struct ProxyTable {
    rules: Vec<CompiledRule>,
    client: reqwest::Client,
}

impl ProxyTable {
    pub fn new(rules: &IndexMap<String, ProxyRule>) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for (prefix, rule) in rules {
            let rewrites = rule
                .path_rewrite
                .iter()
                .map(|(pattern, replacement)| {
                    Regex::new(pattern)
                        .map(|re| (re, replacement.clone()))
                        .map_err(|e| CliError::InvalidConfig {
                            message: format!("invalid path_rewrite pattern '{pattern}' for proxy '{prefix}': {e}"),
                            hint: "path_rewrite keys are regular expressions, e.g. \"^/api\"".to_string(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            compiled.push(CompiledRule {
                prefix: prefix.clone(),
                target: rule.target.trim_end_matches('/').to_string(),
                rewrites,
                change_origin: rule.change_origin,
            });
        }
        compiled.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| CliError::Server(format!("failed to create proxy client: {e}")))?;

        Ok(Self {
            rules: compiled,
            client,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The backend URL for a request path and query, if a rule matches.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> Option<String> {
        let rule = self.find(path)?;
        Some(rule.url(path, query))
    }

    fn find(&self, path: &str) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| path.starts_with(&rule.prefix))
    }

    pub fn matches(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    /// Forward `request` to the backend of the matching rule. Unreachable
    /// backends answer 502.
    pub async fn forward(&self, request: Request<Body>) -> Response<Body> {
        let uri = request.uri().clone();
        let Some(rule) = self.find(uri.path()) else {
            return error_response(StatusCode::NOT_FOUND, &format!("No proxy rule for {}", uri.path()));
        };
        let url = rule.url(uri.path(), uri.query());
        tracing::debug!(method = %request.method(), path = %uri.path(), %url, "proxying request");

        match self.send(rule, &url, request).await {
            Ok(response) => response,
            Err(message) => {
                tracing::warn!(%url, error = %message, "proxy request failed");
                error_response(StatusCode::BAD_GATEWAY, &format!("Proxy error: {message}"))
            }
        }
    }

    async fn send(
        &self,
        rule: &CompiledRule,
        url: &str,
        request: Request<Body>,
    ) -> std::result::Result<Response<Body>, String> {
        let (parts, body) = request.into_parts();
        let body = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| format!("failed to read request body: {e}"))?;

        let mut headers = strip_hop_by_hop(&parts.headers);
        headers.remove(header::HOST);
        if !rule.change_origin {
            if let Some(host) = parts.headers.get(header::HOST) {
                headers.insert(header::HOST, host.clone());
            }
        }

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let mut response = Response::builder().status(upstream.status());
        if let Some(out) = response.headers_mut() {
            *out = strip_hop_by_hop(upstream.headers());
        }
        response
            .body(Body::from_stream(upstream.bytes_stream()))
            .map_err(|e| e.to_string())
    }
}

impl CompiledRule {
    fn url(&self, path: &str, query: Option<&str>) -> String {
        let mut path = path.to_string();
        for (regex, replacement) in &self.rewrites {
            path = regex.replace(&path, replacement.as_str()).into_owned();
        }
        if !path.is_empty() && !path.starts_with('/') {
            path.insert(0, '/');
        }
        match query {
            Some(query) => format!("{}{path}?{query}", self.target),
            None => format!("{}{path}", self.target),
        }
    }
}

fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(message.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
