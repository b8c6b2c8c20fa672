//! Output minification.
//!
//! The minifiers only remove what cannot change behavior: comments and
//! whitespace, plus a handful of redundant HTML attributes. Results go
//! through the same [`TransformCache`] as module transforms, keyed by the
//! input text, so unchanged chunks are not minified twice.

mod css;
mod html;
mod js;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use tote_config::HtmlMinifyConfig;
use tote_graph::{CacheKey, TransformCache, TransformOutput};

pub use css::minify_css;
pub use html::{minify_html, production_options};
pub use js::minify_js;

/// Cached, optionally parallel front end to the minifiers.
#[derive(Debug)]
pub struct Minifier {
    cache: Arc<dyn TransformCache>,
    namespace: String,
    parallel: bool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Minifier {
    pub fn new(cache: Arc<dyn TransformCache>, namespace: impl Into<String>, parallel: bool) -> Self {
        Self {
            cache,
            namespace: namespace.into(),
            parallel,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn js(&self, code: &str) -> String {
        self.cached("js", code, minify_js)
    }

    pub fn css(&self, code: &str) -> String {
        self.cached("css", code, minify_css)
    }

    pub fn html(&self, code: &str, options: &HtmlMinifyConfig) -> String {
        let kind = format!("html:{}", serde_json::to_string(options).unwrap_or_default());
        self.cached(&kind, code, |html| minify_html(html, options))
    }

    /// Apply `minify` to every input, on the rayon pool when parallel
    /// minification is enabled. Output order matches input order.
    pub fn all<F>(&self, inputs: &[String], minify: F) -> Vec<String>
    where
        F: Fn(&Self, &str) -> String + Sync,
    {
        if self.parallel && inputs.len() > 1 {
            inputs.par_iter().map(|code| minify(self, code)).collect()
        } else {
            inputs.iter().map(|code| minify(self, code)).collect()
        }
    }

    /// `(hits, misses)` since this minifier was created.
    pub fn counters(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    fn cached(&self, kind: &str, code: &str, minify: impl FnOnce(&str) -> String) -> String {
        let key = CacheKey::minified(&self.namespace, kind, code);
        if let Some(hit) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return hit.code;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let minified = minify(code);
        tracing::debug!(kind, before = code.len(), after = minified.len(), "minified");
        self.cache.put(
            &key,
            &TransformOutput {
                code: minified.clone(),
                dependencies: Vec::new(),
            },
        );
        minified
    }
}

#[cfg(test)]
mod tests {
    use tote_graph::{MemoryCache, NoopCache};

    use super::*;

    #[test]
    fn repeated_input_hits_the_cache() {
        let minifier = Minifier::new(Arc::new(MemoryCache::new()), "ns", false);
        let a = minifier.js("var a = 1;  // x");
        let b = minifier.js("var a = 1;  // x");
        assert_eq!(a, "var a=1;");
        assert_eq!(a, b);
        assert_eq!(minifier.counters(), (1, 1));

        // Same text, different kind: separate entry.
        minifier.css("var a = 1;  // x");
        assert_eq!(minifier.counters(), (1, 2));
    }

    #[test]
    fn parallel_preserves_order() {
        let minifier = Minifier::new(Arc::new(NoopCache), "ns", true);
        let inputs: Vec<String> = (0..32).map(|i| format!(".c{i} {{ width: {i}px; }}")).collect();
        let out = minifier.all(&inputs, Minifier::css);
        for (i, css) in out.iter().enumerate() {
            assert_eq!(css, &format!(".c{i}{{width:{i}px}}"));
        }
        assert_eq!(minifier.counters(), (0, 32));
    }
}
