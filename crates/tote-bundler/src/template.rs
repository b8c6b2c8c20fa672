//! Output filename templates and content hashes.
//!
//! Templates use `[name]`, `[id]`, `[ext]`, `[hash]`, `[chunkhash]` and
//! `[contenthash]`. Hash placeholders accept a length, as in `[contenthash:8]`.
//! `[ext]` has no leading dot, so the usual form is `[name].[contenthash].[ext]`.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use sha2::{Digest, Sha256};

/// Length of a hash placeholder written without `:N`.
pub const DEFAULT_HASH_LENGTH: usize = 20;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Za-z]+)(?::(\d+))?\]").expect("static regex"));

/// SHA-256 hex digest of `bytes`.
pub fn content_hash(bytes: impl AsRef<[u8]>) -> String {
    let digest = Sha256::digest(bytes.as_ref());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Incremental SHA-256 over `\0`-separated parts.
#[derive(Default)]
pub(crate) struct HashBuilder(Sha256);

impl HashBuilder {
    pub fn part(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.0.update(bytes.as_ref());
        self.0.update([0u8]);
        self
    }

    pub fn finish(self) -> String {
        self.0
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}

/// Values available to a template. Missing hashes render as an empty string.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathData<'a> {
    pub name: &'a str,
    pub id: &'a str,
    pub ext: &'a str,
    pub hash: Option<&'a str>,
    pub chunkhash: Option<&'a str>,
    pub contenthash: Option<&'a str>,
}

/// Render `template`. Unknown placeholders are kept verbatim; config
/// validation rejects them before a build starts.
pub fn render_template(template: &str, data: &PathData<'_>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let length = caps.get(2).and_then(|m| m.as_str().parse::<usize>().ok());
            match &caps[1] {
                "name" => data.name.to_string(),
                "id" => data.id.to_string(),
                "ext" => data.ext.to_string(),
                "hash" => truncate(data.hash, length),
                "chunkhash" => truncate(data.chunkhash, length),
                "contenthash" => truncate(data.contenthash, length),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Whether rendering needs the final bytes, which decides emission order.
pub fn uses_contenthash(template: &str) -> bool {
    PLACEHOLDER
        .captures_iter(template)
        .any(|caps| &caps[1] == "contenthash")
}

fn truncate(hash: Option<&str>, length: Option<usize>) -> String {
    let hash = hash.unwrap_or_default();
    let length = length.unwrap_or(DEFAULT_HASH_LENGTH).min(hash.len());
    hash[..length].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn renders_all_placeholders() {
        let data = PathData {
            name: "main",
            id: "0",
            ext: "js",
            hash: Some("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            chunkhash: Some("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
            contenthash: Some("0123456789abcdef0123456789abcdef"),
        };
        assert_eq!(
            render_template("[name].[contenthash].[ext]", &data),
            "main.0123456789abcdef0123.js"
        );
        assert_eq!(
            render_template("js/[id]-[hash:4]-[chunkhash:2].[contenthash:8].[ext]", &data),
            "js/0-aaaa-bb.01234567.js"
        );
    }

    #[test]
    fn unknown_placeholders_survive() {
        let data = PathData {
            name: "x",
            ..PathData::default()
        };
        assert_eq!(render_template("[name].[query]", &data), "x.[query]");
    }

    #[test]
    fn hash_builder_separates_parts() {
        let a = HashBuilder::default().part("ab").part("c").finish();
        let b = HashBuilder::default().part("a").part("bc").finish();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn contenthash_detection() {
        assert!(uses_contenthash("[name].[contenthash:8].js"));
        assert!(!uses_contenthash("[name].[chunkhash].js"));
    }
}
