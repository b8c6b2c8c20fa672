//! Entry point configuration.
//!
//! Three forms are accepted:
//!
//! ```toml
//! entry = "./src/index.js"                  # one entry named "main"
//! entry = ["./src/polyfills.js", "./src/index.js"]  # one entry "main", both modules
//!
//! [entry]                                   # one entry per key
//! app = "./src/app.js"
//! admin = ["./src/shared.js", "./src/admin.js"]
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name given to the entry produced by the string and array forms.
pub const DEFAULT_ENTRY_NAME: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryConfig {
    Single(String),
    Multiple(Vec<String>),
    Named(IndexMap<String, EntryValue>),
}

impl Default for EntryConfig {
    fn default() -> Self {
        EntryConfig::Multiple(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryValue {
    Single(String),
    Multiple(Vec<String>),
}

impl EntryValue {
    pub fn requests(&self) -> Vec<String> {
        match self {
            EntryValue::Single(request) => vec![request.clone()],
            EntryValue::Multiple(requests) => requests.clone(),
        }
    }
}

/// A named entry before resolution: the requests are import specifiers
/// relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRequest {
    pub name: String,
    pub requests: Vec<String>,
}

impl EntryRequest {
    pub fn new(name: impl Into<String>, requests: Vec<String>) -> Self {
        Self {
            name: name.into(),
            requests,
        }
    }

    /// Parse a command-line entry: `name=./path.js` or a bare `./path.js`
    /// (which joins the default entry).
    pub fn parse_cli(arg: &str) -> (Option<String>, String) {
        match arg.split_once('=') {
            Some((name, request)) if !name.is_empty() && !name.contains('/') => {
                (Some(name.to_string()), request.to_string())
            }
            _ => (None, arg.to_string()),
        }
    }
}

impl EntryConfig {
    /// Flatten into named requests, in declaration order.
    pub fn requests(&self) -> Vec<EntryRequest> {
        match self {
            EntryConfig::Single(request) => {
                vec![EntryRequest::new(DEFAULT_ENTRY_NAME, vec![request.clone()])]
            }
            EntryConfig::Multiple(requests) if requests.is_empty() => Vec::new(),
            EntryConfig::Multiple(requests) => {
                vec![EntryRequest::new(DEFAULT_ENTRY_NAME, requests.clone())]
            }
            EntryConfig::Named(map) => map
                .iter()
                .map(|(name, value)| EntryRequest::new(name.clone(), value.requests()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            EntryConfig::Single(request) => request.trim().is_empty(),
            EntryConfig::Multiple(requests) => requests.is_empty(),
            EntryConfig::Named(map) => map.is_empty(),
        }
    }

    /// Named requests as an entry map, keeping their order.
    ///
    /// A repeated name is an error; a map would otherwise keep only the last.
    pub fn from_requests(requests: &[EntryRequest]) -> Result<Self, ConfigError> {
        let mut map = IndexMap::with_capacity(requests.len());
        for request in requests {
            if map.contains_key(&request.name) {
                return Err(ConfigError::DuplicateEntryName {
                    name: request.name.clone(),
                });
            }
            map.insert(request.name.clone(), EntryValue::Multiple(request.requests.clone()));
        }
        Ok(EntryConfig::Named(map))
    }

    /// Build a config from repeated `--entry` arguments.
    ///
    /// Unnamed arguments form the `main` entry; named ones keep their order.
    pub fn from_cli_args<I, S>(args: I) -> Vec<EntryRequest>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unnamed = Vec::new();
        let mut named = Vec::new();
        for arg in args {
            match EntryRequest::parse_cli(arg.as_ref()) {
                (Some(name), request) => named.push(EntryRequest::new(name, vec![request])),
                (None, request) => unnamed.push(request),
            }
        }
        let mut requests = Vec::with_capacity(named.len() + 1);
        if !unnamed.is_empty() {
            requests.push(EntryRequest::new(DEFAULT_ENTRY_NAME, unnamed));
        }
        requests.extend(named);
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_form_is_named_main() {
        let entry: EntryConfig = serde_json::from_str(r#""./src/index.js""#).unwrap();
        assert_eq!(
            entry.requests(),
            vec![EntryRequest::new("main", vec!["./src/index.js".into()])]
        );
    }

    #[test]
    fn array_form_is_one_entry() {
        let entry: EntryConfig = serde_json::from_str(r#"["./a.js", "./b.js"]"#).unwrap();
        let requests = entry.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].name, "main");
        assert_eq!(requests[0].requests, vec!["./a.js", "./b.js"]);
    }

    #[test]
    fn map_form_keeps_key_order() {
        let entry: EntryConfig =
            serde_json::from_str(r#"{ "zeta": "./z.js", "alpha": ["./a.js", "./b.js"] }"#)
                .unwrap();
        let names: Vec<_> = entry.requests().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn empty_forms_produce_no_requests() {
        assert!(EntryConfig::default().requests().is_empty());
        assert!(EntryConfig::default().is_empty());
    }

    #[test]
    fn cli_args_split_named_and_unnamed() {
        let requests = EntryConfig::from_cli_args(["./a.js", "admin=./admin.js", "./b.js"]);
        assert_eq!(requests[0], EntryRequest::new("main", vec!["./a.js".into(), "./b.js".into()]));
        assert_eq!(requests[1], EntryRequest::new("admin", vec!["./admin.js".into()]));
    }

    #[test]
    fn requests_become_named_map_in_order() {
        let entry = EntryConfig::from_requests(&[
            EntryRequest::new("main", vec!["./a.js".into(), "./b.js".into()]),
            EntryRequest::new("admin", vec!["./admin.js".into()]),
        ])
        .unwrap();
        let requests = entry.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].name, "main");
        assert_eq!(requests[0].requests, vec!["./a.js", "./b.js"]);
        assert_eq!(requests[1].name, "admin");
    }

    #[test]
    fn repeated_cli_entry_name_is_rejected() {
        let requests = EntryConfig::from_cli_args(["a=./a.js", "a=./b.js"]);
        match EntryConfig::from_requests(&requests) {
            Err(ConfigError::DuplicateEntryName { name }) => assert_eq!(name, "a"),
            other => panic!("expected a duplicate name error, got {other:?}"),
        }
    }

    #[test]
    fn cli_path_with_equals_in_directory_is_unnamed() {
        assert_eq!(
            EntryRequest::parse_cli("./dir=1/a.js"),
            (None, "./dir=1/a.js".to_string())
        );
    }
}
