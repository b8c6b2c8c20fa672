use serde::{Deserialize, Serialize};

/// How oversized output is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintLevel {
    Off,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// `None` follows the mode: warnings in production, off in development.
    #[serde(default)]
    pub hints: Option<HintLevel>,

    /// Limit in bytes for the initial files of one entry combined.
    #[serde(default = "default_max_size")]
    pub max_entrypoint_size: u64,

    /// Limit in bytes for any single emitted file.
    #[serde(default = "default_max_size")]
    pub max_asset_size: u64,

    /// Extensions (without dot) considered by both checks.
    #[serde(default = "default_asset_filter")]
    pub asset_filter: Vec<String>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            hints: None,
            max_entrypoint_size: default_max_size(),
            max_asset_size: default_max_size(),
            asset_filter: default_asset_filter(),
        }
    }
}

impl PerformanceConfig {
    pub fn considers(&self, file_name: &str) -> bool {
        let ext = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        self.asset_filter
            .iter()
            .any(|allowed| allowed.trim_start_matches('.') == ext)
    }
}

fn default_max_size() -> u64 {
    250_000
}

fn default_asset_filter() -> Vec<String> {
    vec!["js".into()]
}
