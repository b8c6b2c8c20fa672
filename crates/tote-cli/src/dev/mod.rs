//! Development server module.
//!
//! - In-memory builds served straight from the last [`BuildOutput`](tote_bundler::BuildOutput)
//! - Live reload via Server-Sent Events
//! - File watching with debouncing
//! - Error overlay in the browser
//! - Request proxying to backend servers

pub mod builder;
pub mod error_overlay;
pub mod proxy;
pub mod server;
pub mod state;
pub mod watcher;

pub use builder::DevBuilder;
pub use proxy::ProxyTable;
pub use server::DevServer;
pub use state::{BuildStatus, BundleCache, DevServerState, SharedState};
pub use watcher::{FileChange, FileWatcher};

use serde::{Deserialize, Serialize};

/// Events pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DevEvent {
    BuildStarted,

    BuildCompleted { duration_ms: u64 },

    BuildFailed { error: String },

    ClientConnected { id: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_string(&DevEvent::BuildCompleted { duration_ms: 12 }).unwrap();
        assert_eq!(json, r#"{"type":"BuildCompleted","duration_ms":12}"#);

        let json = serde_json::to_string(&DevEvent::BuildStarted).unwrap();
        assert_eq!(json, r#"{"type":"BuildStarted"}"#);
    }
}
