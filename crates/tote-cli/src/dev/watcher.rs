//! File system watcher for development mode.
//!
//! Watches the project directory and forwards changes to source files,
//! skipping `node_modules`, hidden entries and the build's own output.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{CliError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Directory names never watched, wherever they appear.
const IGNORED_DIRS: &[&str] = &["node_modules", "target"];

/// What the watcher skips.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    /// Absolute directories, e.g. the output and cache directories.
    pub dirs: Vec<PathBuf>,
}

impl IgnoreRules {
    pub fn new(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            dirs: dirs.into_iter().collect(),
        }
    }

    fn should_ignore(&self, path: &Path, root: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return true;
        };
        if self.dirs.iter().any(|dir| path.starts_with(dir)) {
            return true;
        }

        relative.components().any(|component| {
            let name = component.as_os_str().to_string_lossy();
            (name.starts_with('.') && name != "." && name != "..")
                || IGNORED_DIRS.contains(&name.as_ref())
                || name.ends_with('~')
        })
    }
}

/// Recursive watcher over the project root.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root`. Changes arrive on the returned channel.
    pub fn new(root: PathBuf, ignore: IgnoreRules) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(100);
        let watch_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(error = %err, "watch error");
                    return;
                }
            };
            for path in &event.paths {
                if ignore.should_ignore(path, &watch_root) {
                    continue;
                }
                let change = match event.kind {
                    EventKind::Create(_) => FileChange::Created(path.clone()),
                    EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };
                // A full channel already has a rebuild pending.
                let _ = tx.try_send(change);
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
