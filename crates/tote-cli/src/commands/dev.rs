//! Development server command implementation.
//!
//! Orchestrates the dev server lifecycle:
//! - Initial in-memory build
//! - File watching with debouncing
//! - HTTP server with live reload and proxying
//! - Rebuilds on change, broadcast to connected browsers
//! - Shutdown on Ctrl+C

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::mpsc;

use crate::cli::DevArgs;
use crate::config::{self, Overrides};
use crate::dev::watcher::IgnoreRules;
use crate::dev::{DevBuilder, DevEvent, DevServer, DevServerState, FileChange, FileWatcher, SharedState};
use crate::error::{CliError, Result};
use crate::ui;

/// Execute the dev command.
///
/// 1. Load configuration (development mode unless `--mode` says otherwise)
/// 2. Initial build; a failure here aborts
/// 3. Start the watcher and the HTTP server
/// 4. Rebuild on every debounced batch of changes until Ctrl+C
pub async fn execute(args: DevArgs) -> Result<()> {
    ui::info("Starting development server...");

    let loaded = config::load(&args.config, &Overrides::from_dev(&args))?;
    let dev_config = loaded.config.dev_server.clone();
    ui::info(&format!("Working directory: {}", loaded.root.display()));

    let state: SharedState = Arc::new(DevServerState::new());
    let builder = DevBuilder::new(loaded);

    ui::info("Performing initial build...");
    state.start_build();
    match builder.build().await {
        Ok(build) => {
            for warning in &build.output.warnings {
                ui::warning(&warning.to_string());
            }
            ui::success(&format!(
                "Initial build completed in {}ms ({} files in memory)",
                build.duration_ms,
                build.cache.len()
            ));
            state.complete_build(build.duration_ms, build.cache);
        }
        Err(err) => {
            state.fail_build(err.to_string());
            ui::error("Initial build failed");
            return Err(err);
        }
    }

    let loaded = builder.loaded();
    let ignore = IgnoreRules::new([
        loaded.out_dir(),
        loaded.root.join(&loaded.config.cache.cache_directory),
    ]);
    let (watcher, mut changes) = FileWatcher::new(loaded.root.clone(), ignore)?;
    ui::info(&format!("Watching for changes in: {}", watcher.root().display()));

    let server = DevServer::new(
        &dev_config,
        &loaded.root,
        &loaded.config.output.public_path,
        state.clone(),
    )?;
    let url = server.server_url();
    let mut server_handle = tokio::spawn(server.start());

    if dev_config.open {
        open_browser(&url);
    }

    ui::info("Press Ctrl+C to stop");
    let window = Duration::from_millis(dev_config.debounce_ms);

    loop {
        tokio::select! {
            Some(change) = changes.recv() => {
                let batch = debounce(change, &mut changes, window).await;
                rebuild(&batch, &builder, &state).await;
            }

            _ = signal::ctrl_c() => {
                ui::info("Shutting down development server...");
                break;
            }

            result = &mut server_handle => {
                match result {
                    Ok(Err(err)) => return Err(err),
                    Ok(Ok(())) => ui::warning("Server stopped unexpectedly"),
                    Err(err) => return Err(CliError::Server(format!("server task failed: {err}"))),
                }
                break;
            }
        }
    }

    server_handle.abort();
    ui::success("Development server stopped");
    Ok(())
}

/// Collect changes until none arrive for `window`. Repeated paths count once.
async fn debounce(first: FileChange, rx: &mut mpsc::Receiver<FileChange>, window: Duration) -> Vec<FileChange> {
    let mut batch = vec![first];
    while let Ok(Some(change)) = tokio::time::timeout(window, rx.recv()).await {
        if !batch.iter().any(|seen| seen.path() == change.path()) {
            batch.push(change);
        }
    }
    batch
}

async fn rebuild(batch: &[FileChange], builder: &DevBuilder, state: &SharedState) {
    match batch {
        [single] => ui::info(&format!("File changed: {}", single.path().display())),
        many => ui::info(&format!("{} files changed", many.len())),
    }

    state.start_build();
    state.broadcast(&DevEvent::BuildStarted).await;

    match builder.build().await {
        Ok(build) => {
            let duration_ms = build.duration_ms;
            for warning in &build.output.warnings {
                ui::warning(&warning.to_string());
            }
            state.complete_build(duration_ms, build.cache);
            ui::success(&format!(
                "Rebuild completed in {duration_ms}ms (cache {}/{})",
                build.output.stats.cache_hits,
                build.output.stats.cache_hits + build.output.stats.cache_misses
            ));
            state.broadcast(&DevEvent::BuildCompleted { duration_ms }).await;
        }
        Err(err) => {
            let error = err.to_string();
            state.fail_build(error.clone());
            ui::error(&format!("Rebuild failed: {error}"));
            state.broadcast(&DevEvent::BuildFailed { error }).await;
        }
    }
}

/// Open the server URL in the default browser.
fn open_browser(url: &str) {
    use std::process::Command;

    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    match result {
        Ok(_) => ui::info(&format!("Opened browser at {url}")),
        Err(e) => ui::warning(&format!("Failed to open browser: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_debounce_collapses_bursts() {
        let (tx, mut rx) = mpsc::channel(16);
        let a = PathBuf::from("/p/src/a.js");
        let b = PathBuf::from("/p/src/b.js");
        tx.send(FileChange::Modified(a.clone())).await.unwrap();
        tx.send(FileChange::Modified(b.clone())).await.unwrap();
        tx.send(FileChange::Modified(a.clone())).await.unwrap();

        let first = rx.recv().await.unwrap();
        let batch = debounce(first, &mut rx, Duration::from_millis(20)).await;
        let paths: Vec<_> = batch.iter().map(|c| c.path().to_path_buf()).collect();
        assert_eq!(paths, vec![a, b]);
    }

    #[tokio::test]
    async fn test_debounce_ends_when_sender_closes() {
        let (tx, mut rx) = mpsc::channel(4);
        drop(tx);
        let batch = debounce(
            FileChange::Created(PathBuf::from("/p/new.js")),
            &mut rx,
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(batch.len(), 1);
    }
}
