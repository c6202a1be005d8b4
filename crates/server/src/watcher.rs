//! Source-tree watcher
//!
//! Filesystem notifications arrive on notify's own thread; they are marshaled
//! onto the session's event loop over a bounded channel rather than touching
//! shared state. Extension filtering happens in the session, where the state
//! machine lives.

use crate::session::Event;
use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use pynative_core::error::{Error, ErrorCode, Result};
use std::path::Path;
use tokio::sync::mpsc;

/// Owns the notify subscription; dropping it releases the watch
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
}

impl SourceWatcher {
    /// Watch `root` recursively, forwarding change events into the session.
    ///
    /// Top-level symlinked directories are watched through their targets,
    /// matching how app projects link shared source trees in. Any setup
    /// failure aborts server startup.
    pub fn start(root: &Path, events: mpsc::Sender<Event>) -> Result<Self> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<NotifyEvent>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("watch error: {}", e);
                    return;
                }
            };
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }
            for path in event.paths {
                // Runs on the watcher thread; blocking until the loop drains
                // is the backpressure.
                let _ = events.blocking_send(Event::FileChanged { path });
            }
        })
        .map_err(watch_error)?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(watch_error)?;
        tracing::info!("watching for changes in {}", root.display());

        for entry in std::fs::read_dir(root)? {
            let path = entry?.path();
            if path.is_symlink() && path.is_dir() {
                let target = std::fs::canonicalize(&path)?;
                tracing::info!("watching for changes in {}", target.display());
                watcher
                    .watch(&target, RecursiveMode::Recursive)
                    .map_err(watch_error)?;
            }
        }

        Ok(Self { _watcher: watcher })
    }
}

fn watch_error(e: notify::Error) -> Error {
    Error::new(ErrorCode::WatcherError, format!("File watcher error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_fails_on_missing_root() {
        let (tx, _rx) = mpsc::channel(16);
        let missing = Path::new("/nonexistent/pynative-watch-root");
        assert!(SourceWatcher::start(missing, tx).is_err());
    }

    #[tokio::test]
    async fn test_start_on_real_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::channel(16);
        let watcher = SourceWatcher::start(dir.path(), tx);
        assert!(watcher.is_ok());
    }
}
