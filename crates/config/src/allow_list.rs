// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hot-reloadable allow-list of application identifiers.
//!
//! The manager owns the parsed config; readers borrow snapshots through
//! a reader-writer lock. Reloads replace the ordered list and the
//! membership set together, so a concurrent reader sees either the old
//! or the new state, never a mix.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Table names owned by the schema itself; never valid app identifiers.
pub const RESERVED_NAMES: &[&str] = &["ubuntu_report", "schema_migrations"];

/// Errors that can occur loading or watching configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
}

/// On-disk shape of the daemon config file.
#[derive(Debug, Default, Deserialize)]
struct DaemonConfig {
    #[serde(rename = "allowList", default)]
    allow_list: Vec<String>,
}

#[derive(Debug, Default)]
struct Snapshot {
    list: Vec<String>,
    set: HashSet<String>,
}

/// File-backed registry of permitted application identifiers.
///
/// Cloning is cheap; clones share the loaded state.
#[derive(Debug, Clone)]
pub struct AllowListManager {
    path: PathBuf,
    snapshot: Arc<RwLock<Snapshot>>,
}

impl AllowListManager {
    /// Create a manager for the given config file. Nothing is loaded
    /// until [`load`](Self::load) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            snapshot: Arc::new(RwLock::new(Snapshot::default())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory state from disk.
    ///
    /// On any failure the previously loaded state is preserved.
    /// Reserved and empty names are dropped with a warning; duplicates
    /// keep their first position.
    pub fn load(&self) -> Result<(), ConfigError> {
        let raw = std::fs::read(&self.path)?;
        let config: DaemonConfig = serde_json::from_slice(&raw)?;

        let mut list = Vec::with_capacity(config.allow_list.len());
        let mut set = HashSet::with_capacity(config.allow_list.len());
        for name in config.allow_list {
            if name.is_empty() {
                warn!("dropping empty allow-list entry");
                continue;
            }
            if RESERVED_NAMES.contains(&name.as_str()) {
                warn!(name = %name, "dropping reserved allow-list entry");
                continue;
            }
            if set.insert(name.clone()) {
                list.push(name);
            }
        }

        debug!(apps = list.len(), path = %self.path.display(), "allow-list loaded");
        *self.snapshot.write() = Snapshot { list, set };
        Ok(())
    }

    /// Snapshot copy of the ordered allow-list.
    pub fn allow_list(&self) -> Vec<String> {
        self.snapshot.read().list.clone()
    }

    /// Membership test against the current snapshot.
    pub fn is_allowed(&self, name: &str) -> bool {
        self.snapshot.read().set.contains(name)
    }

    /// Watch the config file for changes until `cancel` fires.
    ///
    /// The watcher registers on the parent directory so it survives
    /// atomic-rename updates. Events for other files in the directory
    /// are ignored. A successful reload sends at most one pending
    /// signal on the returned reload channel (bursts coalesce); reload
    /// failures are logged and swallowed. The error channel delivers
    /// only unrecoverable watcher errors. Both channels close when the
    /// token is cancelled and the watcher has been dropped.
    pub fn watch(
        &self,
        cancel: CancellationToken,
    ) -> Result<(mpsc::Receiver<()>, mpsc::Receiver<notify::Error>), ConfigError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (reload_tx, reload_rx) = mpsc::channel(1);
        let (err_tx, err_rx) = mpsc::channel(1);
        let (event_tx, mut event_rx) = mpsc::channel::<Result<notify::Event, notify::Error>>(32);

        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                let _ = event_tx.blocking_send(res);
            })?;
        watcher.watch(&parent, RecursiveMode::NonRecursive)?;

        let manager = self.clone();
        tokio::spawn(async move {
            // Owned by the task so the OS watch lives exactly as long
            // as the loop; dropping it closes the event channel.
            let _watcher = watcher;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = event_rx.recv() => match event {
                        Some(Ok(event)) => manager.handle_event(event, &reload_tx),
                        Some(Err(e)) => {
                            let _ = err_tx.send(e).await;
                            break;
                        }
                        None => break,
                    },
                }
            }
            debug!(path = %manager.path.display(), "allow-list watcher stopped");
        });

        Ok((reload_rx, err_rx))
    }

    fn handle_event(&self, event: notify::Event, reload_tx: &mpsc::Sender<()>) {
        // Writes, creates and renames all reach the file; reads and
        // metadata-only churn do not.
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }
        // The watch is non-recursive on the parent, so matching the
        // file name is matching the full path regardless of whether
        // the event carries an absolute or relative form.
        let file_name = self.path.file_name();
        if !event.paths.iter().any(|p| p.file_name() == file_name) {
            return;
        }

        match self.load() {
            // Capacity-1 channel: an unconsumed signal absorbs the burst.
            Ok(()) => {
                let _ = reload_tx.try_send(());
            }
            Err(e) => {
                warn!(error = %e, "allow-list reload failed; keeping previous state");
            }
        }
    }
}

#[cfg(test)]
#[path = "allow_list_tests.rs"]
mod tests;
