//! File system watcher for detecting changes.
//!
//! Directories are subscribed one at a time (non-recursively) so ignored
//! subtrees never cost a watch descriptor. When a new directory appears the
//! watcher reports it and the caller extends the subscription with
//! [`FileWatcher::watch_tree`].

use crate::filter::IgnoreMatcher;
use crate::walker::Walker;
use crate::IndexerError;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Nature of a file change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// File was created
    Created,
    /// File contents were written
    Modified,
}

/// A single file change to feed into the rebuild pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path to the changed file
    pub path: PathBuf,
    /// Kind of change
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// A write to an existing file.
    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Modified,
        }
    }

    /// A newly created file.
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Created,
        }
    }
}

/// What the watcher reports to the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A file was created or written
    Changed(ChangeEvent),
    /// A file or directory was removed
    Removed(PathBuf),
    /// A directory appeared and should be subscribed
    DirectoryCreated(PathBuf),
}

/// Options for the file watcher.
#[derive(Debug, Clone)]
pub struct WatcherOptions {
    /// Debounce duration
    pub debounce_duration: Duration,
    /// Capacity of the event channel
    pub channel_capacity: usize,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(100),
            channel_capacity: 1000,
        }
    }
}

/// Debounced file system watcher.
pub struct FileWatcher {
    root: PathBuf,
    options: WatcherOptions,
    matcher: Arc<IgnoreMatcher>,
    tx: mpsc::Sender<WatchEvent>,
    rx: mpsc::Receiver<WatchEvent>,
    debouncer: Option<Debouncer<RecommendedWatcher, RecommendedCache>>,
    watched: usize,
}

impl FileWatcher {
    /// Create a watcher for `root`; nothing is subscribed until [`start`](Self::start).
    pub fn new(
        root: &Path,
        matcher: Arc<IgnoreMatcher>,
        options: WatcherOptions,
    ) -> Result<Self, IndexerError> {
        let root = root
            .canonicalize()
            .map_err(|_| IndexerError::NotFound(root.to_path_buf()))?;

        let (tx, rx) = mpsc::channel(options.channel_capacity);
        Ok(Self {
            root,
            options,
            matcher,
            tx,
            rx,
            debouncer: None,
            watched: 0,
        })
    }

    /// Subscribe the root and every non-ignored directory below it.
    pub fn start(&mut self) -> Result<usize, IndexerError> {
        let tx = self.tx.clone();
        let matcher = self.matcher.clone();

        let debouncer = new_debouncer(
            self.options.debounce_duration,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in events {
                        for change in convert_event(&event.event, &matcher) {
                            if let Err(e) = tx.blocking_send(change) {
                                error!(error = %e, "Failed to send change event");
                            }
                        }
                    }
                }
                Err(errors) => {
                    for e in errors {
                        warn!(error = %e, "Watcher error");
                    }
                }
            },
        )?;

        self.debouncer = Some(debouncer);
        let root = self.root.clone();
        let added = self.watch_tree(&root)?;

        info!(path = ?self.root, directories = added, "Started watching");

        Ok(added)
    }

    /// Subscribe `dir` and its non-ignored subdirectories.
    pub fn watch_tree(&mut self, dir: &Path) -> Result<usize, IndexerError> {
        let Some(debouncer) = self.debouncer.as_mut() else {
            return Err(IndexerError::Watcher("watcher not started".to_string()));
        };

        if self.matcher.is_ignored(dir) {
            return Ok(0);
        }

        let dirs = Walker::new(dir, self.matcher.clone()).directories()?;
        let mut added = 0;
        for d in dirs {
            debouncer
                .watch(&d, RecursiveMode::NonRecursive)
                .map_err(|e| IndexerError::Watcher(format!("failed to add {}: {}", d.display(), e)))?;
            added += 1;
        }

        self.watched += added;
        debug!(path = ?dir, added, total = self.watched, "Extended watch");

        Ok(added)
    }

    /// Receive the next event.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.rx.recv().await
    }

    /// Try to receive an event without blocking.
    pub fn try_next(&mut self) -> Option<WatchEvent> {
        self.rx.try_recv().ok()
    }

    /// Number of directories currently subscribed.
    pub fn watched_count(&self) -> usize {
        self.watched
    }

    /// Canonical root being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Convert a notify event into [`WatchEvent`]s, dropping noise.
///
/// A rename that carries both paths also reports the source as removed.
fn convert_event(event: &Event, matcher: &IgnoreMatcher) -> Vec<WatchEvent> {
    let mut converted = Vec::new();

    if let (EventKind::Modify(ModifyKind::Name(_)), [from, _, ..]) =
        (&event.kind, event.paths.as_slice())
    {
        if !matcher.is_ignored(from) && !from.exists() {
            converted.push(WatchEvent::Removed(from.clone()));
        }
    }

    let Some(path) = event.paths.last().cloned() else {
        return converted;
    };

    if matcher.is_ignored(&path) {
        return converted;
    }

    let change = match &event.kind {
        EventKind::Create(_) => {
            if path.is_dir() {
                WatchEvent::DirectoryCreated(path)
            } else {
                WatchEvent::Changed(ChangeEvent::created(path))
            }
        }
        // chmod/touch-only events carry no content change
        EventKind::Modify(ModifyKind::Metadata(_)) => return converted,
        // Renames: the destination shows up as a new file
        EventKind::Modify(ModifyKind::Name(_)) => {
            if path.is_dir() {
                WatchEvent::DirectoryCreated(path)
            } else if path.exists() {
                WatchEvent::Changed(ChangeEvent::created(path))
            } else {
                WatchEvent::Removed(path)
            }
        }
        EventKind::Modify(_) => {
            if path.is_dir() {
                return converted;
            }
            WatchEvent::Changed(ChangeEvent::modified(path))
        }
        EventKind::Remove(_) => WatchEvent::Removed(path),
        EventKind::Any | EventKind::Access(_) | EventKind::Other => return converted,
    };

    debug!(event = ?change, "File change detected");

    converted.push(change);
    converted
}
