//! Diffing snapshots against what earlier passes have seen.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::event::{FileEvent, FileEventKind};
use crate::snapshot::Snapshot;

/// The watcher's memory of previously observed files.
#[derive(Debug, Clone)]
pub struct RetainedState {
    /// Last seen modification time per file.
    records: BTreeMap<PathBuf, SystemTime>,

    /// True until the first pass against the current root has run.
    first_pass: bool,
}

impl RetainedState {
    /// Create an empty state awaiting its first pass.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            first_pass: true,
        }
    }

    /// Forget everything, as when the watched root changes.
    pub fn reset(&mut self) {
        self.records.clear();
        self.first_pass = true;
    }

    pub fn is_first_pass(&self) -> bool {
        self.first_pass
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    /// Stored modification time for `path`.
    pub fn modified(&self, path: &Path) -> Option<SystemTime> {
        self.records.get(path).copied()
    }

    /// Tracked paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.records.keys().map(PathBuf::as_path)
    }

    /// Diff `snapshot` against the retained records and absorb it.
    ///
    /// New files are reported as [`FileEventKind::Baseline`] on the first
    /// pass (only when `log_initial_pass` is set) and as
    /// [`FileEventKind::Created`] afterwards. Files whose mtime moved are
    /// [`FileEventKind::Modified`]; files missing from the snapshot are
    /// [`FileEventKind::Deleted`] and dropped from the records. A rename is
    /// simply a deletion plus a creation.
    pub fn apply(&mut self, snapshot: &Snapshot, log_initial_pass: bool) -> Vec<FileEvent> {
        let mut events = Vec::new();

        for (path, modified) in snapshot.iter() {
            match self.records.get_mut(path) {
                None => {
                    self.records.insert(path.to_path_buf(), modified);
                    if !self.first_pass {
                        events.push(FileEvent::at_mtime(FileEventKind::Created, path, modified));
                    } else if log_initial_pass {
                        events.push(FileEvent::at_mtime(FileEventKind::Baseline, path, modified));
                    }
                }
                Some(stored) if *stored != modified => {
                    *stored = modified;
                    events.push(FileEvent::at_mtime(FileEventKind::Modified, path, modified));
                }
                Some(_) => {}
            }
        }

        let gone: Vec<PathBuf> = self
            .records
            .keys()
            .filter(|path| !snapshot.contains(path))
            .cloned()
            .collect();
        for path in gone {
            self.records.remove(&path);
            events.push(FileEvent::deleted(path));
        }

        self.first_pass = false;
        debug!(
            "Pass produced {} events, tracking {} files",
            events.len(),
            self.records.len()
        );
        events
    }
}

impl Default for RetainedState {
    fn default() -> Self {
        Self::new()
    }
}
