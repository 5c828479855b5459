//! Directory snapshots used as the input of each polling pass.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;
use walkdir::WalkDir;

/// Modification times of every regular file under a root, keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<PathBuf, SystemTime>,
}

impl Snapshot {
    /// Walk `root` and record the mtime of every regular file.
    ///
    /// A symlink to a file is recorded with its target's mtime; symlinked
    /// directories are not descended and dangling links are ignored. A file
    /// that vanishes between being listed and being stat'ed is left out, and
    /// an unreadable subtree is skipped without aborting the rest of the
    /// walk. This does blocking I/O.
    pub fn take(root: &Path) -> Self {
        let mut files = BTreeMap::new();

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry under {}: {e}", root.display());
                    continue;
                }
            };

            let file_type = entry.file_type();
            let modified = if file_type.is_file() {
                entry
                    .metadata()
                    .map_err(std::io::Error::from)
                    .and_then(|metadata| metadata.modified())
            } else if file_type.is_symlink() {
                match std::fs::metadata(entry.path()) {
                    Ok(target) if target.is_file() => target.modified(),
                    Ok(_) => continue,
                    Err(e) => Err(e),
                }
            } else {
                continue;
            };

            match modified {
                Ok(modified) => {
                    files.insert(entry.into_path(), modified);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => debug!("Could not read mtime of {}: {e}", entry.path().display()),
            }
        }

        debug!("Snapshot of {} holds {} files", root.display(), files.len());
        Self { files }
    }

    /// Number of files in the snapshot.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Modification time recorded for `path`.
    pub fn modified(&self, path: &Path) -> Option<SystemTime> {
        self.files.get(path).copied()
    }

    /// Iterate over `(path, mtime)` in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, SystemTime)> {
        self.files.iter().map(|(path, modified)| (path.as_path(), *modified))
    }
}

impl FromIterator<(PathBuf, SystemTime)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (PathBuf, SystemTime)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}
