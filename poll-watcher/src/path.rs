//! Path helpers: lexical normalization and log file naming.

use std::path::{Component, Path, PathBuf};

/// Extension appended to every persisted log file.
const LOG_EXTENSION: &str = ".txt";

/// Derive the log file name for a watched root.
///
/// Path separators, spaces and colons all become `-`, so the name is safe to
/// create in a flat directory on every platform.
pub fn log_file_name(root: &Path) -> String {
    let mut name: String = root
        .to_string_lossy()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ' ' | ':' => '-',
            other => other,
        })
        .collect();
    name.push_str(LOG_EXTENSION);
    name
}

/// Lexically normalize a path.
///
/// Removes `.` segments and redundant separators, and folds `..` into the
/// preceding normal segment. The filesystem is never consulted, so symlinks
/// are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}
