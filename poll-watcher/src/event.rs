//! File events produced by a polling pass.

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout shared by the observer text and the log file.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A classified change to a file under the watched root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    /// The kind of event.
    pub kind: FileEventKind,

    /// Path to the affected file.
    pub path: PathBuf,

    /// File mtime for baseline, created and modified events; detection
    /// time for deletions.
    pub timestamp: DateTime<Utc>,
}

impl FileEvent {
    /// Create a new file event.
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            path: path.into(),
            timestamp,
        }
    }

    /// Create an event stamped with a file's modification time.
    pub fn at_mtime(kind: FileEventKind, path: impl Into<PathBuf>, mtime: SystemTime) -> Self {
        Self::new(kind, path, DateTime::<Utc>::from(mtime))
    }

    /// Create a deletion event stamped with the current time.
    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(FileEventKind::Deleted, path, Utc::now())
    }

    /// Observer text: `<local time> | <path>`.
    pub fn display_text(&self) -> String {
        format!(
            "{} | {}",
            format_timestamp(self.timestamp),
            self.path.display()
        )
    }

    /// The line handed to the observer.
    pub fn display_line(&self) -> DisplayLine {
        DisplayLine::new(self.display_text(), self.kind.color())
    }

    /// The line appended to the persistent log, newline included.
    pub fn log_entry(&self) -> String {
        format!("{} | {}\n", self.kind.code(), self.display_text())
    }
}

/// Kind of file event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileEventKind {
    /// File seen during the first pass of a session.
    Baseline,

    /// File appeared after the first pass.
    Created,

    /// File modification time changed.
    Modified,

    /// File is no longer present.
    Deleted,
}

impl FileEventKind {
    /// Display color for this kind.
    pub const fn color(self) -> Color {
        match self {
            Self::Baseline => Color::Black,
            Self::Created => Color::Green,
            Self::Modified => Color::Blue,
            Self::Deleted => Color::Red,
        }
    }

    /// Three-letter code used in the persistent log.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Baseline => "INI",
            Self::Created => "NEW",
            Self::Modified => "DIF",
            Self::Deleted => "DEL",
        }
    }
}

/// Display colors understood by the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    Green,
    Blue,
    Red,
}

impl Color {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Red => "red",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(text, color)` pair delivered to the observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayLine {
    pub text: String,
    pub color: Color,
}

impl DisplayLine {
    pub fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }

    /// Informational line in the default color.
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, Color::Black)
    }

    /// Warning or error line.
    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(text, Color::Red)
    }
}

/// Format a timestamp in local time.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}
