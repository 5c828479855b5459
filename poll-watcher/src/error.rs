//! Error types for the poll watcher.

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the poll watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Directory not found.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// Path exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Poll interval was not a positive number of seconds.
    #[error("invalid poll interval: {0}")]
    InvalidInterval(String),

    /// The session was shut down and cannot be restarted.
    #[error("watch session has been shut down")]
    SessionClosed,

    /// Background task failed to join.
    #[error("poll task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed.
    #[error("settings error: {0}")]
    Settings(#[from] toml::de::Error),
}
