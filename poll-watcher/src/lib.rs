//! # Poll Watcher
//!
//! This crate watches a single directory tree by polling. Every pass takes a
//! snapshot of the tree, diffs it against what the previous passes saw, and
//! reports the differences to an observer.
//!
//! ## Features
//!
//! - **Snapshot Walks**: Recursive mtime snapshots that tolerate files vanishing mid-walk
//! - **Change Classification**: Baseline, created, modified and deleted events
//! - **Runtime Configuration**: Interval and flags can change while polling
//! - **Persistence**: Optional append-only log file named after the watched root
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Watch Session                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  poll loop ──► Snapshot ──► RetainedState ──► EventSink         │
//! │      │                           │                │             │
//! │      ▼                           ▼                ▼             │
//! │  WatchConfig                FileEvent      DisplayLine / log    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod event;
pub mod path;
pub mod session;
pub mod sink;
pub mod snapshot;

pub use classifier::RetainedState;
pub use config::{WatchConfig, WatchSettings};
pub use error::{Result, WatcherError};
pub use event::{Color, DisplayLine, FileEvent, FileEventKind};
pub use path::{log_file_name, normalize_path};
pub use session::{SessionPhase, WatchSession};
pub use sink::EventSink;
pub use snapshot::Snapshot;
