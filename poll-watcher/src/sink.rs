//! Delivery of events to the observer and to the persistent log.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use crate::config::WatchConfig;
use crate::event::{DisplayLine, FileEvent};

/// Forwards events to the observer channel and optionally appends them to
/// a log file.
pub struct EventSink {
    /// Observer channel.
    line_tx: mpsc::UnboundedSender<DisplayLine>,

    /// Open log file and the path it was opened for. The lock serializes
    /// appends.
    log: Mutex<Option<(PathBuf, File)>>,
}

impl EventSink {
    /// Create a sink and the receiver the observer should drain.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DisplayLine>) {
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let sink = Self {
            line_tx,
            log: Mutex::new(None),
        };
        (sink, line_rx)
    }

    /// Send a line to the observer.
    pub fn notify(&self, line: DisplayLine) {
        if self.line_tx.send(line).is_err() {
            debug!("Observer channel closed, dropping line");
        }
    }

    /// Deliver the events of one pass in order.
    ///
    /// A failed log write is reported to the observer and otherwise ignored.
    pub async fn deliver(&self, events: &[FileEvent], config: &WatchConfig) {
        if events.is_empty() {
            return;
        }

        for event in events {
            self.notify(event.display_line());
        }

        if !config.persist_enabled {
            return;
        }
        let Some(path) = config.persist_file_path.as_deref() else {
            return;
        };

        let entries: String = events.iter().map(FileEvent::log_entry).collect();
        if let Err(e) = self.append(path, entries.as_bytes()).await {
            warn!("Failed to write log file {}: {e}", path.display());
            self.notify(DisplayLine::warning(format!(
                "Failed to write log file {}: {e}",
                path.display()
            )));
        }
    }

    async fn append(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut log = self.log.lock().await;

        let reopen = !matches!(log.as_ref(), Some((open_path, _)) if open_path == path);
        if reopen {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            debug!("Opened log file {}", path.display());
            *log = Some((path.to_path_buf(), file));
        }

        if let Some((_, file)) = log.as_mut() {
            let written = async {
                file.write_all(bytes).await?;
                file.flush().await
            }
            .await;
            if written.is_err() {
                // Reopen on the next write.
                *log = None;
            }
            written?;
        }

        Ok(())
    }
}
