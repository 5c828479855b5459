//! Watch session: shared state plus the background polling task.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classifier::RetainedState;
use crate::config::{WatchConfig, WatchSettings, parse_interval, parse_interval_text};
use crate::error::{Result, WatcherError};
use crate::event::{DisplayLine, FileEvent};
use crate::path::normalize_path;
use crate::sink::EventSink;
use crate::snapshot::Snapshot;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No root selected yet.
    Idle,

    /// A root is selected but has not completed a pass.
    FirstPass,

    /// At least one pass has completed against the current root.
    SteadyState,
}

/// Everything a pass reads or writes, behind one lock.
struct WatchState {
    root: Option<PathBuf>,

    /// Bumped on every root change so in-flight passes can tell they are stale.
    generation: u64,

    /// Sequence number handed to the next pass.
    next_pass: u64,

    /// Sequence number of the last pass whose snapshot was applied.
    applied_pass: u64,

    retained: RetainedState,
    config: WatchConfig,
}

/// Root and configuration captured at the start of a pass.
struct PassPlan {
    root: PathBuf,
    generation: u64,
    sequence: u64,
    config: WatchConfig,
}

struct SessionInner {
    state: Mutex<WatchState>,

    /// Held for a whole pass so passes never overlap.
    pass_guard: Mutex<()>,

    sink: EventSink,
}

impl SessionInner {
    async fn begin_pass(&self) -> Option<PassPlan> {
        let mut state = self.state.lock().await;
        let root = state.root.clone()?;
        state.next_pass += 1;
        Some(PassPlan {
            root,
            generation: state.generation,
            sequence: state.next_pass,
            config: state.config.clone(),
        })
    }

    /// Classify a snapshot taken for `plan`. Returns nothing if the root was
    /// replaced while the snapshot was being taken, or if a pass that started
    /// later has already been applied.
    async fn finish_pass(&self, plan: &PassPlan, snapshot: &Snapshot) -> Vec<FileEvent> {
        let mut state = self.state.lock().await;
        if state.generation != plan.generation {
            debug!(
                "Root changed while walking {}, discarding pass",
                plan.root.display()
            );
            return Vec::new();
        }
        if plan.sequence <= state.applied_pass {
            debug!(
                "Pass {} superseded by pass {}, discarding",
                plan.sequence, state.applied_pass
            );
            return Vec::new();
        }
        state.applied_pass = plan.sequence;
        state.retained.apply(snapshot, plan.config.log_initial_pass)
    }

    async fn pass(&self) -> Result<Vec<FileEvent>> {
        let _guard = self.pass_guard.lock().await;
        let Some(plan) = self.begin_pass().await else {
            return Ok(Vec::new());
        };

        let walk_root = plan.root.clone();
        let snapshot = tokio::task::spawn_blocking(move || Snapshot::take(&walk_root)).await?;

        let events = self.finish_pass(&plan, &snapshot).await;
        self.sink.deliver(&events, &plan.config).await;
        Ok(events)
    }
}

/// A single watch session over one (replaceable) root directory.
///
/// At most one polling task runs per session. Selecting a new root
/// redirects that task instead of starting another one; the change is
/// picked up at the start of the next pass.
pub struct WatchSession {
    inner: Arc<SessionInner>,

    /// Handle of the polling task, once started.
    task: Mutex<Option<JoinHandle<()>>>,

    /// Stops the polling task.
    cancel: CancellationToken,
}

impl WatchSession {
    /// Create a session and the receiver its observer should drain.
    pub fn new(settings: &WatchSettings) -> Result<(Self, mpsc::UnboundedReceiver<DisplayLine>)> {
        let config = WatchConfig::from_settings(settings)?;
        let (sink, line_rx) = EventSink::new();

        let session = Self {
            inner: Arc::new(SessionInner {
                state: Mutex::new(WatchState {
                    root: None,
                    generation: 0,
                    next_pass: 0,
                    applied_pass: 0,
                    retained: RetainedState::new(),
                    config,
                }),
                pass_guard: Mutex::new(()),
                sink,
            }),
            task: Mutex::new(None),
            cancel: CancellationToken::new(),
        };

        Ok((session, line_rx))
    }

    /// Watch `root`, starting the polling task if it is not running yet.
    ///
    /// An empty path is ignored. A path that is not an existing directory
    /// is rejected and leaves the session untouched.
    pub async fn run(&self, root: impl AsRef<Path>) -> Result<()> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            return Err(WatcherError::SessionClosed);
        }

        self.select_root(root).await?;

        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }

        let inner = self.inner.clone();
        let cancel = self.cancel.clone();
        *task = Some(tokio::spawn(poll_loop(inner, cancel)));
        Ok(())
    }

    /// Switch to `root` without touching the polling task.
    ///
    /// Returns whether the root actually changed. Changing it clears the
    /// retained state and retargets the log file.
    pub async fn select_root(&self, root: impl AsRef<Path>) -> Result<bool> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Ok(false);
        }

        let root = normalize_path(&std::path::absolute(root)?);
        if !root.exists() {
            self.inner
                .sink
                .notify(DisplayLine::warning(format!("Not a valid folder: {}", root.display())));
            return Err(WatcherError::DirectoryNotFound(root.display().to_string()));
        }
        if !root.is_dir() {
            self.inner
                .sink
                .notify(DisplayLine::warning(format!("Not a valid folder: {}", root.display())));
            return Err(WatcherError::NotADirectory(root.display().to_string()));
        }

        let mut state = self.inner.state.lock().await;
        if state.root.as_deref() == Some(root.as_path()) {
            return Ok(false);
        }

        info!("Watching directory: {}", root.display());
        state.config.retarget(&root);
        state.retained.reset();
        state.generation += 1;
        state.root = Some(root);
        Ok(true)
    }

    /// Run one pass now and return the events it produced.
    ///
    /// Intended for callers that drive passes themselves instead of calling
    /// [`WatchSession::run`].
    pub async fn poll_once(&self) -> Result<Vec<FileEvent>> {
        self.inner.pass().await
    }

    /// Change the poll interval. Non-positive or non-finite values are
    /// reported to the observer and leave the interval unchanged.
    pub async fn set_interval(&self, secs: f64) -> Result<()> {
        let parsed = parse_interval(secs);
        self.apply_interval(parsed, &secs.to_string()).await
    }

    /// Change the poll interval from user-entered text.
    pub async fn set_interval_text(&self, text: &str) -> Result<()> {
        let parsed = parse_interval_text(text);
        self.apply_interval(parsed, text.trim()).await
    }

    async fn apply_interval(&self, parsed: Result<Duration>, shown: &str) -> Result<()> {
        match parsed {
            Ok(interval) => {
                self.inner.state.lock().await.config.poll_interval = interval;
                info!("Poll interval set to {interval:?}");
                Ok(())
            }
            Err(e) => {
                warn!("Rejected poll interval {shown}");
                self.inner
                    .sink
                    .notify(DisplayLine::warning(format!("Invalid new interval: {shown}")));
                Err(e)
            }
        }
    }

    /// Report (or not) the files found on the first pass of a root.
    pub async fn set_log_initial_pass(&self, enabled: bool) {
        self.inner.state.lock().await.config.log_initial_pass = enabled;
        debug!("Initial pass logging set to {enabled}");
    }

    /// Turn appending events to the log file on or off.
    pub async fn set_persist_enabled(&self, enabled: bool) {
        self.inner.state.lock().await.config.persist_enabled = enabled;
        debug!("Persistence set to {enabled}");
    }

    /// Current live configuration.
    pub async fn config(&self) -> WatchConfig {
        self.inner.state.lock().await.config.clone()
    }

    /// Current poll interval.
    pub async fn interval(&self) -> Duration {
        self.inner.state.lock().await.config.poll_interval
    }

    /// Root currently being watched.
    pub async fn root(&self) -> Option<PathBuf> {
        self.inner.state.lock().await.root.clone()
    }

    pub async fn phase(&self) -> SessionPhase {
        let state = self.inner.state.lock().await;
        match (&state.root, state.retained.is_first_pass()) {
            (None, _) => SessionPhase::Idle,
            (Some(_), true) => SessionPhase::FirstPass,
            (Some(_), false) => SessionPhase::SteadyState,
        }
    }

    /// Files the session currently remembers, in path order.
    pub async fn tracked_files(&self) -> Vec<PathBuf> {
        let state = self.inner.state.lock().await;
        state.retained.paths().map(Path::to_path_buf).collect()
    }

    /// Whether the polling task is alive.
    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the polling task and wait for it to exit.
    pub async fn shutdown(&self) -> Result<()> {
        self.cancel.cancel();
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            handle.await?;
        }
        Ok(())
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_loop(inner: Arc<SessionInner>, cancel: CancellationToken) {
    info!("Poll loop started");

    while !cancel.is_cancelled() {
        if let Err(e) = inner.pass().await {
            error!("Polling pass failed: {e}");
        }

        let interval = inner.state.lock().await.config.poll_interval;
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Poll loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Color, FileEventKind};
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn session() -> (WatchSession, mpsc::UnboundedReceiver<DisplayLine>) {
        WatchSession::new(&WatchSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_new_session_is_idle() {
        let (session, _rx) = session();
        assert_eq!(session.phase().await, SessionPhase::Idle);
        assert_eq!(session.root().await, None);
        assert!(!session.is_running().await);
        assert!(session.poll_once().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected() {
        let result = WatchSession::new(&WatchSettings::new().with_interval(-1.0));
        assert!(matches!(result, Err(WatcherError::InvalidInterval(_))));
    }

    #[tokio::test]
    async fn test_rejected_intervals_keep_previous_value() {
        let (session, mut rx) = session();
        session.set_interval(2.0).await.unwrap();

        assert_err!(session.set_interval(0.0).await);
        assert_err!(session.set_interval(-5.0).await);
        assert_err!(session.set_interval_text("abc").await);
        assert_eq!(session.interval().await, Duration::from_secs(2));

        let warning = rx.recv().await.unwrap();
        assert_eq!(warning, DisplayLine::new("Invalid new interval: 0", Color::Red));
        assert_eq!(rx.recv().await.unwrap().text, "Invalid new interval: -5");
        assert_eq!(rx.recv().await.unwrap().text, "Invalid new interval: abc");
    }

    #[tokio::test]
    async fn test_flags_update() {
        let (session, _rx) = session();
        session.set_log_initial_pass(false).await;
        session.set_persist_enabled(true).await;

        let config = session.config().await;
        assert!(!config.log_initial_pass);
        assert!(config.persist_enabled);
    }

    #[tokio::test]
    async fn test_invalid_root_leaves_state() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("plain.txt");
        File::create(&file_path).unwrap();

        let (session, mut rx) = session();
        session.select_root(temp_dir.path()).await.unwrap();

        let missing = session.run(temp_dir.path().join("nope")).await;
        assert!(matches!(missing, Err(WatcherError::DirectoryNotFound(_))));
        let not_dir = session.select_root(&file_path).await;
        assert!(matches!(not_dir, Err(WatcherError::NotADirectory(_))));

        assert_eq!(session.root().await, Some(temp_dir.path().to_path_buf()));
        assert!(!session.is_running().await);
        assert!(rx.recv().await.unwrap().text.starts_with("Not a valid folder"));
    }

    #[tokio::test]
    async fn test_empty_root_is_noop() {
        let (session, _rx) = session();
        assert_ok!(session.run("").await);
        assert_eq!(session.phase().await, SessionPhase::Idle);
        assert!(!session.is_running().await);
    }

    #[tokio::test]
    async fn test_phase_transitions() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let (session, _rx) = session();

        assert!(session.select_root(first.path()).await.unwrap());
        assert_eq!(session.phase().await, SessionPhase::FirstPass);

        session.poll_once().await.unwrap();
        assert_eq!(session.phase().await, SessionPhase::SteadyState);

        // Same root again is not a change.
        assert!(!session.select_root(first.path()).await.unwrap());
        assert_eq!(session.phase().await, SessionPhase::SteadyState);

        assert!(session.select_root(second.path()).await.unwrap());
        assert_eq!(session.phase().await, SessionPhase::FirstPass);
    }

    #[tokio::test]
    async fn test_stale_pass_is_discarded() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        File::create(first.path().join("a.txt")).unwrap();

        let (session, _rx) = session();
        session.select_root(first.path()).await.unwrap();

        let plan = session.inner.begin_pass().await.unwrap();
        let snapshot = Snapshot::take(&plan.root);
        session.select_root(second.path()).await.unwrap();

        let events = session.inner.finish_pass(&plan, &snapshot).await;
        assert!(events.is_empty());
        assert!(session.tracked_files().await.is_empty());
        assert_eq!(session.phase().await, SessionPhase::FirstPass);
    }

    #[tokio::test]
    async fn test_older_pass_cannot_roll_back_newer_one() {
        let temp_dir = TempDir::new().unwrap();
        let b = temp_dir.path().join("b.txt");
        File::create(temp_dir.path().join("a.txt")).unwrap();

        let (session, _rx) = session();
        session.select_root(temp_dir.path()).await.unwrap();
        session.poll_once().await.unwrap();

        let plan = session.inner.begin_pass().await.unwrap();
        let older = Snapshot::take(&plan.root);
        File::create(&b).unwrap();

        let events = session.poll_once().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, FileEventKind::Created);

        assert!(session.inner.finish_pass(&plan, &older).await.is_empty());
        assert!(session.tracked_files().await.contains(&b));
        assert!(session.poll_once().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_root_is_normalized() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
        let (session, _rx) = session();

        let dotted = temp_dir.path().join("sub").join("..").join(".");
        session.select_root(&dotted).await.unwrap();
        assert_eq!(session.root().await, Some(temp_dir.path().to_path_buf()));
    }

    #[tokio::test]
    async fn test_poll_once_reports_baseline() {
        let temp_dir = TempDir::new().unwrap();
        File::create(temp_dir.path().join("a.txt")).unwrap();
        let (session, mut rx) = session();
        session.select_root(temp_dir.path()).await.unwrap();

        let events = session.poll_once().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, FileEventKind::Baseline);
        assert_eq!(rx.recv().await.unwrap(), events[0].display_line());
    }

    #[tokio::test]
    async fn test_run_after_shutdown_fails() {
        let temp_dir = TempDir::new().unwrap();
        let (session, _rx) = session();
        session.shutdown().await.unwrap();

        let result = session.run(temp_dir.path()).await;
        assert!(matches!(result, Err(WatcherError::SessionClosed)));
    }
}
