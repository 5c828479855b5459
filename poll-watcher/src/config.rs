//! Configuration types for a watch session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatcherError};
use crate::path::log_file_name;

/// Startup settings for a watch session, usually read from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Directory to watch on startup.
    pub root: Option<PathBuf>,

    /// Seconds between passes.
    pub interval_secs: f64,

    /// Whether files found on the first pass are reported.
    pub log_initial_pass: bool,

    /// Whether events are appended to a log file.
    pub persist: bool,

    /// Directory that holds log files. Empty means the working directory.
    pub log_dir: PathBuf,
}

impl WatchSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self {
            root: None,
            interval_secs: 1.0,
            log_initial_pass: true,
            persist: false,
            log_dir: PathBuf::new(),
        }
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set the root to watch.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Set the poll interval in seconds.
    pub fn with_interval(mut self, secs: f64) -> Self {
        self.interval_secs = secs;
        self
    }

    /// Set whether the first pass is reported.
    pub fn with_initial_log(mut self, enabled: bool) -> Self {
        self.log_initial_pass = enabled;
        self
    }

    /// Set whether events are persisted.
    pub fn with_persist(mut self, enabled: bool) -> Self {
        self.persist = enabled;
        self
    }

    /// Set the log directory.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Check that the interval is usable.
    pub fn validate(&self) -> Result<()> {
        parse_interval(self.interval_secs)?;
        Ok(())
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Live configuration read by every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Wait between the end of one pass and the start of the next.
    pub poll_interval: Duration,

    /// Report files found on the first pass as baseline events.
    pub log_initial_pass: bool,

    /// Append events to `persist_file_path`.
    pub persist_enabled: bool,

    /// Log file for the current root, `None` while no root is selected.
    pub persist_file_path: Option<PathBuf>,

    log_dir: PathBuf,
}

impl WatchConfig {
    /// Build the live configuration from validated settings.
    pub fn from_settings(settings: &WatchSettings) -> Result<Self> {
        Ok(Self {
            poll_interval: parse_interval(settings.interval_secs)?,
            log_initial_pass: settings.log_initial_pass,
            persist_enabled: settings.persist,
            persist_file_path: None,
            log_dir: settings.log_dir.clone(),
        })
    }

    /// Recompute the log file path for a new root.
    pub fn retarget(&mut self, root: &Path) {
        self.persist_file_path = Some(self.log_dir.join(log_file_name(root)));
    }

    /// Directory log files are created in.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            log_initial_pass: true,
            persist_enabled: false,
            persist_file_path: None,
            log_dir: PathBuf::new(),
        }
    }
}

/// Turn a number of seconds into a poll interval, rejecting anything that
/// is not strictly positive and finite.
pub fn parse_interval(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(WatcherError::InvalidInterval(secs.to_string()));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| WatcherError::InvalidInterval(secs.to_string()))
}

/// Parse user-entered interval text.
pub fn parse_interval_text(text: &str) -> Result<Duration> {
    let secs: f64 = text
        .trim()
        .parse()
        .map_err(|_| WatcherError::InvalidInterval(text.trim().to_string()))?;
    parse_interval(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_settings_defaults() {
        let settings = WatchSettings::default();
        assert_eq!(settings.interval_secs, 1.0);
        assert!(settings.log_initial_pass);
        assert!(!settings.persist);
        assert_eq!(settings.root, None);
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = WatchSettings::from_toml_str(
            r#"
            root = "/srv/data"
            interval_secs = 2.5
            persist = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.root, Some(PathBuf::from("/srv/data")));
        assert_eq!(settings.interval_secs, 2.5);
        assert!(settings.persist);
        assert!(settings.log_initial_pass);
    }

    #[test]
    fn test_settings_reject_bad_interval() {
        let result = WatchSettings::from_toml_str("interval_secs = 0.0");
        assert!(matches!(result, Err(WatcherError::InvalidInterval(_))));

        let result = WatchSettings::from_toml_str("interval_secs = \"fast\"");
        assert!(matches!(result, Err(WatcherError::Settings(_))));
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval(0.5).unwrap(), Duration::from_millis(500));
        assert!(parse_interval(0.0).is_err());
        assert!(parse_interval(-5.0).is_err());
        assert!(parse_interval(f64::NAN).is_err());
        assert!(parse_interval(f64::INFINITY).is_err());
    }

    #[test]
    fn test_parse_interval_text() {
        assert_eq!(parse_interval_text(" 2 ").unwrap(), Duration::from_secs(2));
        assert!(matches!(
            parse_interval_text("soon"),
            Err(WatcherError::InvalidInterval(text)) if text == "soon"
        ));
    }

    #[test]
    fn test_retarget_follows_root() {
        let settings = WatchSettings::new().with_log_dir("/var/log/fcv");
        let mut config = WatchConfig::from_settings(&settings).unwrap();
        assert_eq!(config.persist_file_path, None);

        config.retarget(Path::new("/home/me/docs"));
        assert_eq!(
            config.persist_file_path,
            Some(PathBuf::from("/var/log/fcv/-home-me-docs.txt"))
        );

        config.retarget(Path::new("/tmp"));
        assert_eq!(
            config.persist_file_path,
            Some(PathBuf::from("/var/log/fcv/-tmp.txt"))
        );
    }
}
