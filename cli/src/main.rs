//! file-change-viewer: prints file changes under a directory as they happen.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fcv_poll_watcher::{DisplayLine, WatchSession, WatchSettings};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

mod commands;
mod output;

use commands::{Command, HELP};
use output::Printer;

/// Watch a directory tree and report created, modified and deleted files.
#[derive(Debug, Parser)]
#[command(name = "file-change-viewer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to watch
    root: Option<PathBuf>,

    /// Seconds between scans
    #[arg(short, long)]
    interval: Option<f64>,

    /// Do not report the files found by the first scan
    #[arg(long)]
    no_initial_log: bool,

    /// Append events to a log file named after the watched directory
    #[arg(short, long)]
    persist: bool,

    /// Directory for log files (default: current directory)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// TOML settings file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print one JSON object per line instead of colored text
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn settings(&self) -> Result<WatchSettings> {
        let mut settings = match &self.config {
            Some(path) => WatchSettings::load(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => WatchSettings::default(),
        };

        if let Some(root) = &self.root {
            settings.root = Some(root.clone());
        }
        if let Some(interval) = self.interval {
            settings.interval_secs = interval;
        }
        if self.no_initial_log {
            settings.log_initial_pass = false;
        }
        if self.persist {
            settings.persist = true;
        }
        if let Some(log_dir) = &self.log_dir {
            settings.log_dir = log_dir.clone();
        }

        settings.validate()?;
        Ok(settings)
    }
}

enum Flow {
    Continue,
    Quit,
}

async fn handle(session: &WatchSession, printer: Printer, command: Command) -> Flow {
    match command {
        Command::Root(root) => {
            // Rejections are already reported on the observer channel.
            if let Err(e) = session.run(&root).await {
                debug!("Root change rejected: {e}");
            }
        }
        Command::Interval(text) => {
            if session.set_interval_text(&text).await.is_ok() {
                let secs = session.interval().await.as_secs_f64();
                printer.print(&DisplayLine::info(format!("Changing interval to {secs}")));
            }
        }
        Command::InitialLog(enabled) => {
            session.set_log_initial_pass(enabled).await;
            printer.print(&DisplayLine::info(format!(
                "Initial scan logging {}",
                on_off(enabled)
            )));
        }
        Command::Persist(enabled) => {
            session.set_persist_enabled(enabled).await;
            printer.print(&DisplayLine::info(format!("Log file {}", on_off(enabled))));
        }
        Command::Status => {
            for text in status_lines(session).await {
                printer.print(&DisplayLine::info(text));
            }
        }
        Command::Help => {
            for text in HELP {
                printer.print(&DisplayLine::info(*text));
            }
        }
        Command::Quit => return Flow::Quit,
    }
    Flow::Continue
}

async fn status_lines(session: &WatchSession) -> Vec<String> {
    let config = session.config().await;
    let root = session
        .root()
        .await
        .map_or_else(|| "(none)".to_string(), |root| root.display().to_string());
    let log_file = config
        .persist_file_path
        .as_ref()
        .map_or_else(|| "(none)".to_string(), |path| path.display().to_string());
    let log_dir = if config.log_dir().as_os_str().is_empty() {
        "(working directory)".to_string()
    } else {
        config.log_dir().display().to_string()
    };

    vec![
        format!("root: {root}"),
        format!("phase: {:?}", session.phase().await),
        format!("interval: {}s", config.poll_interval.as_secs_f64()),
        format!("initial scan logging: {}", on_off(config.log_initial_pass)),
        format!("log file: {log_file} ({})", on_off(config.persist_enabled)),
        format!("log directory: {log_dir}"),
        format!("tracked files: {}", session.tracked_files().await.len()),
    ]
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings()?;
    let printer = Printer { json: cli.json };

    let (session, mut lines) = WatchSession::new(&settings)?;
    match &settings.root {
        Some(root) => session.run(root).await?,
        None => printer.print(&DisplayLine::info(
            "No directory selected, use `root <path>` to start watching",
        )),
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(line) = lines.recv() => printer.print(&line),
            input = stdin.next_line(), if stdin_open => {
                match input.context("failed to read stdin")? {
                    Some(text) => match commands::parse(&text) {
                        Ok(Some(command)) => {
                            if let Flow::Quit = handle(&session, printer, command).await {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(message) => printer.print(&DisplayLine::warning(message)),
                    },
                    None => {
                        debug!("stdin closed, watching until interrupted");
                        stdin_open = false;
                    }
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    info!("Shutting down");
    session.shutdown().await?;
    while let Ok(line) = lines.try_recv() {
        printer.print(&line);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_status_lines_show_log_directory() {
        let settings = WatchSettings::new()
            .with_interval(2.5)
            .with_log_dir("/var/log/fcv");
        let (session, _rx) = WatchSession::new(&settings).unwrap();

        assert_eq!(
            status_lines(&session).await,
            vec![
                "root: (none)".to_string(),
                "phase: Idle".to_string(),
                "interval: 2.5s".to_string(),
                "initial scan logging: on".to_string(),
                "log file: (none) (off)".to_string(),
                "log directory: /var/log/fcv".to_string(),
                "tracked files: 0".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_status_lines_default_log_directory() {
        let (session, _rx) = WatchSession::new(&WatchSettings::default()).unwrap();
        let lines = status_lines(&session).await;
        assert!(lines.contains(&"log directory: (working directory)".to_string()));
    }
}
