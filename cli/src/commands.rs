//! Runtime commands typed on stdin while the watcher runs.

use std::path::PathBuf;

/// A command entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Watch a different directory.
    Root(PathBuf),

    /// Change the poll interval; the text is validated by the session.
    Interval(String),

    /// Toggle reporting of the first pass.
    InitialLog(bool),

    /// Toggle the persistent log.
    Persist(bool),

    Status,
    Help,
    Quit,
}

pub const HELP: &[&str] = &[
    "root <path>        watch another directory",
    "interval <secs>    change the poll interval",
    "initial on|off     report files found on the first pass",
    "persist on|off     append events to the log file",
    "status             show the current settings",
    "quit               stop watching and exit",
];

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "root" | "cd" => {
            if rest.is_empty() {
                return Err("usage: root <path>".to_string());
            }
            Command::Root(PathBuf::from(rest))
        }
        "interval" => {
            if rest.is_empty() {
                return Err("usage: interval <secs>".to_string());
            }
            Command::Interval(rest.to_string())
        }
        "initial" => Command::InitialLog(parse_toggle(rest)?),
        "persist" => Command::Persist(parse_toggle(rest)?),
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };

    Ok(Some(command))
}

fn parse_toggle(text: &str) -> Result<bool, String> {
    match text.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(format!("expected on or off, got `{text}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse("root /tmp/my dir").unwrap(),
            Some(Command::Root(PathBuf::from("/tmp/my dir")))
        );
        assert_eq!(
            parse("  interval 0.5 ").unwrap(),
            Some(Command::Interval("0.5".to_string()))
        );
        assert_eq!(parse("initial off").unwrap(), Some(Command::InitialLog(false)));
        assert_eq!(parse("PERSIST on").unwrap(), Some(Command::Persist(true)));
        assert_eq!(parse("q").unwrap(), Some(Command::Quit));
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_interval_text_is_passed_through() {
        // Validation happens in the session so the warning reaches the observer.
        assert_eq!(
            parse("interval -5").unwrap(),
            Some(Command::Interval("-5".to_string()))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("root").is_err());
        assert!(parse("persist maybe").is_err());
        assert_eq!(
            parse("frobnicate").unwrap_err(),
            "unknown command: frobnicate (try `help`)"
        );
    }
}
