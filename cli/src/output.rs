//! Rendering observer lines for the terminal.

use fcv_poll_watcher::{Color, DisplayLine};
use owo_colors::OwoColorize;
use tracing::warn;

/// Prints observer lines to stdout, colored or as JSON.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    pub json: bool,
}

impl Printer {
    pub fn print(&self, line: &DisplayLine) {
        match self.render(line) {
            Some(text) => println!("{text}"),
            None => warn!("Could not render line: {}", line.text),
        }
    }

    pub fn render(&self, line: &DisplayLine) -> Option<String> {
        if self.json {
            return serde_json::to_string(line).ok();
        }

        // Black is left to the terminal's default foreground.
        let text = match line.color {
            Color::Black => line.text.clone(),
            Color::Green => line.text.green().to_string(),
            Color::Blue => line.text.blue().to_string(),
            Color::Red => line.text.red().to_string(),
        };
        Some(text)
    }
}
