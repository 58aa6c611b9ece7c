//! Output formatting for CLI commands

use std::io::IsTerminal;

use serde::Serialize;

use crate::domain::TaskId;
use crate::storage;

const LIGHT_RED: &str = "\x1b[91m";
const RESET: &str = "\x1b[0m";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl From<storage::OutputFormat> for OutputFormat {
    fn from(format: storage::OutputFormat) -> Self {
        match format {
            storage::OutputFormat::Text => OutputFormat::Text,
            storage::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
    color: bool,
}

impl Output {
    /// Colors are used only on a terminal, and never when `NO_COLOR` is set
    pub fn new(format: OutputFormat) -> Self {
        let color = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self { format, color }
    }

    pub fn plain(format: OutputFormat) -> Self {
        Self {
            format,
            color: false,
        }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                if let Ok(json) = serde_json::to_string_pretty(data) {
                    println!("{}", json);
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(data) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Short task id, highlighted when colors are on
    pub fn short_id(&self, id: &TaskId) -> String {
        if self.color {
            format!("{LIGHT_RED}{}{RESET}", id.short())
        } else {
            id.short().to_string()
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Returns true if using text format
    pub fn is_text(&self) -> bool {
        self.format == OutputFormat::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn plain_short_id_has_no_escapes() {
        let id = TaskId::new("Plain", Utc::now());
        let output = Output::plain(OutputFormat::Text);
        assert_eq!(output.short_id(&id), id.short());
        assert!(output.is_text());
    }

    #[test]
    fn colored_short_id_is_wrapped() {
        let id = TaskId::new("Color", Utc::now());
        let output = Output {
            format: OutputFormat::Text,
            color: true,
        };
        assert_eq!(output.short_id(&id), format!("\x1b[91m{}\x1b[0m", id.short()));
    }

    #[test]
    fn config_format_converts() {
        assert_eq!(OutputFormat::from(storage::OutputFormat::Json), OutputFormat::Json);
        assert!(Output::plain(storage::OutputFormat::Json.into()).is_json());
    }
}
