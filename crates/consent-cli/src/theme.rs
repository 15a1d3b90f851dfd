//! CLI theme and styling.

use colored::Colorize;
use consent_ledger::Origin;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(72).dimmed().to_string()
    }

    /// Label and value on one line.
    pub(crate) fn field(label: &str, value: &str) -> String {
        format!("  {:<14} {value}", label.dimmed())
    }

    /// Badge for ledger vs synthetic data.
    pub(crate) fn origin(origin: Origin) -> String {
        match origin {
            Origin::Ledger => "ledger".green().bold().to_string(),
            Origin::Synthetic => "synthetic".yellow().bold().to_string(),
        }
    }
}

