//! Terminal output helpers

use colored::Colorize;
use std::fmt::Display;

/// A formatted section title
pub struct SectionTitle<'a>(pub &'a str);

impl Display for SectionTitle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\n{}", self.0.bold().underline())
    }
}

/// Format a section header
pub const fn section_title(title: &str) -> SectionTitle<'_> {
    SectionTitle(title)
}

/// Format a success message
pub fn success(message: &str) -> String {
    format!("✅ {}", message.green().bold())
}

/// Format a warning message
pub fn warning(message: &str) -> String {
    format!("⚠️  {}", message.yellow().bold())
}

/// Format a failure message
pub fn failure(message: &str) -> String {
    format!("❌ {}", message.red().bold())
}

/// Format an info message
pub fn info(message: &str) -> String {
    format!("ℹ️  {}", message.blue())
}

/// Format a key-value block
pub fn key_value_box(title: &str, items: Vec<(&str, String)>) -> String {
    let mut result = format!("{}", title.bold().underline());

    for (key, value) in items {
        result.push_str(&format!("\n  {}: {}", key.bold(), value));
    }

    result
}

/// Render an optional value, `-` when absent
pub fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".dimmed().to_string(), |v| v.to_string())
}
