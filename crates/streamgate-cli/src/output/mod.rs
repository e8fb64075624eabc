//! Output formatting module
//!
//! Renders command results as text, JSON or comfy-table tables.

mod json;
mod table;

pub use json::JsonOutput;
pub use table::Table;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for automation
    Json,
    /// Table-formatted output
    Table,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Table => write!(f, "table"),
        }
    }
}

/// Pretty-printed JSON of `result`.
pub fn format_json<T: JsonOutput>(result: &T) -> String {
    serde_json::to_string_pretty(&result.to_json()).unwrap_or_else(|_| result.to_json().to_string())
}
