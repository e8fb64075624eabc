//! Table formatting for CLI output

use comfy_table::{Cell, Color, ContentArrangement, Table as ComfyTable};

/// Two-column key/value table
#[derive(Debug, Clone)]
pub struct Table {
    inner: ComfyTable,
}

impl Table {
    /// Start a table with the given headers.
    pub fn new(headers: &[&str]) -> Self {
        let mut inner = ComfyTable::new();
        inner
            .set_header(headers.to_vec())
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_width(100);
        Self { inner }
    }

    /// Add a plain row.
    pub fn row(mut self, label: &str, value: impl ToString) -> Self {
        self.inner
            .add_row(vec![Cell::new(label), Cell::new(value.to_string())]);
        self
    }

    /// Add a row whose value is highlighted when `alert` is set.
    pub fn flagged_row(mut self, label: &str, value: impl ToString, alert: bool) -> Self {
        let cell = Cell::new(value.to_string());
        let cell = if alert { cell.fg(Color::Red) } else { cell.fg(Color::Green) };
        self.inner.add_row(vec![Cell::new(label), cell]);
        self
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}
