//! Result Renderer - rows to readable text.

use crate::models::Row;
use itertools::Itertools;
use serde_json::Value;

pub const NO_RESULTS: &str = "No results found.";

/// Rows shown in full before switching to the summary form.
const FULL_TABLE_MAX_ROWS: usize = 10;
const SUMMARY_ROWS: usize = 5;

pub fn render(rows: &[Row]) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }

    if rows.len() == 1 && rows[0].len() == 1 {
        if let Some(value) = rows[0].values().next() {
            return format!("Result: {}", display_value(value));
        }
    }

    if rows.len() > FULL_TABLE_MAX_ROWS {
        return format!(
            "Found {} results. Showing first {}:\n{}",
            rows.len(),
            SUMMARY_ROWS,
            render(&rows[..SUMMARY_ROWS])
        );
    }

    let headers: Vec<&String> = rows[0].keys().collect();
    let header_line = headers.iter().join(" | ");
    let separator = "-".repeat(header_line.chars().count());
    let mut lines = vec![header_line, separator];

    for row in rows {
        lines.push(
            headers
                .iter()
                .map(|col| row.get(*col).map(display_value).unwrap_or_else(|| "NULL".to_string()))
                .join(" | "),
        );
    }

    lines.join("\n")
}

/// Text form of a single value. Strings are unquoted; null is `NULL`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
