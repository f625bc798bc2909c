//! Variables-table extraction.
//!
//! A markup cell may define static variables under a "Variables" heading:
//!
//! ```markdown
//! ## Variables
//!
//! | Name   | Value     |
//! | ------ | --------- |
//! | region | eu-west-1 |
//! ```
//!
//! Names are matched case-insensitively; the last row defining a name wins.
//! Only tables in markup cells positioned before the resolving cell are
//! visible.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Cell, Document};

static VARIABLES_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^#{1,6}\s+variables\s*$").unwrap());

/// Collect the variables visible at `position`: tables from markup cells
/// strictly before that cell, in document order.
pub fn visible_variables(document: &Document, position: usize) -> HashMap<String, String> {
    let mut variables = HashMap::new();

    for cell in document.cells.iter().take(position) {
        if let Cell::Markup { text } = cell {
            collect_from_markup(text, &mut variables);
        }
    }

    variables
}

/// Scan one markup cell for variables tables.
fn collect_from_markup(text: &str, variables: &mut HashMap<String, String>) {
    let lines: Vec<&str> = text.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        if VARIABLES_HEADING_RE.is_match(lines[i].trim_end()) {
            i += 1;
            while i < lines.len() && lines[i].trim().is_empty() {
                i += 1;
            }
            i = collect_table(&lines, i, variables);
        } else {
            i += 1;
        }
    }
}

/// Parse the pipe table starting at `start`. Returns the index of the first
/// line past the table.
fn collect_table(
    lines: &[&str],
    start: usize,
    variables: &mut HashMap<String, String>,
) -> usize {
    if start >= lines.len() || !is_table_row(lines[start]) {
        return start;
    }

    let header = split_row(lines[start]);
    let name_column = header.iter().position(|c| c.eq_ignore_ascii_case("name"));
    let value_column = header.iter().position(|c| c.eq_ignore_ascii_case("value"));
    let (Some(name_column), Some(value_column)) = (name_column, value_column) else {
        // Not a variables table; skip just the header row.
        return start + 1;
    };

    let mut i = start + 1;
    while i < lines.len() && is_table_row(lines[i]) {
        let cells = split_row(lines[i]);
        if !is_separator_row(&cells) {
            if let (Some(name), Some(value)) = (cells.get(name_column), cells.get(value_column)) {
                if !name.is_empty() {
                    // Last row wins on redefinition.
                    variables.insert(name.to_lowercase(), value.clone());
                }
            }
        }
        i += 1;
    }

    i
}

fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.contains('|')
}

/// Split a pipe row into trimmed cell values, tolerating both `| a | b |`
/// and `a | b` forms.
fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    trimmed.split('|').map(|cell| cell.trim().to_string()).collect()
}

/// The `| --- | :--- |` alignment row under the header.
fn is_separator_row(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells.iter().all(|cell| {
            !cell.is_empty() && cell.chars().all(|c| c == '-' || c == ':') && cell.contains('-')
        })
}
