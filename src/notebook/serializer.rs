//! Runbook (de)serialization.
//!
//! Bidirectional transform between a flat markdown document and the ordered
//! cell list. Parsing is a line-oriented state machine; captured output
//! sections are regenerated on save and therefore discarded on load.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Cell, Document};

/// Fence delimiter line.
const FENCE: &str = "```";

/// Marker line introducing a regenerated-output region.
const OUTPUT_MARKER: &str = "**Output:**";

/// A fence with a clean language word. Anything else that starts with a
/// fence opens with an empty language tag.
static FENCE_LANG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```(\w+)$").unwrap());

/// Scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    InCode,
    InOutput,
}

/// Parse a runbook document from markdown text.
///
/// Output sections (`**Output:**` followed by a fenced block) are dropped:
/// only markup and code sources are restored as editable state. An
/// unterminated fence still emits its cell at end of input.
pub fn deserialize(text: &str) -> Document {
    let mut cells = Vec::new();
    let mut state = ScanState::Outside;
    let mut markup = String::new();
    let mut code_language = String::new();
    let mut code_source = String::new();

    let mut lines = text.lines().peekable();

    while let Some(line) = lines.next() {
        match state {
            ScanState::Outside => {
                if line == OUTPUT_MARKER && lines.peek().copied() == Some(FENCE) {
                    finalize_markup(&mut cells, &mut markup);
                    lines.next(); // opening fence of the output region
                    state = ScanState::InOutput;
                } else if line.starts_with(FENCE) {
                    finalize_markup(&mut cells, &mut markup);
                    code_language = fence_language(line);
                    code_source.clear();
                    state = ScanState::InCode;
                } else {
                    markup.push_str(line);
                    markup.push('\n');
                }
            }
            ScanState::InCode => {
                if line.starts_with(FENCE) {
                    cells.push(finalize_code(&mut code_language, &mut code_source));
                    state = ScanState::Outside;
                } else {
                    code_source.push_str(line);
                    code_source.push('\n');
                }
            }
            ScanState::InOutput => {
                // Stale output content is not modeled; execution regenerates it.
                if line == FENCE {
                    state = ScanState::Outside;
                }
            }
        }
    }

    match state {
        ScanState::Outside => finalize_markup(&mut cells, &mut markup),
        // Unterminated fence: the cell is emitted, not dropped.
        ScanState::InCode => cells.push(finalize_code(&mut code_language, &mut code_source)),
        ScanState::InOutput => {}
    }

    Document { cells }
}

/// Render a document back to markdown text.
///
/// Cells are separated by a single blank line. Output text uses the
/// markdown hard-linebreak convention: two trailing spaces on every line
/// except the last of each output.
pub fn serialize(document: &Document) -> String {
    let mut blocks = Vec::with_capacity(document.cells.len());

    for cell in &document.cells {
        match cell {
            Cell::Markup { text } => blocks.push(text.clone()),
            Cell::Code { language, source, outputs } => {
                let mut block = format!("```{language}\n{}\n```", source.trim_end());

                if !outputs.is_empty() {
                    block.push_str("\n\n");
                    block.push_str(OUTPUT_MARKER);
                    block.push('\n');
                    block.push_str(FENCE);
                    block.push('\n');
                    for output in outputs {
                        block.push_str(&hard_linebreaks(&output.text));
                        block.push('\n');
                    }
                    block.push_str(FENCE);
                }

                blocks.push(block);
            }
        }
    }

    let mut text = blocks.join("\n\n");
    if !text.is_empty() {
        text.push('\n');
    }
    text
}

/// Extract the language tag from an opening fence line.
fn fence_language(line: &str) -> String {
    FENCE_LANG_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Close the accumulating markup cell, dropping whitespace-only cells so
/// that the blank-line separators emitted by `serialize` do not become
/// phantom cells on re-parse.
fn finalize_markup(cells: &mut Vec<Cell>, markup: &mut String) {
    let text = markup.trim();
    if !text.is_empty() {
        cells.push(Cell::markup(text));
    }
    markup.clear();
}

/// Close the accumulating code cell, trimming exactly one trailing newline
/// from the source.
fn finalize_code(language: &mut String, source: &mut String) -> Cell {
    let trimmed = source.strip_suffix('\n').unwrap_or(source).to_string();
    let cell = Cell::code(std::mem::take(language), trimmed);
    source.clear();
    cell
}

/// Append two trailing spaces to every line except the last.
fn hard_linebreaks(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join("  \n")
}
