//! Notebook cell data structures.
//!
//! Defines the `Cell` type representing one unit of a runbook document:
//! markdown prose or an executable fenced block with captured outputs.

use serde::{Deserialize, Serialize};

/// Language tags whose cells are sent to the AI prompt backend instead of
/// an interpreter.
pub const PROMPT_LANGUAGES: &[&str] = &["prompt", "ai", "agent"];

/// One unit of a runbook document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Cell {
    /// Raw prose. Never executed; may embed a variables table.
    Markup {
        /// Markdown text of the cell
        text: String,
    },

    /// An executable fenced block.
    Code {
        /// Language tag from the opening fence (may be empty)
        language: String,

        /// Text between the fences, one trailing newline trimmed
        source: String,

        /// Outputs captured by the most recent execution
        outputs: Vec<Output>,
    },
}

impl Cell {
    /// Create a markup cell.
    pub fn markup(text: impl Into<String>) -> Self {
        Self::Markup { text: text.into() }
    }

    /// Create a code cell with no outputs.
    pub fn code(language: impl Into<String>, source: impl Into<String>) -> Self {
        Self::Code { language: language.into(), source: source.into(), outputs: Vec::new() }
    }

    /// Check if this is a code cell.
    pub fn is_code(&self) -> bool {
        matches!(self, Self::Code { .. })
    }

    /// Check if this is a markup cell.
    pub fn is_markup(&self) -> bool {
        matches!(self, Self::Markup { .. })
    }

    /// Check if this cell is an AI-prompt cell (by language tag).
    pub fn is_prompt(&self) -> bool {
        match self {
            Self::Code { language, .. } => {
                PROMPT_LANGUAGES.iter().any(|p| language.eq_ignore_ascii_case(p))
            }
            Self::Markup { .. } => false,
        }
    }

    /// Get the language tag of a code cell.
    pub fn language(&self) -> Option<&str> {
        match self {
            Self::Code { language, .. } => Some(language),
            Self::Markup { .. } => None,
        }
    }

    /// Get the source of a code cell.
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Code { source, .. } => Some(source),
            Self::Markup { .. } => None,
        }
    }

    /// Get the captured outputs of a code cell.
    pub fn outputs(&self) -> &[Output] {
        match self {
            Self::Code { outputs, .. } => outputs,
            Self::Markup { .. } => &[],
        }
    }

    /// Replace the captured outputs of a code cell. No-op for markup.
    pub fn set_outputs(&mut self, new_outputs: Vec<Output>) {
        if let Self::Code { outputs, .. } = self {
            *outputs = new_outputs;
        }
    }

    /// Remove all captured outputs. No-op for markup.
    pub fn clear_outputs(&mut self) {
        self.set_outputs(Vec::new());
    }

    /// Get a short kind name for display ("markup", "code", or "prompt").
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Markup { .. } => "markup",
            Self::Code { .. } => {
                if self.is_prompt() {
                    "prompt"
                } else {
                    "code"
                }
            }
        }
    }
}

/// One captured output of an executed cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    /// Captured text
    pub text: String,

    /// How the text should be rendered
    pub render: RenderHint,
}

impl Output {
    /// Create an output with an explicit render hint.
    pub fn new(text: impl Into<String>, render: RenderHint) -> Self {
        Self { text: text.into(), render }
    }

    /// Create a plain-text output.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, RenderHint::Plain)
    }
}

/// Render hint for a captured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderHint {
    /// Verbatim text
    Plain,

    /// Content that looks like markdown and may be rendered rich
    Markdown,
}

/// An ordered sequence of cells. Order is the execution and
/// variable-visibility order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Cells in document order
    pub cells: Vec<Cell>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document from a list of cells.
    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the document has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over (position, cell) pairs for code cells only.
    pub fn code_cells(&self) -> impl Iterator<Item = (usize, &Cell)> {
        self.cells.iter().enumerate().filter(|(_, c)| c.is_code())
    }

    /// Remove captured outputs from every cell.
    pub fn clear_outputs(&mut self) {
        for cell in &mut self.cells {
            cell.clear_outputs();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_kinds() {
        let markup = Cell::markup("# Title");
        assert!(markup.is_markup());
        assert!(!markup.is_code());
        assert!(!markup.is_prompt());
        assert_eq!(markup.kind_name(), "markup");

        let code = Cell::code("sh", "echo hi");
        assert!(code.is_code());
        assert!(!code.is_prompt());
        assert_eq!(code.language(), Some("sh"));
        assert_eq!(code.source(), Some("echo hi"));
        assert_eq!(code.kind_name(), "code");
    }

    #[test]
    fn test_prompt_language_detection() {
        assert!(Cell::code("prompt", "do things").is_prompt());
        assert!(Cell::code("AI", "do things").is_prompt());
        assert!(Cell::code("Agent", "do things").is_prompt());
        assert!(!Cell::code("python", "print()").is_prompt());
        assert!(!Cell::code("", "ls").is_prompt());
        assert_eq!(Cell::code("prompt", "x").kind_name(), "prompt");
    }

    #[test]
    fn test_set_and_clear_outputs() {
        let mut cell = Cell::code("sh", "echo hi");
        cell.set_outputs(vec![Output::plain("hi\n")]);
        assert_eq!(cell.outputs().len(), 1);

        cell.clear_outputs();
        assert!(cell.outputs().is_empty());

        // no-op on markup
        let mut markup = Cell::markup("text");
        markup.set_outputs(vec![Output::plain("ignored")]);
        assert!(markup.outputs().is_empty());
    }

    #[test]
    fn test_document_code_cells() {
        let doc = Document::from_cells(vec![
            Cell::markup("intro"),
            Cell::code("sh", "echo a"),
            Cell::markup("middle"),
            Cell::code("python", "print('b')"),
        ]);

        let positions: Vec<usize> = doc.code_cells().map(|(i, _)| i).collect();
        assert_eq!(positions, vec![1, 3]);
    }

    #[test]
    fn test_document_clear_outputs() {
        let mut doc = Document::from_cells(vec![Cell::Code {
            language: "sh".to_string(),
            source: "echo hi".to_string(),
            outputs: vec![Output::plain("hi\n")],
        }]);

        doc.clear_outputs();
        assert!(doc.cells[0].outputs().is_empty());
    }
}
