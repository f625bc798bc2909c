//! Notebook document model.
//!
//! A runbook is an ordered list of cells parsed from a markdown document:
//! prose, executable fenced blocks, and their captured outputs. This module
//! owns the cell types, the text/document serializer, the per-cell
//! options header, and the variables-table scanner.

mod cell;
mod options;
mod serializer;
mod table;

pub use cell::{Cell, Document, Output, RenderHint, PROMPT_LANGUAGES};
pub use options::{parse_options, CellOptions, CommentStyles, OPTIONS_KEYWORD};
pub use serializer::{deserialize, serialize};
pub use table::visible_variables;
