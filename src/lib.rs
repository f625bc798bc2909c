//! # Runmark
//!
//! Run markdown runbooks as notebooks.
//!
//! A runbook is an ordinary markdown document whose fenced code blocks are
//! executable cells. Runmark parses the document into cells, resolves
//! `{{name}}` placeholders against earlier cell outputs, variables tables,
//! and workspace files, executes each cell through an interpreter or an AI
//! prompt backend, and serializes captured output back into the document.
//!
//! ## Quick Start
//!
//! ```bash
//! # Install
//! cargo install runmark
//!
//! # Execute a runbook
//! runmark run deploy.md
//!
//! # Or use the short alias
//! rmk run deploy.md
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod exec;
pub mod markdown;
pub mod notebook;
pub mod resolve;
pub mod runner;

#[cfg(feature = "ai")]
pub mod ai;

#[cfg(feature = "ai")]
pub use ai::{ClaudeBackend, OllamaBackend, PromptBackend, PromptError, PromptRouter};

pub use config::Config;
pub use exec::{
    CancelToken, ExecError, ExecutionResult, ExecutionStatus, Executor, LanguageRegistry,
    TIMEOUT_EXIT_CODE,
};
pub use markdown::{looks_like_markdown, render_hint};
pub use notebook::{
    deserialize, parse_options, serialize, Cell, CellOptions, CommentStyles, Document, Output,
    RenderHint,
};
pub use resolve::{BodyKind, OutputStore, Resolution, Resolver, Workspace};
pub use runner::{CellRunResult, CellStatus, NotebookRunner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "runmark";

/// Short alias
pub const APP_ALIAS: &str = "rmk";
