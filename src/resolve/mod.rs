//! Variable and file substitution.
//!
//! Resolves `{{name}}` placeholders in a cell's source before execution.
//! Three data sources are consulted in a fixed precedence: workspace files
//! (tokens ending in `.md`), the cell output store, and variables tables
//! from earlier markup cells. Unresolvable tokens are reported as errors
//! and left literal; any error blocks execution of the cell.

mod store;
mod workspace;

pub use store::OutputStore;
pub use workspace::Workspace;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::notebook::{visible_variables, Document};

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{([^}]+)\}\}").unwrap());

/// How substituted store values are spliced into the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Executable code: stored values are spliced raw.
    Code,

    /// AI-prompt text: stored values are wrapped in a bare fenced block so
    /// the model sees them as quoted context.
    Prompt,
}

/// Outcome of resolving one cell source.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Source with every resolvable placeholder substituted; unresolved
    /// tokens remain literal
    pub resolved: String,

    /// One message per unresolvable token. Non-empty means the cell must
    /// not execute; this list is authoritative, not the resolved text.
    pub errors: Vec<String>,
}

impl Resolution {
    /// Check that every placeholder resolved.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Substitution engine bound to an output store and a workspace.
#[derive(Debug)]
pub struct Resolver<'a> {
    store: &'a OutputStore,
    workspace: &'a Workspace,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over a store and workspace.
    pub fn new(store: &'a OutputStore, workspace: &'a Workspace) -> Self {
        Self { store, workspace }
    }

    /// Resolve every `{{token}}` in `source` for the cell at `position`.
    ///
    /// Matches are found against the original source and replacements are
    /// applied positionally, so one token's resolution can never match a
    /// substring produced by another token's replacement.
    pub fn resolve(
        &self,
        source: &str,
        document: &Document,
        position: usize,
        body: BodyKind,
    ) -> Resolution {
        let variables = visible_variables(document, position);
        let mut resolved = String::with_capacity(source.len());
        let mut errors = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER_RE.captures_iter(source) {
            let whole = caps.get(0).expect("match");
            let token = caps.get(1).expect("token group").as_str();

            resolved.push_str(&source[last..whole.start()]);
            match self.lookup(token, &variables, body) {
                Ok(value) => resolved.push_str(&value),
                Err(message) => {
                    errors.push(message);
                    resolved.push_str(whole.as_str());
                }
            }
            last = whole.end();
        }
        resolved.push_str(&source[last..]);

        Resolution { resolved, errors }
    }

    /// Resolve one token: file path, then store, then variables table.
    fn lookup(
        &self,
        token: &str,
        variables: &std::collections::HashMap<String, String>,
        body: BodyKind,
    ) -> Result<String, String> {
        if token.ends_with(".md") {
            return self.workspace.read_file(token).ok_or_else(|| {
                format!("Failed to read file '{token}': File not found: {token}")
            });
        }

        if let Some(value) = self.store.get(token) {
            return Ok(match body {
                BodyKind::Prompt => format!("```\n{value}\n```"),
                BodyKind::Code => value,
            });
        }

        if let Some(value) = variables.get(&token.to_lowercase()) {
            return Ok(value.clone());
        }

        Err(format!(
            "Variable '{token}' not found. Define it in a VARIABLES table or run a cell with @options {{\"id\": \"{token}\"}}."
        ))
    }
}
