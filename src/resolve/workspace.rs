//! Workspace-relative file resolution.

use std::path::{Path, PathBuf};

/// Resolves relative paths against the runbook's owning workspace root.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a workspace rooted at a directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a workspace-relative file, returning `None` when it does not
    /// exist or cannot be read.
    pub fn read_file(&self, relative: &str) -> Option<String> {
        let path = self.root.join(relative);
        std::fs::read_to_string(path).ok()
    }
}
