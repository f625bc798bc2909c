//! Cell output store.
//!
//! Maps a cell's declared `id` to its last captured output text. The store
//! is an explicitly constructed, injectable instance shared by cloning;
//! every clone reads and writes the same mapping.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Process-lifetime mapping from cell id to captured output.
///
/// Later stores for the same id silently replace earlier ones: re-running
/// a cell updates its published value.
#[derive(Debug, Clone, Default)]
pub struct OutputStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl OutputStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under an id, replacing any previous value.
    pub fn store(&self, id: impl Into<String>, value: impl Into<String>) {
        self.entries.lock().insert(id.into(), value.into());
    }

    /// Get the value stored under an id.
    pub fn get(&self, id: &str) -> Option<String> {
        self.entries.lock().get(id).cloned()
    }

    /// Check whether an id has a stored value.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Stored ids, sorted for stable display.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}
