//! Configuration management for Runmark.
//!
//! Handles loading configuration from TOML files. A `runmark.toml` next to
//! the runbook wins over the user-level config directory; absence of both
//! yields defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::notebook::CommentStyles;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Execution settings
    pub exec: ExecConfig,

    /// AI settings
    #[cfg(feature = "ai")]
    pub ai: AiConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Whether `run` writes captured outputs back into the document
    pub save_outputs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { save_outputs: true }
    }
}

/// Execution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Shell for shell-tagged and unknown cells
    pub shell: Option<String>,

    /// Default timeout (seconds) for cells without one in their options
    pub default_timeout_secs: Option<f64>,

    /// Comment-prefix overrides per language tag
    pub comments: HashMap<String, String>,

    /// Interpreter-program overrides per language tag
    pub interpreters: HashMap<String, String>,
}

/// AI settings.
#[cfg(feature = "ai")]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Preferred backend: "claude", "ollama", or "auto"
    pub provider: Option<String>,

    /// Model name passed to the backend
    pub model: Option<String>,

    /// Base URL override (Ollama host, API proxy, ...)
    pub base_url: Option<String>,
}

/// Config file name looked up next to the runbook.
pub const CONFIG_FILE: &str = "runmark.toml";

impl Config {
    /// Load configuration for a workspace root, falling back to the user
    /// config directory, then to defaults. Parse failures are warned about
    /// and treated as absent.
    pub fn load(workspace_root: &Path) -> Self {
        let candidates = [
            Some(workspace_root.join(CONFIG_FILE)),
            dirs::config_dir().map(|d| d.join("runmark").join("config.toml")),
        ];

        for path in candidates.into_iter().flatten() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => {
                        tracing::debug!(path = ?path, "Loaded configuration");
                        return config;
                    }
                    Err(error) => {
                        tracing::warn!(path = ?path, %error, "Ignoring unreadable config file");
                    }
                }
            }
        }

        Self::default()
    }

    /// Parse a configuration file.
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Build the comment-style mapping: built-ins plus configured
    /// overrides.
    pub fn comment_styles(&self) -> CommentStyles {
        let mut styles = CommentStyles::new();
        for (language, prefix) in &self.exec.comments {
            styles = styles.with_override(language.clone(), prefix.clone());
        }
        styles
    }
}
