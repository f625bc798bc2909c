//! Language registry.
//!
//! Maps a cell's language tag to the interpreter that runs it. Shell tags
//! receive the source as a `-c` argument; scripting languages read it from
//! stdin. Unknown or empty tags run through the default shell.

use std::collections::HashMap;

/// How a cell's source reaches the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Piped to the interpreter's stdin
    Stdin,

    /// Appended as the final command-line argument (shell `-c` style)
    Argument,
}

/// A resolved interpreter invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    /// Program to spawn
    pub program: String,

    /// Arguments before the source (if `Argument` mode)
    pub args: Vec<String>,

    /// How the source is delivered
    pub input: InputMode,
}

impl Interpreter {
    fn shell(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: vec![shell_flag(program).to_string()],
            input: InputMode::Argument,
        }
    }

    fn stdin(program: &str) -> Self {
        Self { program: program.to_string(), args: Vec::new(), input: InputMode::Stdin }
    }
}

/// The platform default shell.
pub fn default_shell() -> &'static str {
    if cfg!(target_os = "windows") {
        "cmd"
    } else {
        "sh"
    }
}

fn shell_flag(program: &str) -> &'static str {
    if program == "cmd" {
        "/C"
    } else {
        "-c"
    }
}

/// Interpreter lookup with a configurable default shell and per-language
/// overrides.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    shell: String,
    overrides: HashMap<String, String>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self { shell: default_shell().to_string(), overrides: HashMap::new() }
    }
}

impl LanguageRegistry {
    /// Create a registry using the platform default shell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default shell used for shell-tagged and unknown cells.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Override the interpreter program for one language (stdin delivery).
    #[must_use]
    pub fn with_override(mut self, language: impl Into<String>, program: impl Into<String>) -> Self {
        self.overrides.insert(language.into().to_lowercase(), program.into());
        self
    }

    /// Resolve the interpreter for a language tag.
    pub fn interpreter_for(&self, language: &str) -> Interpreter {
        let key = language.to_lowercase();

        if let Some(program) = self.overrides.get(&key) {
            return Interpreter::stdin(program);
        }

        match key.as_str() {
            "sh" | "bash" | "zsh" | "fish" => Interpreter::shell(&key),
            "python" | "py" => Interpreter::stdin("python3"),
            "javascript" | "js" | "node" => Interpreter::stdin("node"),
            "typescript" | "ts" => Interpreter::stdin("ts-node"),
            "ruby" | "rb" => Interpreter::stdin("ruby"),
            "perl" => Interpreter::stdin("perl"),
            _ => Interpreter::shell(&self.shell),
        }
    }
}
