//! Per-cell options header parsing.
//!
//! A cell may carry configuration on its first line as a comment:
//! `// @options {"id": "build", "timeout": 30}`. The comment prefix depends
//! on the cell's language. The header accepts strict JSON or a loose
//! JavaScript-style object literal (bare keys, single quotes); a malformed
//! header is warned about and ignored, but the line is consumed either way.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keyword introducing an options header.
pub const OPTIONS_KEYWORD: &str = "@options";

/// Parsed per-cell options. Re-derived from the header line on every parse,
/// never persisted separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellOptions {
    /// Output Store key for this cell's captured output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Execution timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,

    /// Free-form execution mode for agent-style cells
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Any further keys, kept for extensibility
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl CellOptions {
    /// Check if no option was set.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.timeout.is_none() && self.mode.is_none() && self.extra.is_empty()
    }

    /// Get the timeout as a `Duration`, ignoring non-positive values.
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout.filter(|t| t.is_finite() && *t > 0.0).map(Duration::from_secs_f64)
    }
}

/// Comment prefixes per language tag, with built-in defaults and
/// per-language overrides (e.g. from configuration).
#[derive(Debug, Clone, Default)]
pub struct CommentStyles {
    overrides: HashMap<String, String>,
}

impl CommentStyles {
    /// Create the built-in mapping with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the prefix for one language.
    #[must_use]
    pub fn with_override(mut self, language: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.overrides.insert(language.into().to_lowercase(), prefix.into());
        self
    }

    /// Resolve the comment prefix for a language tag.
    pub fn prefix_for(&self, language: &str) -> &str {
        let key = language.to_lowercase();
        if let Some(prefix) = self.overrides.get(&key) {
            return prefix;
        }
        builtin_prefix(&key)
    }
}

/// Built-in comment prefix per language. Unknown languages default to `//`.
fn builtin_prefix(language: &str) -> &'static str {
    match language {
        "sh" | "bash" | "zsh" | "fish" | "python" | "py" | "ruby" | "rb" | "perl" | "r"
        | "yaml" | "toml" | "powershell" | "elixir" => "#",
        "sql" | "lua" | "haskell" => "--",
        _ => "//",
    }
}

/// Parse the options header from a cell source.
///
/// Only the first line is considered. When it starts with
/// `<comment-prefix> @options `, the line is stripped from the returned
/// source whether or not the object literal parses.
pub fn parse_options(source: &str, language: &str, styles: &CommentStyles) -> (CellOptions, String) {
    let (first_line, rest) = match source.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (source, ""),
    };

    let prefix = format!("{} {} ", styles.prefix_for(language), OPTIONS_KEYWORD);
    let trimmed = first_line.trim();
    let Some(literal) = trimmed.strip_prefix(&prefix) else {
        return (CellOptions::default(), source.to_string());
    };

    let literal = literal.trim();
    let options = match serde_json::from_str::<CellOptions>(literal) {
        Ok(options) => options,
        Err(_) => match serde_json::from_str::<CellOptions>(&quote_loose_literal(literal)) {
            Ok(options) => options,
            Err(error) => {
                tracing::warn!(language, %error, "Malformed @options header, using defaults");
                CellOptions::default()
            }
        },
    };

    (options, rest.to_string())
}

/// Rewrite a loose object literal into strict JSON: bare keys are quoted
/// and single-quoted strings become double-quoted. No expression is ever
/// evaluated.
fn quote_loose_literal(literal: &str) -> String {
    let chars: Vec<char> = literal.chars().collect();
    let mut out = String::with_capacity(literal.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let ch = chars[i];
                    out.push(ch);
                    i += 1;
                    if ch == '\\' && i < chars.len() {
                        out.push(chars[i]);
                        i += 1;
                    } else if ch == '"' {
                        break;
                    }
                }
            }
            '\'' => {
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let ch = chars[i];
                    i += 1;
                    if ch == '\'' {
                        break;
                    } else if ch == '\\' && i < chars.len() {
                        let next = chars[i];
                        i += 1;
                        if next == '\'' {
                            out.push('\'');
                        } else {
                            out.push('\\');
                            out.push(next);
                        }
                    } else if ch == '"' {
                        out.push('\\');
                        out.push('"');
                    } else {
                        out.push(ch);
                    }
                }
                out.push('"');
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();

                // Quote the word only when it is an object key.
                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ':' {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(&word);
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styles() -> CommentStyles {
        CommentStyles::new()
    }

    #[test]
    fn test_strict_json_header() {
        let source = "// @options {\"id\": \"build\", \"timeout\": 30}\nnpm run build";
        let (options, stripped) = parse_options(source, "js", &styles());

        assert_eq!(options.id.as_deref(), Some("build"));
        assert_eq!(options.timeout, Some(30.0));
        assert_eq!(stripped, "npm run build");
    }

    #[test]
    fn test_comment_prefix_follows_language() {
        let source = "# @options {\"id\": \"listing\"}\nls -la";
        let (options, stripped) = parse_options(source, "sh", &styles());

        assert_eq!(options.id.as_deref(), Some("listing"));
        assert_eq!(stripped, "ls -la");

        // The shell prefix does not match a JS-style cell.
        let (options, stripped) = parse_options(source, "js", &styles());
        assert!(options.is_empty());
        assert_eq!(stripped, source);
    }

    #[test]
    fn test_loose_literal_bare_keys_and_single_quotes() {
        let source = "// @options {id: 'deploy', mode: 'plan', timeout: 5}\ndo things";
        let (options, stripped) = parse_options(source, "", &styles());

        assert_eq!(options.id.as_deref(), Some("deploy"));
        assert_eq!(options.mode.as_deref(), Some("plan"));
        assert_eq!(options.timeout, Some(5.0));
        assert_eq!(stripped, "do things");
    }

    #[test]
    fn test_malformed_header_is_consumed() {
        let source = "// @options {this is not an object\necho hi";
        let (options, stripped) = parse_options(source, "js", &styles());

        assert!(options.is_empty());
        assert_eq!(stripped, "echo hi");
    }

    #[test]
    fn test_non_header_first_line_untouched() {
        let source = "echo hello\necho world";
        let (options, stripped) = parse_options(source, "sh", &styles());

        assert!(options.is_empty());
        assert_eq!(stripped, source);
    }

    #[test]
    fn test_options_parse_is_idempotent() {
        let source = "# @options {\"id\": \"x\"}\necho hi";
        let (first, stripped) = parse_options(source, "sh", &styles());
        assert_eq!(first.id.as_deref(), Some("x"));

        let (second, again) = parse_options(&stripped, "sh", &styles());
        assert!(second.is_empty());
        assert_eq!(again, stripped);
    }

    #[test]
    fn test_extra_keys_are_kept() {
        let source = "// @options {\"id\": \"a\", \"interactive\": true}\nbody";
        let (options, _) = parse_options(source, "js", &styles());

        assert_eq!(options.extra.get("interactive"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_header_only_cell_strips_to_empty() {
        let source = "# @options {\"id\": \"solo\"}";
        let (options, stripped) = parse_options(source, "sh", &styles());

        assert_eq!(options.id.as_deref(), Some("solo"));
        assert_eq!(stripped, "");
    }

    #[test]
    fn test_comment_style_override() {
        let styles = CommentStyles::new().with_override("nu", "#");
        assert_eq!(styles.prefix_for("nu"), "#");
        assert_eq!(styles.prefix_for("NU"), "#");
        assert_eq!(styles.prefix_for("rust"), "//");
        assert_eq!(styles.prefix_for("sql"), "--");
    }

    #[test]
    fn test_quote_loose_literal() {
        assert_eq!(
            quote_loose_literal("{id: 'a', timeout: 2, ok: true}"),
            "{\"id\": \"a\", \"timeout\": 2, \"ok\": true}"
        );
        assert_eq!(quote_loose_literal("{mode: 'don\\'t'}"), "{\"mode\": \"don't\"}");
        // Strict JSON passes through unchanged.
        assert_eq!(quote_loose_literal("{\"id\": \"a: b\"}"), "{\"id\": \"a: b\"}");
    }

    #[test]
    fn test_timeout_duration() {
        let (options, _) =
            parse_options("# @options {\"timeout\": 0.5}\nsleep 1", "sh", &styles());
        assert_eq!(options.timeout_duration(), Some(Duration::from_millis(500)));

        let (options, _) =
            parse_options("# @options {\"timeout\": -1}\nsleep 1", "sh", &styles());
        assert_eq!(options.timeout_duration(), None);
    }
}
