//! Notebook execution driver.
//!
//! Runs cells in document order: parse the options header, resolve
//! placeholders, execute through the interpreter or the prompt backend,
//! then capture output back onto the cell and publish it to the output
//! store when the cell declares an id.
//!
//! Every failure is attached to the cell that produced it; nothing aborts
//! the rest of the document. Cancellation ends the in-flight cell in a
//! neutral state with no store write and stops the run.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

#[cfg(feature = "ai")]
use std::sync::Arc;

#[cfg(feature = "ai")]
use crate::ai::PromptRouter;
use crate::config::Config;
use crate::exec::{
    CancelToken, ExecutionResult, ExecutionStatus, Executor, LanguageRegistry, TIMEOUT_EXIT_CODE,
};
use crate::markdown::render_hint;
use crate::notebook::{parse_options, CellOptions, CommentStyles, Document, Output};
use crate::resolve::{BodyKind, OutputStore, Resolver, Workspace};

/// Terminal state of one cell run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellStatus {
    /// Executed and exited cleanly
    Success,

    /// Placeholders could not be resolved; the cell did not execute
    SubstitutionFailed,

    /// Executed and failed, or could not start. Timeouts carry code 124.
    Failed {
        /// Exit code when the process ran; `None` for startup failures
        exit_code: Option<i32>,
    },

    /// Cancelled mid-flight; neutral, no error output written
    Cancelled,

    /// Not an executable cell
    Skipped,
}

impl CellStatus {
    /// Check for a clean run.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Check for cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Report of one executed cell.
#[derive(Debug, Clone)]
pub struct CellRunResult {
    /// Cell position in the document
    pub index: usize,

    /// Cell kind ("code" or "prompt")
    pub kind: &'static str,

    /// Language tag
    pub language: String,

    /// Terminal state
    pub status: CellStatus,

    /// When the cell started
    pub started_at: DateTime<Utc>,

    /// Wall-clock run time
    pub duration: Duration,
}

/// Drives cell execution over a document.
pub struct NotebookRunner {
    store: OutputStore,
    workspace: Workspace,
    styles: CommentStyles,
    registry: LanguageRegistry,
    default_timeout: Option<Duration>,
    #[cfg(feature = "ai")]
    prompts: Option<Arc<PromptRouter>>,
}

impl NotebookRunner {
    /// Create a runner over a store and workspace with default settings.
    pub fn new(store: OutputStore, workspace: Workspace) -> Self {
        Self {
            store,
            workspace,
            styles: CommentStyles::new(),
            registry: LanguageRegistry::new(),
            default_timeout: None,
            #[cfg(feature = "ai")]
            prompts: None,
        }
    }

    /// Create a runner configured from a loaded `Config`.
    pub fn from_config(store: OutputStore, workspace: Workspace, config: &Config) -> Self {
        let mut registry = LanguageRegistry::new();
        if let Some(shell) = &config.exec.shell {
            registry = registry.with_shell(shell.clone());
        }
        for (language, program) in &config.exec.interpreters {
            registry = registry.with_override(language.clone(), program.clone());
        }

        let mut runner = Self::new(store, workspace)
            .with_comment_styles(config.comment_styles())
            .with_registry(registry);
        if let Some(secs) = config.exec.default_timeout_secs {
            if secs > 0.0 {
                runner = runner.with_default_timeout(Duration::from_secs_f64(secs));
            }
        }
        runner
    }

    /// Use a specific comment-style mapping.
    #[must_use]
    pub fn with_comment_styles(mut self, styles: CommentStyles) -> Self {
        self.styles = styles;
        self
    }

    /// Use a specific language registry.
    #[must_use]
    pub fn with_registry(mut self, registry: LanguageRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the timeout applied to cells without one in their options.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Attach a prompt backend router for AI cells.
    #[cfg(feature = "ai")]
    #[must_use]
    pub fn with_prompt_router(mut self, router: Arc<PromptRouter>) -> Self {
        self.prompts = Some(router);
        self
    }

    /// The output store this runner publishes to.
    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    /// Run every code cell in document order. Stops early on cancellation.
    pub async fn run(&self, document: &mut Document, cancel: &CancelToken) -> Vec<CellRunResult> {
        let mut results = Vec::new();

        for index in 0..document.cells.len() {
            if cancel.is_cancelled() {
                tracing::info!("Run cancelled, stopping before cell {index}");
                break;
            }
            if !document.cells[index].is_code() {
                continue;
            }

            let result = self.run_cell(document, index, cancel).await;
            let cancelled = result.status.is_cancelled();
            results.push(result);
            if cancelled {
                break;
            }
        }

        results
    }

    /// Run the single cell at `index`.
    pub async fn run_cell(
        &self,
        document: &mut Document,
        index: usize,
        cancel: &CancelToken,
    ) -> CellRunResult {
        let started_at = Utc::now();
        let start = Instant::now();

        let (language, source, is_prompt) = match document.cells.get(index) {
            Some(cell) if cell.is_code() => (
                cell.language().unwrap_or_default().to_string(),
                cell.source().unwrap_or_default().to_string(),
                cell.is_prompt(),
            ),
            _ => {
                return CellRunResult {
                    index,
                    kind: "markup",
                    language: String::new(),
                    status: CellStatus::Skipped,
                    started_at,
                    duration: start.elapsed(),
                };
            }
        };
        let kind = if is_prompt { "prompt" } else { "code" };

        tracing::info!(cell = index, language, kind, "Running cell");

        let (options, body) = parse_options(&source, &language, &self.styles);
        let body_kind = if is_prompt { BodyKind::Prompt } else { BodyKind::Code };

        let resolution =
            Resolver::new(&self.store, &self.workspace).resolve(&body, document, index, body_kind);

        if !resolution.is_ok() {
            tracing::warn!(
                cell = index,
                errors = resolution.errors.len(),
                "Substitution failed, cell not executed"
            );
            document.cells[index].set_outputs(vec![Output::plain(resolution.errors.join("\n"))]);
            return CellRunResult {
                index,
                kind,
                language,
                status: CellStatus::SubstitutionFailed,
                started_at,
                duration: start.elapsed(),
            };
        }

        let status = if is_prompt {
            self.run_prompt_cell(document, index, &resolution.resolved, &options, cancel).await
        } else {
            self.run_code_cell(document, index, &language, &resolution.resolved, &options, cancel)
        };

        CellRunResult { index, kind, language, status, started_at, duration: start.elapsed() }
    }

    /// Execute a plain code cell through the interpreter.
    fn run_code_cell(
        &self,
        document: &mut Document,
        index: usize,
        language: &str,
        resolved: &str,
        options: &CellOptions,
        cancel: &CancelToken,
    ) -> CellStatus {
        let mut executor = Executor::new()
            .with_registry(self.registry.clone())
            .working_dir(self.workspace.root());
        if let Some(timeout) = options.timeout_duration().or(self.default_timeout) {
            executor = executor.timeout(timeout);
        }

        match executor.execute(resolved, language, cancel) {
            Ok(result) if result.is_cancelled() => {
                document.cells[index].clear_outputs();
                CellStatus::Cancelled
            }
            Ok(result) if result.success() => {
                self.publish(options, &result.stdout);
                document.cells[index].set_outputs(success_outputs(&result));
                CellStatus::Success
            }
            Ok(result) => {
                document.cells[index].set_outputs(vec![failure_output(&result)]);
                CellStatus::Failed { exit_code: result.code() }
            }
            Err(error) => {
                // Startup failures surface exactly like execution failures.
                document.cells[index].set_outputs(vec![Output::plain(error.to_string())]);
                CellStatus::Failed { exit_code: None }
            }
        }
    }

    /// Execute an AI-prompt cell through the backend router.
    #[cfg(feature = "ai")]
    async fn run_prompt_cell(
        &self,
        document: &mut Document,
        index: usize,
        resolved: &str,
        options: &CellOptions,
        cancel: &CancelToken,
    ) -> CellStatus {
        let Some(router) = &self.prompts else {
            document.cells[index]
                .set_outputs(vec![Output::plain("No prompt backend available".to_string())]);
            return CellStatus::Failed { exit_code: None };
        };

        match router.complete(resolved, options, cancel).await {
            _ if cancel.is_cancelled() => {
                document.cells[index].clear_outputs();
                CellStatus::Cancelled
            }
            Ok(response) => {
                self.publish(options, &response);
                let hint = render_hint(&response);
                document.cells[index].set_outputs(vec![Output::new(response, hint)]);
                CellStatus::Success
            }
            Err(error) => {
                document.cells[index].set_outputs(vec![Output::plain(error.to_string())]);
                CellStatus::Failed { exit_code: None }
            }
        }
    }

    #[cfg(not(feature = "ai"))]
    async fn run_prompt_cell(
        &self,
        document: &mut Document,
        index: usize,
        _resolved: &str,
        _options: &CellOptions,
        _cancel: &CancelToken,
    ) -> CellStatus {
        document.cells[index]
            .set_outputs(vec![Output::plain("No prompt backend available".to_string())]);
        CellStatus::Failed { exit_code: None }
    }

    /// Publish a successful cell's output under its declared id.
    fn publish(&self, options: &CellOptions, output: &str) {
        if let Some(id) = &options.id {
            // Symmetric with the serializer's fence handling: one trailing
            // newline is not part of the published value.
            let value = output.strip_suffix('\n').unwrap_or(output);
            tracing::debug!(id, bytes = value.len(), "Publishing cell output");
            self.store.store(id.clone(), value);
        }
    }
}

/// Outputs attached after a clean exit.
fn success_outputs(result: &ExecutionResult) -> Vec<Output> {
    let mut outputs = Vec::new();
    if !result.stdout.is_empty() {
        outputs.push(Output::new(result.stdout.clone(), render_hint(&result.stdout)));
    }
    if !result.stderr.is_empty() {
        outputs.push(Output::plain(result.stderr.clone()));
    }
    outputs
}

/// The error output attached after a failed execution, carrying the exit
/// code and captured streams.
fn failure_output(result: &ExecutionResult) -> Output {
    let mut text = match result.status {
        ExecutionStatus::TimedOut => format!("Timed out (exit code {TIMEOUT_EXIT_CODE})"),
        _ => match result.code() {
            Some(code) => format!("Exit code: {code}"),
            None => "Killed by signal".to_string(),
        },
    };
    if !result.stderr.trim().is_empty() {
        text.push('\n');
        text.push_str(result.stderr.trim_end());
    }
    if !result.stdout.trim().is_empty() {
        text.push('\n');
        text.push_str(result.stdout.trim_end());
    }
    Output::plain(text)
}
