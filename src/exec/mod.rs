//! Cell execution module.
//!
//! Spawns interpreter processes for resolved cell sources and captures
//! their output. Timeouts and cancellation are bounded-wait policies: a
//! timed-out cell reports the conventional exit code 124 and a cancelled
//! cell ends in a neutral state; neither is a fault.

mod cancel;
mod language;

pub use cancel::CancelToken;
pub use language::{default_shell, InputMode, Interpreter, LanguageRegistry};

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command as ProcessCommand, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Exit code reported when a cell exceeds its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Poll interval for the child wait loop.
const WAIT_POLL: Duration = Duration::from_millis(25);

/// Execution errors. Failing to start the interpreter is the only
/// infrastructural error; everything after a successful spawn is reported
/// through `ExecutionResult`.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to start interpreter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running cell: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal state of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Process exited; `None` means killed by a signal
    Exited(Option<i32>),

    /// Killed after exceeding the timeout
    TimedOut,

    /// Killed after a cancellation request
    Cancelled,
}

/// Result of executing one cell.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Terminal state
    pub status: ExecutionStatus,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Wall-clock execution time
    pub duration: Duration,
}

impl ExecutionResult {
    /// Check for a clean exit.
    pub fn success(&self) -> bool {
        self.status == ExecutionStatus::Exited(Some(0))
    }

    /// Check for cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.status == ExecutionStatus::Cancelled
    }

    /// The reportable exit code. Timeouts map to 124; cancellation has no
    /// code.
    pub fn code(&self) -> Option<i32> {
        match self.status {
            ExecutionStatus::Exited(code) => code,
            ExecutionStatus::TimedOut => Some(TIMEOUT_EXIT_CODE),
            ExecutionStatus::Cancelled => None,
        }
    }
}

/// Cell executor.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    registry: LanguageRegistry,
    timeout: Option<Duration>,
    working_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl Executor {
    /// Create an executor with the default language registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific language registry.
    #[must_use]
    pub fn with_registry(mut self, registry: LanguageRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the execution timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Execute a resolved cell source.
    ///
    /// Blocks until the process finishes, times out, or the token is
    /// cancelled. Output pipes are drained on reader threads so a chatty
    /// child can never dead-lock the wait loop.
    pub fn execute(
        &self,
        source: &str,
        language: &str,
        cancel: &CancelToken,
    ) -> Result<ExecutionResult, ExecError> {
        let start = Instant::now();
        let interpreter = self.registry.interpreter_for(language);

        let mut cmd = ProcessCommand::new(&interpreter.program);
        cmd.args(&interpreter.args);
        if interpreter.input == InputMode::Argument {
            cmd.arg(source);
        }

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(if interpreter.input == InputMode::Stdin {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        tracing::debug!(program = %interpreter.program, language, "Spawning interpreter");

        let mut child = cmd
            .spawn()
            .map_err(|source| ExecError::Spawn { program: interpreter.program.clone(), source })?;

        if interpreter.input == InputMode::Stdin {
            if let Some(mut stdin) = child.stdin.take() {
                // The child may exit before reading everything; a broken
                // pipe here is not an execution failure.
                let _ = stdin.write_all(source.as_bytes());
            }
        }

        let stdout_handle = spawn_reader(child.stdout.take());
        let stderr_handle = spawn_reader(child.stderr.take());

        let deadline = self.timeout.map(|t| start + t);
        let status = wait_for_exit(&mut child, deadline, cancel)?;

        let stdout = stdout_handle.join().unwrap_or_default();
        let stderr = stderr_handle.join().unwrap_or_default();

        Ok(ExecutionResult { status, stdout, stderr, duration: start.elapsed() })
    }

}

/// Poll the child until exit, timeout, or cancellation.
fn wait_for_exit(
    child: &mut Child,
    deadline: Option<Instant>,
    cancel: &CancelToken,
) -> Result<ExecutionStatus, ExecError> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(ExecutionStatus::Exited(status.code()));
        }

        if cancel.is_cancelled() {
            tracing::debug!("Cancellation requested, killing cell process");
            kill_and_reap(child);
            return Ok(ExecutionStatus::Cancelled);
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::debug!("Cell timed out, killing process");
            kill_and_reap(child);
            return Ok(ExecutionStatus::TimedOut);
        }

        std::thread::sleep(WAIT_POLL);
    }
}

/// Drain one output pipe to a string on a dedicated thread.
fn spawn_reader<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buffer = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buffer);
        }
        buffer
    })
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> Executor {
        Executor::new()
    }

    #[test]
    fn test_execute_captures_stdout() {
        let result = executor().execute("echo hello", "sh", &CancelToken::new()).unwrap();

        assert!(result.success());
        assert_eq!(result.code(), Some(0));
        assert_eq!(result.stdout, "hello\n");
        assert!(result.stderr.is_empty());
    }

    #[test]
    fn test_execute_captures_stderr_and_exit_code() {
        let result =
            executor().execute("echo oops >&2; exit 3", "sh", &CancelToken::new()).unwrap();

        assert!(!result.success());
        assert_eq!(result.code(), Some(3));
        assert_eq!(result.stderr, "oops\n");
    }

    #[test]
    fn test_timeout_reports_124() {
        let result = executor()
            .timeout(Duration::from_millis(150))
            .execute("sleep 5", "sh", &CancelToken::new())
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::TimedOut);
        assert_eq!(result.code(), Some(TIMEOUT_EXIT_CODE));
        assert!(!result.success());
        assert!(result.duration < Duration::from_secs(4));
    }

    #[test]
    fn test_cancellation_is_neutral() {
        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });

        let result = executor().execute("sleep 5", "sh", &cancel).unwrap();
        handle.join().unwrap();

        assert!(result.is_cancelled());
        assert_eq!(result.code(), None);
        assert!(result.duration < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_interpreter_is_a_spawn_error() {
        let registry = LanguageRegistry::new().with_override("weird", "definitely-not-a-program");
        let error = Executor::new()
            .with_registry(registry)
            .execute("anything", "weird", &CancelToken::new())
            .unwrap_err();

        assert!(matches!(error, ExecError::Spawn { .. }));
        assert!(error.to_string().contains("definitely-not-a-program"));
    }

    #[test]
    fn test_stdin_delivery_for_scripting_language() {
        // `cat` echoes its stdin back, standing in for a real interpreter.
        let registry = LanguageRegistry::new().with_override("catlang", "cat");
        let result = Executor::new()
            .with_registry(registry)
            .execute("line one\nline two", "catlang", &CancelToken::new())
            .unwrap();

        assert!(result.success());
        assert_eq!(result.stdout, "line one\nline two");
    }

    #[test]
    fn test_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = executor()
            .working_dir(dir.path())
            .execute("pwd", "sh", &CancelToken::new())
            .unwrap();

        assert!(result.success());
        assert!(result.stdout.trim_end().ends_with(
            dir.path().file_name().and_then(|n| n.to_str()).unwrap()
        ));
    }

    #[test]
    fn test_env_passthrough() {
        let result = executor()
            .with_env("RUNMARK_TEST_VALUE", "42")
            .execute("echo $RUNMARK_TEST_VALUE", "sh", &CancelToken::new())
            .unwrap();

        assert_eq!(result.stdout, "42\n");
    }
}
