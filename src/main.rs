//! Runmark - run markdown runbooks as notebooks.
//!
//! Parses a markdown runbook into cells, executes them in order, and
//! writes captured output back into the document.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(feature = "ai")]
use std::sync::Arc;

#[cfg(feature = "ai")]
use runmark::PromptRouter;
use runmark::{
    deserialize, parse_options, serialize, BodyKind, CancelToken, CellRunResult, CellStatus,
    Config, Document, NotebookRunner, OutputStore, Resolver, Workspace,
};

/// Run markdown runbooks as notebooks
#[derive(Parser)]
#[command(name = "runmark")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a runbook's cells in document order
    Run {
        /// Runbook file
        file: PathBuf,

        /// Run only the cell at this position (0-based)
        #[arg(short, long)]
        cell: Option<usize>,

        /// Seed the output store before running (name=value)
        #[arg(long = "var")]
        vars: Vec<String>,

        /// Don't write captured outputs back into the file
        #[arg(long)]
        no_save: bool,

        /// Default timeout in seconds for cells without one in their options
        #[arg(long)]
        timeout: Option<f64>,
    },

    /// List a runbook's cells
    Show {
        /// Runbook file
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Resolve every placeholder without executing anything
    Check {
        /// Runbook file
        file: PathBuf,
    },

    /// Remove all captured output sections from a runbook
    Clean {
        /// Runbook file
        file: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { file, cell, vars, no_save, timeout } => {
            cmd_run(&file, cell, &vars, no_save, timeout).await
        }
        Commands::Show { file, format } => cmd_show(&file, &format),
        Commands::Check { file } => cmd_check(&file),
        Commands::Clean { file } => cmd_clean(&file),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "runmark", &mut io::stdout());
            Ok(())
        }
    }
}

/// Initialize the tracing subscriber. Diagnostics go to stderr so captured
/// cell output on stdout stays clean.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("runmark=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("runmark=warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

/// The directory owning a runbook, used as the workspace root.
fn workspace_root(file: &Path) -> PathBuf {
    file.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

async fn cmd_run(
    file: &Path,
    cell: Option<usize>,
    vars: &[String],
    no_save: bool,
    timeout: Option<f64>,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read runbook {}", file.display()))?;
    let root = workspace_root(file);
    let config = Config::load(&root);
    let mut document = deserialize(&text);

    let store = OutputStore::new();
    for var in vars {
        let (name, value) = var
            .split_once('=')
            .with_context(|| format!("Invalid --var '{var}', expected name=value"))?;
        store.store(name, value);
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(error) = ctrlc::set_handler(move || handler_token.cancel()) {
        tracing::warn!(%error, "Could not install Ctrl-C handler");
    }

    let mut runner = NotebookRunner::from_config(store, Workspace::new(&root), &config);
    if let Some(secs) = timeout {
        if secs > 0.0 {
            runner = runner.with_default_timeout(Duration::from_secs_f64(secs));
        }
    }

    #[cfg(feature = "ai")]
    {
        let router = PromptRouter::from_config(&config.ai).await;
        if router.is_available() {
            tracing::debug!(backend = router.active_backend(), "Prompt backend ready");
            runner = runner.with_prompt_router(Arc::new(router));
        }
    }

    let results = match cell {
        Some(index) => {
            anyhow::ensure!(
                index < document.len(),
                "Cell index {index} out of range (document has {} cells)",
                document.len()
            );
            vec![runner.run_cell(&mut document, index, &cancel).await]
        }
        None => runner.run(&mut document, &cancel).await,
    };

    print_report(&document, &results);

    if !no_save && config.general.save_outputs {
        std::fs::write(file, serialize(&document))
            .with_context(|| format!("Failed to save runbook {}", file.display()))?;
    }

    if results.iter().any(|r| {
        matches!(r.status, CellStatus::Failed { .. } | CellStatus::SubstitutionFailed)
    }) {
        std::process::exit(1);
    }
    if results.iter().any(|r| r.status.is_cancelled()) {
        std::process::exit(130);
    }
    Ok(())
}

/// Print the per-cell run report with captured output.
fn print_report(document: &Document, results: &[CellRunResult]) {
    for result in results {
        let marker = match &result.status {
            CellStatus::Success => "ok",
            CellStatus::Failed { .. } => "failed",
            CellStatus::SubstitutionFailed => "blocked",
            CellStatus::Cancelled => "cancelled",
            CellStatus::Skipped => "skipped",
        };
        let language =
            if result.language.is_empty() { String::new() } else { format!(" {}", result.language) };
        println!("[{marker}] cell {} ({}{language}) {:.2?}", result.index, result.kind, result.duration);

        for output in document.cells[result.index].outputs() {
            for line in output.text.lines() {
                println!("    {line}");
            }
        }
    }

    let run = results.iter().filter(|r| !matches!(r.status, CellStatus::Skipped)).count();
    let ok = results.iter().filter(|r| r.status.is_success()).count();
    println!("{ok}/{run} cells succeeded");
}

fn cmd_show(file: &Path, format: &str) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read runbook {}", file.display()))?;
    let config = Config::load(&workspace_root(file));
    let styles = config.comment_styles();
    let document = deserialize(&text);

    let summaries: Vec<CellSummary> = document
        .cells
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let id = cell.source().and_then(|source| {
                let (options, _) = parse_options(source, cell.language().unwrap_or(""), &styles);
                options.id
            });
            CellSummary {
                index,
                kind: cell.kind_name(),
                language: cell.language().map(String::from),
                id,
                lines: match cell {
                    runmark::Cell::Markup { text } => text.lines().count(),
                    runmark::Cell::Code { source, .. } => source.lines().count(),
                },
            }
        })
        .collect();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            let language = summary.language.as_deref().unwrap_or("");
            let id = summary.id.as_deref().map(|i| format!(" id={i}")).unwrap_or_default();
            println!(
                "{:>3}  {:<7} {:<10}{} ({} lines)",
                summary.index, summary.kind, language, id, summary.lines
            );
        }
    }
    Ok(())
}

/// One row of `show` output.
#[derive(serde::Serialize)]
struct CellSummary {
    index: usize,
    kind: &'static str,
    language: Option<String>,
    id: Option<String>,
    lines: usize,
}

fn cmd_check(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read runbook {}", file.display()))?;
    let root = workspace_root(file);
    let config = Config::load(&root);
    let styles = config.comment_styles();
    let document = deserialize(&text);

    // Dry run: ids a cell would publish are seeded as the walk advances, so
    // later references to them resolve.
    let store = OutputStore::new();
    let workspace = Workspace::new(&root);
    let mut problems = 0usize;

    for (index, cell) in document.code_cells() {
        let language = cell.language().unwrap_or("");
        let source = cell.source().unwrap_or("");
        let (options, body) = parse_options(source, language, &styles);
        let body_kind = if cell.is_prompt() { BodyKind::Prompt } else { BodyKind::Code };

        let resolution =
            Resolver::new(&store, &workspace).resolve(&body, &document, index, body_kind);
        for error in &resolution.errors {
            println!("cell {index}: {error}");
            problems += 1;
        }

        if let Some(id) = options.id {
            store.store(id, String::new());
        }
    }

    if problems > 0 {
        println!("{problems} unresolved placeholder(s)");
        std::process::exit(1);
    }
    println!("All placeholders resolve");
    Ok(())
}

fn cmd_clean(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read runbook {}", file.display()))?;

    // Deserialization already discards output regions; serializing the
    // result writes none back.
    let document = deserialize(&text);
    std::fs::write(file, serialize(&document))
        .with_context(|| format!("Failed to save runbook {}", file.display()))?;

    println!("Removed output sections from {}", file.display());
    Ok(())
}
