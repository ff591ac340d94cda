//! pylinter CLI - run pylint on one file, print or suppress its messages.
//!
//! ```text
//! pylinter check <file>            print diagnostics (exit 1 if any)
//! pylinter suppress <file> <line>  add `# pylint: disable=...` for that line
//! ```
//!
//! Both commands go through the same [`RunCoordinator`] an editor host would
//! use, with [`host::FileView`] standing in for the editor buffer.

mod host;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pylinter_config::PylinterConfig;
use pylinter_lint::{
    LintError, PylintLocator, RunCoordinator, RunOutcome, SuppressOutcome, TokioSpawner, View,
};

use crate::host::FileView;

#[derive(Parser)]
#[command(name = "pylinter")]
#[command(about = "Run pylint and manage inline suppressions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint a file and print its diagnostics (exit 1 if any were found)
    Check { file: PathBuf },
    /// Disable every message pylint reports on a line, in place
    Suppress {
        file: PathBuf,
        /// 1-indexed line number
        line: u32,
    },
}

fn init_logging(config: &PylinterConfig) {
    let configured = config.log.as_ref().and_then(|log| log.filter.as_deref());
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn coordinator(config: &PylinterConfig) -> RunCoordinator {
    RunCoordinator::new(
        config.lint.clone(),
        Arc::new(PylintLocator),
        Arc::new(TokioSpawner),
    )
}

/// Run pylint on the view's file, mapping failures onto exit codes.
async fn lint(coord: &RunCoordinator, view: &Arc<FileView>) -> Result<usize, ExitCode> {
    match coord.run(Arc::clone(view) as Arc<dyn View>).await {
        Ok(RunOutcome::Completed { count }) => Ok(count),
        Ok(other) => {
            tracing::warn!("Lint did not run: {other:?}");
            Err(ExitCode::from(2))
        }
        Err(LintError::ToolUnavailable { minimum }) => {
            eprintln!("pylinter: no pylint >= {minimum} found, not linting");
            Err(ExitCode::from(2))
        }
        Err(e) => {
            eprintln!("pylinter: {e}");
            Err(ExitCode::from(2))
        }
    }
}

async fn check(coord: &RunCoordinator, file: PathBuf) -> Result<ExitCode> {
    let view = Arc::new(FileView::open(&file)?);
    let count = match lint(coord, &view).await {
        Ok(count) => count,
        Err(code) => return Ok(code),
    };

    if let Some(diagnostics) = coord.store().file(view.window(), &file) {
        for (line, items) in diagnostics.iter() {
            for d in items {
                println!(
                    "{}:{line}: [{}] {} {}: {}",
                    file.display(),
                    d.category(),
                    d.error_id(),
                    d.symbol(),
                    d.message()
                );
            }
        }
        if !diagnostics.is_empty() {
            eprintln!("{}", diagnostics.status_string());
        }
    }

    tracing::debug!(count, marked_lines = view.marked_lines(), "Check complete");
    Ok(if count == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

async fn suppress(coord: &RunCoordinator, file: PathBuf, line: u32) -> Result<ExitCode> {
    let view = Arc::new(FileView::open(&file)?);
    if let Err(code) = lint(coord, &view).await {
        return Ok(code);
    }

    let Some(span) = view.line_span(line) else {
        bail!("{} has no line {line}", file.display());
    };

    match coord.suppress_at_cursor(&*view, span.start) {
        SuppressOutcome::Applied { text, .. } => {
            view.save()?;
            println!("{}:{line}: {text}", file.display());
        }
        SuppressOutcome::NothingToAdd => {
            println!("{}:{line}: already suppressed", file.display());
        }
        SuppressOutcome::NoMarker => {
            println!("{}:{line}: no pylint messages", file.display());
        }
    }

    for error in view.errors() {
        eprintln!("pylinter: {error}");
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = PylinterConfig::load();
    init_logging(&config);

    if let Some(path) = PylinterConfig::path() {
        tracing::debug!(path = %path.display(), "Config location");
    }

    let coord = coordinator(&config);
    match cli.command {
        Commands::Check { file } => check(&coord, file).await,
        Commands::Suppress { file, line } => suppress(&coord, file, line).await,
    }
}
